use crate::config::AnalysisConfig;
use crate::error::Result;

use super::model::MeasurementTable;

// ---------------------------------------------------------------------------
// Row filter: wavelength range
// ---------------------------------------------------------------------------

/// Keep the rows whose `column` value lies in `[min, max]`.
/// NaN wavelengths never pass.
pub fn wavelength_range(
    table: &MeasurementTable,
    column: &str,
    min: f64,
    max: f64,
) -> Result<MeasurementTable> {
    let wavelength = table.column(column)?.to_vec();
    Ok(table.retain_rows(|i| wavelength[i] >= min && wavelength[i] <= max))
}

// ---------------------------------------------------------------------------
// Column transform: z-score
// ---------------------------------------------------------------------------

/// Replace each named column by `(x - mean) / std` with the sample (n-1)
/// standard deviation. NaN cells are skipped when computing the moments
/// and stay NaN. A constant column becomes all NaN.
pub fn normalize_zscore(table: &mut MeasurementTable, columns: &[String]) -> Result<()> {
    for name in columns {
        let values = table.column_mut(name)?;
        let (mean, std) = nan_mean_std(values);
        for v in values.iter_mut() {
            *v = (*v - mean) / std;
        }
    }
    Ok(())
}

fn nan_mean_std(values: &[f64]) -> (f64, f64) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = finite.len();
    if n < 2 {
        return (f64::NAN, f64::NAN);
    }
    let mean = finite.iter().sum::<f64>() / n as f64;
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    if std == 0.0 {
        return (mean, f64::NAN);
    }
    (mean, std)
}

/// Range-filter on the wavelength column, then z-score every transmission
/// column named in the config.
pub fn preprocess(table: &MeasurementTable, cfg: &AnalysisConfig) -> Result<MeasurementTable> {
    let (min, max) = cfg.wavelength_range;
    let mut filtered = wavelength_range(table, &cfg.wavelength_column, min, max)?;
    let columns: Vec<String> = cfg
        .unetched_columns
        .iter()
        .chain(&cfg.etched_columns)
        .cloned()
        .collect();
    normalize_zscore(&mut filtered, &columns)?;
    log::info!(
        "preprocessed {} of {} rows in [{min}, {max}], {} columns normalised",
        filtered.n_rows(),
        table.n_rows(),
        columns.len()
    );
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> MeasurementTable {
        MeasurementTable::new(vec![
            ("Wavelength".to_string(), vec![1.00, 1.05, 1.20, 1.43, 1.50]),
            ("RI_B".to_string(), vec![9.0, 1.0, 2.0, 3.0, 9.0]),
        ])
        .unwrap()
    }

    #[test]
    fn range_is_inclusive() {
        let out = wavelength_range(&table(), "Wavelength", 1.04, 1.43).unwrap();
        assert_eq!(out.column("Wavelength").unwrap(), &[1.05, 1.20, 1.43]);
        assert_eq!(out.column("RI_B").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn zscore_uses_sample_std() {
        let mut t = wavelength_range(&table(), "Wavelength", 1.04, 1.43).unwrap();
        normalize_zscore(&mut t, &["RI_B".to_string()]).unwrap();
        let z = t.column("RI_B").unwrap();
        assert_relative_eq!(z[0], -1.0);
        assert_relative_eq!(z[1], 0.0);
        assert_relative_eq!(z[2], 1.0);
    }

    #[test]
    fn zscore_skips_nan() {
        let mut t = MeasurementTable::new(vec![(
            "RI_B".to_string(),
            vec![1.0, f64::NAN, 3.0],
        )])
        .unwrap();
        normalize_zscore(&mut t, &["RI_B".to_string()]).unwrap();
        let z = t.column("RI_B").unwrap();
        assert!(z[1].is_nan());
        assert_relative_eq!(z[0], -std::f64::consts::FRAC_1_SQRT_2);
    }

    #[test]
    fn missing_column_fails() {
        let mut t = table();
        assert!(normalize_zscore(&mut t, &["RI_Z".to_string()]).is_err());
    }
}
