//! CSV persistence of every pipeline result.
//!
//! Nothing in `analysis` or `stats` touches the filesystem; the driver hands
//! finished results to these writers. Undefined numbers (NaN, or a test
//! that was not run) are written as empty cells.

use std::fs;
use std::path::Path;

use crate::analysis::covariance::{CovarianceMatrix, CovarianceSummary};
use crate::analysis::shift::{Landslide, Sensitivity};
use crate::data::model::{FeatureTable, MeasurementTable};
use crate::error::Result;
use crate::stats::anova::AnovaRecord;
use crate::stats::describe::{ColumnSummary, Summary};
use crate::stats::normality::NormalityRecord;
use crate::stats::wilcoxon::PairedOutcome;

pub const FEATURES_FILE: &str = "features_detected.csv";
pub const SUMMARY_FILE: &str = "summary_statistics.csv";
pub const NORMALITY_FILE: &str = "Shapiro_results.csv";
pub const ANOVA_FILE: &str = "anova_results.csv";
pub const WILCOXON_FILE: &str = "Wilcoxon_results.csv";
pub const LANDSLIDE_FILE: &str = "landslide.csv";
pub const SENSITIVITY_FILE: &str = "sensitivity.csv";
pub const COVARIANCE_UNETCHED_FILE: &str = "covariance_125.csv";
pub const COVARIANCE_ETCHED_FILE: &str = "covariance_25.csv";
pub const COVARIANCE_PER_RI_FILE: &str = "covariance_by_RI.csv";
pub const PROCESSED_FILE: &str = "Data_processed.csv";

const INSUFFICIENT_PAIRED: &str = "Insufficient paired samples";

fn cell(v: f64) -> String {
    if v.is_nan() { String::new() } else { v.to_string() }
}

fn opt_cell(v: Option<f64>) -> String {
    v.map_or_else(String::new, cell)
}

/// Create `dir` and any missing parents. Existing directories are fine.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

pub fn write_features(path: &Path, features: &FeatureTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    if features.is_empty() {
        wtr.write_record(FeatureTable::COLUMNS)?;
    }
    for rec in &features.records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    log::info!("wrote {} features to {}", features.len(), path.display());
    Ok(())
}

/// Statistics as rows, feature columns as columns.
pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec![String::new()];
    header.extend(summary.columns.iter().map(|(name, _)| name.clone()));
    wtr.write_record(&header)?;

    let has_categorical = summary
        .columns
        .iter()
        .any(|(_, s)| matches!(s, ColumnSummary::Categorical { .. }));
    for stat in ColumnSummary::STATISTICS {
        if !has_categorical && matches!(stat, "unique" | "top" | "freq") {
            continue;
        }
        let mut row = vec![stat.to_string()];
        row.extend(summary.columns.iter().map(|(_, s)| s.cell(stat)));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_normality(path: &Path, records: &[NormalityRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Diameter", "p-value", "Result"])?;
    for rec in records {
        wtr.write_record(&[rec.group.clone(), opt_cell(rec.p_value), rec.verdict.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_anova(path: &Path, record: &AnovaRecord) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["H-statistic", "p-value", "Result"])?;
    wtr.write_record(&[
        cell(record.f_statistic),
        cell(record.p_value),
        record.verdict.to_string(),
    ])?;
    wtr.flush()?;
    Ok(())
}

pub fn write_wilcoxon(path: &Path, outcomes: &[PairedOutcome]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Diameter1", "Diameter2", "n samples", "W", "p-value", "Result"])?;
    for outcome in outcomes {
        let row = match outcome {
            PairedOutcome::Tested(r) => [
                r.group_a.clone(),
                r.group_b.clone(),
                r.n.to_string(),
                cell(r.w),
                cell(r.p_value),
                r.verdict.to_string(),
            ],
            PairedOutcome::InsufficientPairedSamples {
                group_a,
                group_b,
                n,
            } => [
                group_a.clone(),
                group_b.clone(),
                n.to_string(),
                String::new(),
                String::new(),
                INSUFFICIENT_PAIRED.to_string(),
            ],
        };
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_landslide(path: &Path, landslide: &Landslide) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["RI", "min_125", "min_25"])?;
    for i in 0..landslide.len() {
        wtr.write_record(&[
            cell(landslide.ri[i]),
            cell(landslide.min_125[i]),
            cell(landslide.min_25[i]),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_sensitivity(path: &Path, sensitivity: &Sensitivity) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["RI", "sensitivity 125", "sensitivity 25"])?;
    for i in 0..sensitivity.ri.len() {
        wtr.write_record(&[
            cell(sensitivity.ri[i]),
            cell(sensitivity.sensitivity_125[i]),
            cell(sensitivity.sensitivity_25[i]),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_matrix(wtr: &mut csv::Writer<fs::File>, m: &CovarianceMatrix) -> Result<()> {
    let mut header = vec![String::new()];
    header.extend(m.columns.iter().cloned());
    wtr.write_record(&header)?;
    for (name, values) in m.columns.iter().zip(&m.values) {
        let mut row = vec![name.clone()];
        row.extend(values.iter().map(|v| cell(*v)));
        wtr.write_record(&row)?;
    }
    Ok(())
}

/// Writes the unetched and etched matrices plus a long-format per-RI file
/// (`RI, Column, unetched, etched`) into `dir`.
pub fn write_covariance(dir: &Path, summary: &CovarianceSummary, ri_labels: &[String]) -> Result<()> {
    for (file, matrix) in [
        (COVARIANCE_UNETCHED_FILE, &summary.unetched),
        (COVARIANCE_ETCHED_FILE, &summary.etched),
    ] {
        let mut wtr = csv::Writer::from_path(dir.join(file))?;
        write_matrix(&mut wtr, matrix)?;
        wtr.flush()?;
    }

    let mut wtr = csv::Writer::from_path(dir.join(COVARIANCE_PER_RI_FILE))?;
    wtr.write_record(["RI", "Column", "unetched", "etched"])?;
    for (ri, m) in ri_labels.iter().zip(&summary.per_ri) {
        for (name, values) in m.columns.iter().zip(&m.values) {
            let mut row = vec![ri.clone(), name.clone()];
            row.extend(values.iter().map(|v| cell(*v)));
            wtr.write_record(&row)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write a wide measurement table, columns in table order.
pub fn write_table(path: &Path, table: &MeasurementTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.column_names())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| cell(*v)))?;
    }
    wtr.flush()?;
    log::info!("wrote {} rows to {}", table.n_rows(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::anova::GroupVerdict;
    use crate::stats::normality::NormalityVerdict;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("Results").join("tables");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn undefined_p_value_is_an_empty_cell() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(NORMALITY_FILE);
        write_normality(
            &path,
            &[NormalityRecord {
                group: "125 µm".to_string(),
                n: 2,
                w: None,
                p_value: None,
                verdict: NormalityVerdict::InsufficientSamples,
            }],
        )
        .unwrap();
        assert_eq!(read(&path), "Diameter,p-value,Result\n125 µm,,Insufficient samples\n");
    }

    #[test]
    fn wilcoxon_sentinel_row() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(WILCOXON_FILE);
        write_wilcoxon(
            &path,
            &[PairedOutcome::InsufficientPairedSamples {
                group_a: "125 µm".to_string(),
                group_b: "25 µm".to_string(),
                n: 2,
            }],
        )
        .unwrap();
        let text = read(&path);
        assert!(text.ends_with("125 µm,25 µm,2,,,Insufficient paired samples\n"));
    }

    #[test]
    fn anova_row_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(ANOVA_FILE);
        write_anova(
            &path,
            &AnovaRecord {
                f_statistic: 81.0,
                p_value: 0.5,
                df_between: 1,
                df_within: 8,
                verdict: GroupVerdict::NoSignificantDifference,
            },
        )
        .unwrap();
        assert_eq!(
            read(&path),
            "H-statistic,p-value,Result\n81,0.5,No significant difference\n"
        );
    }

    #[test]
    fn table_keeps_column_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(PROCESSED_FILE);
        let table = MeasurementTable::new(vec![
            ("Wavelength".to_string(), vec![1.1, 1.2]),
            ("RI_B".to_string(), vec![f64::NAN, -0.5]),
        ])
        .unwrap();
        write_table(&path, &table).unwrap();
        assert_eq!(read(&path), "Wavelength,RI_B\n1.1,\n1.2,-0.5\n");
    }
}
