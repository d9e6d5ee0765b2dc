//! Descriptive covariance between measurement columns.

use crate::data::model::MeasurementTable;
use crate::error::{AnalysisError, Result};

/// Square sample-covariance matrix with its column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.columns.iter().position(|c| c == row)?;
        let c = self.columns.iter().position(|c2| c2 == col)?;
        Some(self.values[r][c])
    }
}

/// Unetched matrix, etched matrix, and one 2×2 matrix per RI.
#[derive(Debug, Clone)]
pub struct CovarianceSummary {
    pub unetched: CovarianceMatrix,
    pub etched: CovarianceMatrix,
    pub per_ri: Vec<CovarianceMatrix>,
}

/// Sample (n-1) covariance of the named columns.
///
/// Each entry uses only the rows where both columns are non-NaN; fewer than
/// two such rows gives NaN.
pub fn covariance_matrix(table: &MeasurementTable, columns: &[String]) -> Result<CovarianceMatrix> {
    let data: Vec<&[f64]> = columns
        .iter()
        .map(|c| table.column(c))
        .collect::<Result<_>>()?;

    let k = data.len();
    let mut values = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let cov = pairwise_cov(data[i], data[j]);
            values[i][j] = cov;
            values[j][i] = cov;
        }
    }
    Ok(CovarianceMatrix {
        columns: columns.to_vec(),
        values,
    })
}

fn pairwise_cov(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return f64::NAN;
    }
    let ma = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mb = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    pairs.iter().map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / (n - 1) as f64
}

/// Covariance summaries between the unetched and etched column sets.
/// `unetched[i]` and `etched[i]` must be measured in the same RI medium.
pub fn covariance(
    table: &MeasurementTable,
    unetched: &[String],
    etched: &[String],
) -> Result<CovarianceSummary> {
    if unetched.len() != etched.len() {
        return Err(AnalysisError::invalid(format!(
            "{} unetched columns but {} etched columns",
            unetched.len(),
            etched.len()
        )));
    }
    let per_ri = unetched
        .iter()
        .zip(etched)
        .map(|(u, e)| covariance_matrix(table, &[u.clone(), e.clone()]))
        .collect::<Result<Vec<_>>>()?;

    Ok(CovarianceSummary {
        unetched: covariance_matrix(table, unetched)?,
        etched: covariance_matrix(table, etched)?,
        per_ri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> MeasurementTable {
        MeasurementTable::new(vec![
            ("A".to_string(), vec![1.0, 2.0, 3.0, 4.0]),
            ("B".to_string(), vec![2.0, 4.0, 6.0, 8.0]),
            ("A_etching".to_string(), vec![4.0, 3.0, 2.0, 1.0]),
            ("B_etching".to_string(), vec![1.0, 1.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn matrix_is_symmetric_sample_covariance() {
        let m = covariance_matrix(&table(), &names(&["A", "B"])).unwrap();
        assert_relative_eq!(m.get("A", "A").unwrap(), 5.0 / 3.0);
        assert_relative_eq!(m.get("A", "B").unwrap(), 10.0 / 3.0);
        assert_eq!(m.get("A", "B"), m.get("B", "A"));
    }

    #[test]
    fn summary_pairs_columns_per_ri() {
        let s = covariance(
            &table(),
            &names(&["A", "B"]),
            &names(&["A_etching", "B_etching"]),
        )
        .unwrap();
        assert_eq!(s.per_ri.len(), 2);
        assert_relative_eq!(s.per_ri[0].get("A", "A_etching").unwrap(), -5.0 / 3.0);
        assert_eq!(s.per_ri[1].get("B", "B_etching").unwrap(), 0.0);
        assert_eq!(s.etched.columns, names(&["A_etching", "B_etching"]));
    }

    #[test]
    fn unequal_column_lists_rejected() {
        assert!(covariance(&table(), &names(&["A"]), &names(&[])).is_err());
    }

    #[test]
    fn nan_rows_are_skipped_pairwise() {
        let t = MeasurementTable::new(vec![
            ("A".to_string(), vec![1.0, f64::NAN, 3.0]),
            ("B".to_string(), vec![1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let m = covariance_matrix(&t, &names(&["A", "B"])).unwrap();
        assert_relative_eq!(m.get("A", "B").unwrap(), 2.0);
        assert_relative_eq!(m.get("B", "B").unwrap(), 1.0);
    }
}
