//! Descriptive statistics of the feature table.

use std::collections::BTreeMap;

use crate::data::model::{COL_DIAMETER, COL_ENVIRONMENT, FeatureTable, FieldValue};

/// Per-column description. Numeric columns skip NaN values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric {
        count: usize,
        mean: f64,
        std: f64,
        min: f64,
        q25: f64,
        q50: f64,
        q75: f64,
        max: f64,
    },
    Categorical {
        count: usize,
        unique: usize,
        top: String,
        freq: usize,
    },
}

impl ColumnSummary {
    /// Statistic names in output order, numeric first then categorical.
    pub const STATISTICS: [&'static str; 11] = [
        "count", "unique", "top", "freq", "mean", "std", "min", "25%", "50%", "75%", "max",
    ];

    /// Cell text for one statistic, empty when it does not apply.
    pub fn cell(&self, statistic: &str) -> String {
        match self {
            ColumnSummary::Numeric {
                count,
                mean,
                std,
                min,
                q25,
                q50,
                q75,
                max,
            } => match statistic {
                "count" => count.to_string(),
                "mean" => fmt_num(*mean),
                "std" => fmt_num(*std),
                "min" => fmt_num(*min),
                "25%" => fmt_num(*q25),
                "50%" => fmt_num(*q50),
                "75%" => fmt_num(*q75),
                "max" => fmt_num(*max),
                _ => String::new(),
            },
            ColumnSummary::Categorical {
                count,
                unique,
                top,
                freq,
            } => match statistic {
                "count" => count.to_string(),
                "unique" => unique.to_string(),
                "top" => top.clone(),
                "freq" => freq.to_string(),
                _ => String::new(),
            },
        }
    }
}

fn fmt_num(v: f64) -> String {
    if v.is_nan() { String::new() } else { v.to_string() }
}

/// Column descriptions in table column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub columns: Vec<(String, ColumnSummary)>,
}

impl Summary {
    pub fn get(&self, column: &str) -> Option<&ColumnSummary> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, s)| s)
    }
}

/// Linear-interpolated quantile of sorted, NaN-free data.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn describe_numeric(values: &[f64]) -> ColumnSummary {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    let count = v.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        v.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        (v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    };
    ColumnSummary::Numeric {
        count,
        mean,
        std,
        min: v.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&v, 0.25),
        q50: quantile(&v, 0.5),
        q75: quantile(&v, 0.75),
        max: v.last().copied().unwrap_or(f64::NAN),
    }
}

fn describe_categorical(values: &[String]) -> ColumnSummary {
    // Ties on frequency go to the label seen first.
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (i, v) in values.iter().enumerate() {
        counts.entry(v.as_str()).or_insert((0, i)).0 += 1;
    }
    let (top, freq) = counts
        .iter()
        .max_by(|(_, (na, fa)), (_, (nb, fb))| na.cmp(nb).then(fb.cmp(fa)))
        .map(|(label, (n, _))| (label.to_string(), *n))
        .unwrap_or_default();
    ColumnSummary::Categorical {
        count: values.len(),
        unique: counts.len(),
        top,
        freq,
    }
}

/// Describe every column of the feature table.
pub fn summary(table: &FeatureTable) -> Summary {
    let mut columns = Vec::with_capacity(FeatureTable::COLUMNS.len());
    for column in FeatureTable::COLUMNS {
        let cells: Vec<FieldValue> = table
            .records
            .iter()
            .filter_map(|r| r.field(column))
            .collect();
        let described = if matches!(column, COL_DIAMETER | COL_ENVIRONMENT) {
            let labels: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
            describe_categorical(&labels)
        } else {
            let values: Vec<f64> = cells.iter().filter_map(FieldValue::as_f64).collect();
            describe_numeric(&values)
        };
        columns.push((column.to_string(), described));
    }
    log::debug!("described {} columns over {} rows", columns.len(), table.len());
    Summary { columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{COL_WAVELENGTH, FeatureRecord};
    use approx::assert_relative_eq;

    fn table() -> FeatureTable {
        let rows = [
            ("125 µm", 1.0),
            ("125 µm", 2.0),
            ("25 µm", 3.0),
            ("125 µm", 4.0),
        ];
        FeatureTable::new(
            rows.iter()
                .map(|(d, w)| FeatureRecord {
                    diameter: d.to_string(),
                    ri: "1.33".to_string(),
                    wavelength: *w,
                    transmission: -1.0,
                    spectral_width: 0.02,
                    prominence: 2.0,
                })
                .collect(),
        )
    }

    #[test]
    fn numeric_column_matches_pandas_describe() {
        let s = summary(&table());
        let Some(ColumnSummary::Numeric {
            count,
            mean,
            std,
            min,
            q25,
            q50,
            q75,
            max,
        }) = s.get(COL_WAVELENGTH).cloned()
        else {
            panic!("wavelength should be numeric");
        };
        assert_eq!(count, 4);
        assert_relative_eq!(mean, 2.5);
        assert_relative_eq!(std, 1.2909944487358056, epsilon = 1e-12);
        assert_eq!((min, max), (1.0, 4.0));
        assert_relative_eq!(q25, 1.75);
        assert_relative_eq!(q50, 2.5);
        assert_relative_eq!(q75, 3.25);
    }

    #[test]
    fn categorical_column_counts_labels() {
        let s = summary(&table());
        assert_eq!(
            s.get(COL_DIAMETER),
            Some(&ColumnSummary::Categorical {
                count: 4,
                unique: 2,
                top: "125 µm".to_string(),
                freq: 3
            })
        );
        assert_eq!(s.get(COL_DIAMETER).unwrap().cell("mean"), "");
    }

    #[test]
    fn empty_table_yields_nan_moments() {
        let s = summary(&FeatureTable::default());
        match s.get(COL_WAVELENGTH) {
            Some(ColumnSummary::Numeric { count, mean, .. }) => {
                assert_eq!(*count, 0);
                assert!(mean.is_nan());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
