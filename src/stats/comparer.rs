use crate::data::model::FeatureTable;
use crate::error::{AnalysisError, Result};

use super::anova::{AnovaRecord, group_comparison};
use super::describe::{Summary, summary};
use super::normality::{NormalityRecord, normality_by_group};
use super::wilcoxon::{PairedOutcome, PairedRow, paired_join, paired_test};

/// Hypothesis tests over one feature table at a fixed significance level.
///
/// Every method is a pure computation; writing results out is the job of
/// [`crate::report`].
#[derive(Debug, Clone, Copy)]
pub struct StatisticalComparer<'a> {
    table: &'a FeatureTable,
    alpha: f64,
}

impl<'a> StatisticalComparer<'a> {
    pub fn new(table: &'a FeatureTable, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(AnalysisError::invalid(format!(
                "alpha must lie in (0, 1), got {alpha}"
            )));
        }
        Ok(Self { table, alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn summary(&self) -> Summary {
        summary(self.table)
    }

    pub fn normality_by_group(&self, column: &str, group_by: &str) -> Result<Vec<NormalityRecord>> {
        normality_by_group(self.table, column, group_by, self.alpha)
    }

    pub fn group_comparison(&self, column: &str, group_by: &str) -> Result<AnovaRecord> {
        group_comparison(self.table, column, group_by, self.alpha)
    }

    pub fn paired_join(&self, column: &str, group_a: &str, group_b: &str) -> Result<Vec<PairedRow>> {
        paired_join(self.table, column, group_a, group_b)
    }

    pub fn paired_test(&self, column: &str, group_a: &str, group_b: &str) -> Result<PairedOutcome> {
        paired_test(self.table, column, group_a, group_b, self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{COL_DIAMETER, COL_WAVELENGTH, FeatureRecord};
    use crate::stats::anova::GroupVerdict;

    fn table() -> FeatureTable {
        let mut records = Vec::new();
        for i in 0..5 {
            for (diameter, base) in [("125 µm", 1.0), ("25 µm", 10.0)] {
                records.push(FeatureRecord {
                    diameter: diameter.to_string(),
                    ri: format!("1.3{i}"),
                    wavelength: base + i as f64,
                    transmission: -2.0,
                    spectral_width: 0.01,
                    prominence: 1.0,
                });
            }
        }
        FeatureTable::new(records)
    }

    #[test]
    fn rejects_alpha_outside_unit_interval() {
        let t = table();
        assert!(StatisticalComparer::new(&t, 0.0).is_err());
        assert!(StatisticalComparer::new(&t, 1.0).is_err());
        assert!(StatisticalComparer::new(&t, f64::NAN).is_err());
    }

    #[test]
    fn methods_share_alpha() {
        let t = table();
        let cmp = StatisticalComparer::new(&t, 0.05).unwrap();
        let anova = cmp.group_comparison(COL_WAVELENGTH, COL_DIAMETER).unwrap();
        assert_eq!(anova.verdict, GroupVerdict::SignificantDifference);
        assert_eq!(cmp.normality_by_group(COL_WAVELENGTH, COL_DIAMETER).unwrap().len(), 2);
        assert_eq!(cmp.paired_join(COL_WAVELENGTH, "25 µm", "125 µm").unwrap().len(), 5);
        assert!(cmp.paired_test(COL_WAVELENGTH, "25 µm", "125 µm").unwrap().record().is_some());
        assert_eq!(cmp.summary().columns.len(), FeatureTable::COLUMNS.len());
    }
}
