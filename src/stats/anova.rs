//! One-way ANOVA across every group of a categorical column.

use std::fmt;

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::data::model::FeatureTable;
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVerdict {
    SignificantDifference,
    NoSignificantDifference,
}

impl fmt::Display for GroupVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupVerdict::SignificantDifference => write!(f, "Significant difference"),
            GroupVerdict::NoSignificantDifference => write!(f, "No significant difference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnovaRecord {
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub verdict: GroupVerdict,
}

/// F statistic and p-value of a one-way ANOVA.
///
/// Needs at least two groups with at least two observations each. When
/// every group is constant the result is infinite (groups differ) or NaN
/// (all groups equal).
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<(f64, f64, usize, usize)> {
    if groups.len() < 2 {
        return Err(AnalysisError::insufficient_groups(format!(
            "ANOVA needs at least 2 groups, got {}",
            groups.len()
        )));
    }
    if let Some(small) = groups.iter().position(|g| g.len() < 2) {
        return Err(AnalysisError::insufficient_groups(format!(
            "ANOVA group {small} has {} observation(s), at least 2 required",
            groups[small].len()
        )));
    }

    let k = groups.len();
    let n_total: usize = groups.iter().map(Vec::len).sum();
    let grand_mean = groups.iter().flatten().sum::<f64>() / n_total as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in groups {
        let mean = g.iter().sum::<f64>() / g.len() as f64;
        ss_between += g.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += g.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }

    let df_between = k - 1;
    let df_within = n_total - k;
    let f = (ss_between / df_between as f64) / (ss_within / df_within as f64);

    let p = if f.is_nan() {
        f64::NAN
    } else if f.is_infinite() {
        0.0
    } else {
        let dist = FisherSnedecor::new(df_between as f64, df_within as f64).map_err(|e| {
            AnalysisError::Distribution(format!("failed to construct F distribution: {e}"))
        })?;
        dist.sf(f)
    };
    Ok((f, p, df_between, df_within))
}

/// Split `column` by every distinct `group_by` value and compare all groups
/// at once. NaN observations are left out.
pub fn group_comparison(
    table: &FeatureTable,
    column: &str,
    group_by: &str,
    alpha: f64,
) -> Result<AnovaRecord> {
    let groups: Vec<Vec<f64>> = table
        .numeric_groups(column, group_by)?
        .into_values()
        .map(|g| g.into_iter().filter(|v| !v.is_nan()).collect())
        .collect();

    let (f_statistic, p_value, df_between, df_within) = one_way_anova(&groups)?;
    let verdict = if p_value < alpha {
        GroupVerdict::SignificantDifference
    } else {
        GroupVerdict::NoSignificantDifference
    };
    log::info!(
        "ANOVA on '{column}' by '{group_by}': F({df_between}, {df_within}) = {f_statistic:.4}, p = {p_value:.4e}, {verdict}"
    );
    Ok(AnovaRecord {
        f_statistic,
        p_value,
        df_between,
        df_within,
        verdict,
    })
}
