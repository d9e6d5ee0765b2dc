//! Paired comparison of two diameters: RI-matched join and a one-sided
//! Wilcoxon signed-rank test.

use std::collections::BTreeMap;
use std::fmt;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::data::model::FeatureTable;
use crate::error::{AnalysisError, Result};

/// Fewest paired rows the test will run on.
pub const MIN_PAIRED_SAMPLES: usize = 3;

/// Largest sample for which the exact null distribution is enumerated.
const EXACT_MAX_N: usize = 50;

/// One RI-matched pair of feature values.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedRow {
    pub ri: String,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedVerdict {
    Significant,
    NotSignificant,
}

impl fmt::Display for PairedVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairedVerdict::Significant => write!(f, "Significant"),
            PairedVerdict::NotSignificant => write!(f, "Not significant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WilcoxonRecord {
    pub group_a: String,
    pub group_b: String,
    /// Paired rows entering the test, zero differences included
    pub n: usize,
    /// Sum of the ranks of positive differences
    pub w: f64,
    pub p_value: f64,
    pub exact: bool,
    pub verdict: PairedVerdict,
}

/// Outcome of [`paired_test`]. Callers must handle the insufficient case.
#[derive(Debug, Clone, PartialEq)]
pub enum PairedOutcome {
    Tested(WilcoxonRecord),
    InsufficientPairedSamples {
        group_a: String,
        group_b: String,
        n: usize,
    },
}

impl PairedOutcome {
    pub fn record(&self) -> Option<&WilcoxonRecord> {
        match self {
            PairedOutcome::Tested(r) => Some(r),
            PairedOutcome::InsufficientPairedSamples { .. } => None,
        }
    }
}

/// Match the `column` values of diameter `group_a` with those of `group_b`
/// measured in the same RI medium.
///
/// Within one RI label the k-th row of A pairs with the k-th row of B, so
/// unmatched rows on either side are dropped and the result never has more
/// rows than the smaller group. Pairs with a NaN value are dropped too.
/// Output follows the order in which RI labels first appear in A.
pub fn paired_join(
    table: &FeatureTable,
    column: &str,
    group_a: &str,
    group_b: &str,
) -> Result<Vec<PairedRow>> {
    if !FeatureTable::COLUMNS.contains(&column) {
        return Err(AnalysisError::MissingColumn(column.to_string()));
    }

    let mut order: Vec<String> = Vec::new();
    let mut side_a: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut side_b: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for rec in &table.records {
        let Some(value) = rec.field(column).and_then(|v| v.as_f64()) else {
            return Err(AnalysisError::invalid(format!("column '{column}' is not numeric")));
        };
        if rec.diameter == group_a {
            if !side_a.contains_key(&rec.ri) {
                order.push(rec.ri.clone());
            }
            side_a.entry(rec.ri.clone()).or_default().push(value);
        } else if rec.diameter == group_b {
            side_b.entry(rec.ri.clone()).or_default().push(value);
        }
    }

    let mut rows = Vec::new();
    for ri in order {
        let (Some(a_vals), Some(b_vals)) = (side_a.get(&ri), side_b.get(&ri)) else {
            continue;
        };
        rows.extend(
            a_vals
                .iter()
                .zip(b_vals)
                .filter(|(a, b)| !a.is_nan() && !b.is_nan())
                .map(|(&a, &b)| PairedRow { ri: ri.clone(), a, b }),
        );
    }
    log::debug!("paired '{column}' of {group_a} with {group_b}: {} rows", rows.len());
    Ok(rows)
}

/// Average ranks (1-based) of `values`, ties sharing the mean rank.
/// Also returns the size of every tie group.
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }
    (ranks, ties)
}

/// Number of sign assignments of ranks 1..=n giving each positive-rank sum.
fn signed_rank_counts(n: usize) -> Vec<f64> {
    let max = n * (n + 1) / 2;
    let mut counts = vec![0.0; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max).rev() {
            counts[s] += counts[s - k];
        }
    }
    counts
}

/// One-sided (`a > b`) Wilcoxon signed-rank test on paired differences.
///
/// Zero differences are discarded before ranking. The exact null
/// distribution is used for up to 50 non-zero differences without ties,
/// otherwise the tie-corrected normal approximation.
/// Returns (W, p-value, exact).
pub fn signed_rank_greater(pairs: &[(f64, f64)]) -> Result<(f64, f64, bool)> {
    let diffs: Vec<f64> = pairs
        .iter()
        .map(|(a, b)| a - b)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Ok((0.0, 1.0, true));
    }

    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = rank_with_ties(&abs);
    let r_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();

    if n <= EXACT_MAX_N && ties.is_empty() {
        let counts = signed_rank_counts(n);
        let total = 2f64.powi(n as i32);
        let from = r_plus.round() as usize;
        let tail: f64 = counts[from..].iter().sum();
        return Ok((r_plus, tail / total, true));
    }

    let nf = n as f64;
    let mean = nf * (nf + 1.0) / 4.0;
    let tie_term: f64 = ties.iter().map(|&t| (t * t * t - t) as f64).sum::<f64>() / 48.0;
    let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term;
    let z = (r_plus - mean) / var.sqrt();
    let norm = Normal::new(0.0, 1.0).map_err(|e| {
        AnalysisError::Distribution(format!("failed to construct standard normal: {e}"))
    })?;
    Ok((r_plus, norm.sf(z), false))
}

/// Test whether `group_a`'s values of `column` are systematically larger
/// than `group_b`'s for the same RI. The direction is fixed.
pub fn paired_test(
    table: &FeatureTable,
    column: &str,
    group_a: &str,
    group_b: &str,
    alpha: f64,
) -> Result<PairedOutcome> {
    let rows = paired_join(table, column, group_a, group_b)?;
    if rows.len() < MIN_PAIRED_SAMPLES {
        log::warn!(
            "{} paired rows of '{column}' for {group_a} vs {group_b}, Wilcoxon not run",
            rows.len()
        );
        return Ok(PairedOutcome::InsufficientPairedSamples {
            group_a: group_a.to_string(),
            group_b: group_b.to_string(),
            n: rows.len(),
        });
    }

    let pairs: Vec<(f64, f64)> = rows.iter().map(|r| (r.a, r.b)).collect();
    let (w, p_value, exact) = signed_rank_greater(&pairs)?;
    let verdict = if p_value < alpha {
        PairedVerdict::Significant
    } else {
        PairedVerdict::NotSignificant
    };
    log::info!(
        "Wilcoxon '{column}' {group_a} > {group_b}: n = {}, W = {w}, p = {p_value:.4e}, {verdict}",
        rows.len()
    );
    Ok(PairedOutcome::Tested(WilcoxonRecord {
        group_a: group_a.to_string(),
        group_b: group_b.to_string(),
        n: rows.len(),
        w,
        p_value,
        exact,
        verdict,
    }))
}
