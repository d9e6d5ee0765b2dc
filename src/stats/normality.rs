//! Shapiro-Wilk normality test, per group.
//!
//! Coefficients and p-value follow Royston's AS R94 approximation, valid
//! for 3 ≤ n ≤ 5000.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::fmt;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::data::model::FeatureTable;
use crate::error::{AnalysisError, Result};

/// Smallest sample the test accepts.
pub const MIN_NORMALITY_SAMPLES: usize = 3;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalityVerdict {
    Normal,
    NotNormal,
    /// Fewer than three observations; no test was run.
    InsufficientSamples,
}

impl fmt::Display for NormalityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalityVerdict::Normal => write!(f, "Normal"),
            NormalityVerdict::NotNormal => write!(f, "Not normal"),
            NormalityVerdict::InsufficientSamples => write!(f, "Insufficient samples"),
        }
    }
}

/// Normality result of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalityRecord {
    pub group: String,
    pub n: usize,
    /// `None` when the test was not run
    pub w: Option<f64>,
    pub p_value: Option<f64>,
    pub verdict: NormalityVerdict,
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| {
        AnalysisError::Distribution(format!("failed to construct standard normal: {e}"))
    })
}

/// Antisymmetric weights for the sorted sample, lowest first.
fn coefficients(n: usize, norm: &Normal) -> Vec<f64> {
    let mut a = vec![0.0; n];
    if n == 3 {
        a[0] = -FRAC_1_SQRT_2;
        a[2] = FRAC_1_SQRT_2;
        return a;
    }

    let an25 = n as f64 + 0.25;
    let m: Vec<f64> = (1..=n)
        .map(|i| norm.inverse_cdf((i as f64 - 0.375) / an25))
        .collect();
    let summ2: f64 = m.iter().map(|v| v * v).sum();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();

    let a_n = m[n - 1] / ssumm2 + poly(&C1, rsn);
    a[n - 1] = a_n;
    a[0] = -a_n;

    let (first, eps) = if n > 5 {
        let a_n1 = m[n - 2] / ssumm2 + poly(&C2, rsn);
        a[n - 2] = a_n1;
        a[1] = -a_n1;
        let eps = (summ2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2));
        (2, eps)
    } else {
        let eps = (summ2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2));
        (1, eps)
    };
    let fac = eps.sqrt();
    for i in first..n - first {
        a[i] = m[i] / fac;
    }
    a
}

/// Shapiro-Wilk W statistic and p-value.
///
/// NaN observations are dropped first. A constant sample yields W = 1,
/// p = 1.
pub fn shapiro_wilk(values: &[f64]) -> Result<ShapiroWilk> {
    let mut x: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = x.len();
    if n < MIN_NORMALITY_SAMPLES {
        return Err(AnalysisError::invalid(format!(
            "Shapiro-Wilk needs at least {MIN_NORMALITY_SAMPLES} observations, got {n}"
        )));
    }
    x.sort_by(f64::total_cmp);

    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    if ssq == 0.0 {
        log::warn!("Shapiro-Wilk on a constant sample of {n} values");
        return Ok(ShapiroWilk { w: 1.0, p_value: 1.0 });
    }

    let norm = standard_normal()?;
    let a = coefficients(n, &norm);
    let num: f64 = a.iter().zip(&x).map(|(ai, xi)| ai * xi).sum();
    let w = (num * num / ssq).min(1.0);

    let p_value = if n == 3 {
        let stqr = (0.75_f64).sqrt().asin();
        (6.0 / PI * (w.sqrt().asin() - stqr)).max(0.0)
    } else {
        let w1 = (1.0 - w).ln();
        let nf = n as f64;
        if n <= 11 {
            let gamma = poly(&G, nf);
            if w1 >= gamma {
                return Ok(ShapiroWilk { w, p_value: 1e-99 });
            }
            let y = -(gamma - w1).ln();
            let m = poly(&C3, nf);
            let s = poly(&C4, nf).exp();
            norm.sf((y - m) / s)
        } else {
            let ln_n = nf.ln();
            let m = poly(&C5, ln_n);
            let s = poly(&C6, ln_n).exp();
            norm.sf((w1 - m) / s)
        }
    };

    Ok(ShapiroWilk { w, p_value })
}

/// One Shapiro-Wilk record per distinct `group_by` value, in sorted order.
/// Groups with fewer than three observations get an
/// [`NormalityVerdict::InsufficientSamples`] record instead of a test.
pub fn normality_by_group(
    table: &FeatureTable,
    column: &str,
    group_by: &str,
    alpha: f64,
) -> Result<Vec<NormalityRecord>> {
    let groups = table.numeric_groups(column, group_by)?;
    let mut records = Vec::with_capacity(groups.len());

    for (key, values) in groups {
        let n = values.iter().filter(|v| !v.is_nan()).count();
        if n < MIN_NORMALITY_SAMPLES {
            log::warn!("{group_by} = {key}: {n} observations of '{column}', normality not tested");
            records.push(NormalityRecord {
                group: key.to_string(),
                n,
                w: None,
                p_value: None,
                verdict: NormalityVerdict::InsufficientSamples,
            });
            continue;
        }
        let sw = shapiro_wilk(&values)?;
        let verdict = if sw.p_value > alpha {
            NormalityVerdict::Normal
        } else {
            NormalityVerdict::NotNormal
        };
        records.push(NormalityRecord {
            group: key.to_string(),
            n,
            w: Some(sw.w),
            p_value: Some(sw.p_value),
            verdict,
        });
    }
    Ok(records)
}
