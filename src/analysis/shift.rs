//! Landslide and sensitivity of the first diagnostic minimum.
//!
//! The diagnostic window is known to hold exactly one dominant dip, so the
//! tracker does a plain argmin inside the window instead of full peak
//! detection.

use crate::data::model::CurvePair;
use crate::error::{AnalysisError, Result};

/// Wavelength of the minimum transmission inside a fixed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstMinimumTracker {
    pub window: (f64, f64),
}

impl Default for FirstMinimumTracker {
    fn default() -> Self {
        Self {
            window: (1.16, 1.23),
        }
    }
}

/// Minimum wavelengths of one RI sample, unetched then etched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstMinimum {
    pub unetched: f64,
    pub etched: f64,
}

impl FirstMinimumTracker {
    pub fn new(min: f64, max: f64) -> Self {
        Self { window: (min, max) }
    }

    /// `None` when the window holds no samples or only NaN transmission.
    pub fn first_minimum(&self, pair: &CurvePair) -> Option<FirstMinimum> {
        Some(FirstMinimum {
            unetched: self.argmin_wavelength(pair.wavelength(), pair.unetched())?,
            etched: self.argmin_wavelength(pair.wavelength(), pair.etched())?,
        })
    }

    fn argmin_wavelength(&self, wavelength: &[f64], transmission: &[f64]) -> Option<f64> {
        let (lo, hi) = self.window;
        wavelength
            .iter()
            .zip(transmission)
            .filter(|(w, t)| **w >= lo && **w <= hi && !t.is_nan())
            // first occurrence wins on ties
            .fold(None, |best: Option<(f64, f64)>, (&w, &t)| match best {
                Some((_, bt)) if bt <= t => best,
                _ => Some((w, t)),
            })
            .map(|(w, _)| w)
    }

    /// First-minimum positions across RI samples, in input order.
    /// Samples without a minimum or with a non-numeric RI label are skipped.
    pub fn landslide(&self, spectra: &[CurvePair]) -> Landslide {
        let mut out = Landslide::default();
        for pair in spectra {
            let Some(ri) = pair.ri_value() else {
                log::warn!("RI label '{}' is not numeric, sample skipped", pair.ri);
                continue;
            };
            match self.first_minimum(pair) {
                Some(min) => {
                    out.ri.push(ri);
                    out.min_125.push(min.unetched);
                    out.min_25.push(min.etched);
                }
                None => log::warn!(
                    "RI {}: no samples in window [{}, {}], sample skipped",
                    pair.ri,
                    self.window.0,
                    self.window.1
                ),
            }
        }
        out
    }

    /// Landslide plus d(minimum wavelength)/d(RI) for both fibers.
    pub fn sensitivity(&self, spectra: &[CurvePair]) -> Result<Sensitivity> {
        let landslide = self.landslide(spectra);
        let sensitivity_125 = gradient(&landslide.min_125, &landslide.ri)?;
        let sensitivity_25 = gradient(&landslide.min_25, &landslide.ri)?;
        Ok(Sensitivity {
            ri: landslide.ri,
            sensitivity_125,
            sensitivity_25,
        })
    }
}

/// Three aligned sequences: RI, unetched minimum, etched minimum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landslide {
    pub ri: Vec<f64>,
    pub min_125: Vec<f64>,
    pub min_25: Vec<f64>,
}

impl Landslide {
    pub fn len(&self) -> usize {
        self.ri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ri.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sensitivity {
    pub ri: Vec<f64>,
    pub sensitivity_125: Vec<f64>,
    pub sensitivity_25: Vec<f64>,
}

/// Derivative of `y` with respect to the (possibly non-uniform) coordinates
/// `x`: second-order central differences inside, one-sided at the ends.
///
/// Repeated `x` values produce non-finite entries. Sorting `x` is the
/// caller's responsibility.
pub fn gradient(y: &[f64], x: &[f64]) -> Result<Vec<f64>> {
    let n = y.len();
    if x.len() != n {
        return Err(AnalysisError::invalid(format!(
            "gradient: {} values but {} coordinates",
            n,
            x.len()
        )));
    }
    if n < 2 {
        return Err(AnalysisError::invalid(format!(
            "gradient needs at least 2 points, got {n}"
        )));
    }

    let mut out = Vec::with_capacity(n);
    out.push((y[1] - y[0]) / (x[1] - x[0]));
    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        let d = (h0 * h0 * (y[i + 1] - y[i]) + h1 * h1 * (y[i] - y[i - 1]))
            / (h0 * h1 * (h0 + h1));
        out.push(d);
    }
    out.push((y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pair(ri: &str, dip_125: f64, dip_25: f64) -> CurvePair {
        let wl: Vec<f64> = (0..300).map(|i| 1.10 + i as f64 * 0.0005).collect();
        let dip = |c: f64| -> Vec<f64> { wl.iter().map(|w| (w - c).powi(2)).collect() };
        CurvePair::new(ri, wl.clone(), dip(dip_125), dip(dip_25)).unwrap()
    }

    #[test]
    fn first_minimum_inside_window() {
        let tracker = FirstMinimumTracker::default();
        let min = tracker.first_minimum(&pair("1.33", 1.20, 1.18)).unwrap();
        assert_relative_eq!(min.unetched, 1.20, epsilon = 1e-9);
        assert_relative_eq!(min.etched, 1.18, epsilon = 1e-9);
    }

    #[test]
    fn minimum_outside_window_clamps_to_edge() {
        // global minimum at 1.10 lies left of the window
        let tracker = FirstMinimumTracker::default();
        let min = tracker.first_minimum(&pair("1.33", 1.10, 1.20)).unwrap();
        assert!((min.unetched - 1.16).abs() < 1e-3);
    }

    #[test]
    fn empty_window_skips_sample() {
        let tracker = FirstMinimumTracker::new(2.0, 2.1);
        let spectra = vec![pair("1.33", 1.2, 1.2), pair("1.35", 1.2, 1.2)];
        assert!(tracker.first_minimum(&spectra[0]).is_none());
        assert!(tracker.landslide(&spectra).is_empty());
        assert!(tracker.sensitivity(&spectra).is_err());
    }

    #[test]
    fn landslide_keeps_sequences_aligned() {
        let tracker = FirstMinimumTracker::default();
        let spectra = vec![
            pair("1.33", 1.19, 1.17),
            pair("water", 1.19, 1.17),
            pair("1.37", 1.20, 1.19),
        ];
        let ls = tracker.landslide(&spectra);
        assert_eq!(ls.ri, vec![1.33, 1.37]);
        assert_eq!(ls.min_125.len(), 2);
        assert_eq!(ls.min_25.len(), 2);
    }

    #[test]
    fn gradient_matches_nonuniform_central_difference() {
        // y = x^2 is differentiated exactly by the second-order scheme inside
        let x = [0.0, 1.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let g = gradient(&y, &x).unwrap();
        assert_relative_eq!(g[0], 1.0);
        assert_relative_eq!(g[1], 2.0);
        assert_relative_eq!(g[2], 6.0);
        assert_relative_eq!(g[3], 7.0);
    }

    #[test]
    fn gradient_of_constant_is_zero() {
        let x = [1.33, 1.35, 1.37, 1.39, 1.40];
        let g = gradient(&[1.2; 5], &x).unwrap();
        assert!(g.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn gradient_needs_two_points() {
        assert!(gradient(&[1.0], &[1.0]).is_err());
        assert!(gradient(&[1.0, 2.0], &[1.0]).is_err());
    }
}
