//! Transmission dip detection and ranking.
//!
//! Dips are found as local maxima of the negated transmission, then scored
//! by prominence / spectral width. Deep, narrow resonance dips score high;
//! shallow or broad ripples score low.

use serde::{Deserialize, Serialize};

use crate::data::model::{FeatureRecord, SpectrumCurve, mean_step, spacing_irregularity};

/// Relative spacing deviation above which widths are flagged as approximate.
const IRREGULAR_SPACING_TOLERANCE: f64 = 0.05;

/// Peak detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Minimum drop from a dip to both neighbouring samples
    pub threshold: f64,
    /// Minimum index distance between accepted dips
    pub min_distance: usize,
    /// Optional prominence floor, applied after the distance filter
    pub min_prominence: Option<f64>,
    /// Number of top-scoring dips kept per curve
    pub top_k: usize,
    /// Height, relative to prominence, at which the width is measured
    pub rel_height: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0001,
            min_distance: 50,
            min_prominence: None,
            top_k: 3,
            rel_height: 0.5,
        }
    }
}

/// A detected dip with every derived quantity attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate {
    /// Sample index in the source curve
    pub index: usize,
    pub wavelength: f64,
    pub transmission: f64,
    /// Depth below the higher of the two surrounding bases
    pub prominence: f64,
    /// Full width at `rel_height` of the prominence, in wavelength units
    pub width: f64,
    /// prominence / width
    pub score: f64,
}

/// Dip extractor for single spectrum curves.
#[derive(Debug, Clone, Default)]
pub struct PeakExtractor {
    config: PeakConfig,
}

impl PeakExtractor {
    pub fn new(config: PeakConfig) -> Self {
        Self { config }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn with_min_distance(mut self, min_distance: usize) -> Self {
        self.config.min_distance = min_distance;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn config(&self) -> &PeakConfig {
        &self.config
    }

    /// Indices of accepted dips, in ascending sample order.
    ///
    /// Pass `curve.transmission()` of a validated [`SpectrumCurve`]; the
    /// wavelength grid is only needed later, by [`Self::score_and_rank`].
    pub fn detect(&self, transmission: &[f64]) -> Vec<usize> {
        let signal: Vec<f64> = transmission.iter().map(|t| -t).collect();
        let mut peaks = local_maxima(&signal);
        peaks.retain(|p| p.min_drop >= self.config.threshold);
        let mut indices = select_by_distance(&signal, &peaks, self.config.min_distance);
        if let Some(min_prominence) = self.config.min_prominence {
            indices.retain(|&i| prominence(&signal, i).0 >= min_prominence);
        }
        indices
    }

    /// Measure every dip, then keep the `top_k` highest scores, best first.
    /// Ties keep detection order.
    pub fn score_and_rank(&self, curve: &SpectrumCurve, peaks: &[usize]) -> Vec<PeakCandidate> {
        let wavelength = curve.wavelength();
        let transmission = curve.transmission();
        let signal: Vec<f64> = transmission.iter().map(|t| -t).collect();
        let step = mean_step(wavelength);

        let irregularity = spacing_irregularity(wavelength);
        if irregularity > IRREGULAR_SPACING_TOLERANCE {
            log::warn!(
                "{} / RI {}: sample spacing deviates {:.1}% from the mean, widths are approximate",
                curve.diameter(),
                curve.ri(),
                irregularity * 100.0
            );
        }

        let mut candidates: Vec<PeakCandidate> = peaks
            .iter()
            .map(|&index| {
                let (prom, left_base, right_base) = prominence(&signal, index);
                let width_samples = width_at(
                    &signal,
                    index,
                    prom,
                    left_base,
                    right_base,
                    self.config.rel_height,
                );
                let width = width_samples * step;
                PeakCandidate {
                    index,
                    wavelength: wavelength[index],
                    transmission: transmission[index],
                    prominence: prom,
                    width,
                    score: prom / width,
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.config.top_k);
        candidates
    }

    /// Detect, rank and label the dips of one curve.
    pub fn extract(&self, curve: &SpectrumCurve) -> Vec<FeatureRecord> {
        let peaks = self.detect(curve.transmission());
        let ranked = self.score_and_rank(curve, &peaks);
        log::debug!(
            "{} / RI {}: {} dips detected, {} retained",
            curve.diameter(),
            curve.ri(),
            peaks.len(),
            ranked.len()
        );
        ranked
            .into_iter()
            .map(|c| FeatureRecord {
                diameter: curve.diameter().to_string(),
                ri: curve.ri().to_string(),
                wavelength: c.wavelength,
                transmission: c.transmission,
                spectral_width: c.width,
                prominence: c.prominence,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Detection primitives (operate on the negated signal)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct LocalMax {
    index: usize,
    /// min(drop to the sample left of `index`, drop to the sample right of it).
    /// Zero for plateaus wider than one sample.
    min_drop: f64,
}

/// Local maxima, including flat plateaus reported at their midpoint.
/// The first and last samples are never maxima.
fn local_maxima(x: &[f64]) -> Vec<LocalMax> {
    let n = x.len();
    let mut out = Vec::new();
    if n < 3 {
        return out;
    }
    let last = n - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let mid = (i + ahead - 1) / 2;
                out.push(LocalMax {
                    index: mid,
                    min_drop: (x[mid] - x[mid - 1]).min(x[mid] - x[mid + 1]),
                });
                i = ahead;
            }
        }
        i += 1;
    }
    out
}

/// Keep the highest maxima, discarding any lower one closer than `distance`.
/// Returns indices in ascending order.
fn select_by_distance(x: &[f64], peaks: &[LocalMax], distance: usize) -> Vec<usize> {
    let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
    if distance <= 1 || indices.len() < 2 {
        return indices;
    }

    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by(|&a, &b| x[indices[b]].total_cmp(&x[indices[a]]));

    let mut keep = vec![true; indices.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && indices[j] - indices[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < indices.len() && indices[k] - indices[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    indices
        .into_iter()
        .zip(keep)
        .filter_map(|(i, k)| k.then_some(i))
        .collect()
}

/// Prominence of the maximum at `peak` and the indices of its two bases.
///
/// Each side is scanned until a sample higher than the peak (or the signal
/// edge) is reached; the base is the lowest point seen on the way.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let height = x[peak];

    let mut left_base = peak;
    let mut left_min = height;
    let mut i = peak;
    loop {
        if x[i] > height {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_base = peak;
    let mut right_min = height;
    for (j, &v) in x.iter().enumerate().skip(peak) {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = j;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

/// Width in samples at `height - rel_height * prominence`, linearly
/// interpolated between the samples that straddle the reference line.
fn width_at(
    x: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> f64 {
    let line = x[peak] - prominence * rel_height;

    let mut i = peak;
    while left_base < i && line < x[i] {
        i -= 1;
    }
    let mut left = i as f64;
    if x[i] < line {
        left += (line - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = peak;
    while i < right_base && line < x[i] {
        i += 1;
    }
    let mut right = i as f64;
    if x[i] < line {
        right -= (line - x[i]) / (x[i - 1] - x[i]);
    }

    right - left
}
