//! Signal-derived analysis of transmission spectra.
//!
//! - [`peaks`] — dip detection, prominence/width scoring, top-K features
//! - [`shift`] — first diagnostic minimum, landslide and RI sensitivity
//! - [`covariance`] — descriptive covariance between measurement columns

pub mod covariance;
pub mod peaks;
pub mod shift;

pub use covariance::{CovarianceMatrix, CovarianceSummary, covariance};
pub use peaks::{PeakCandidate, PeakConfig, PeakExtractor};
pub use shift::{FirstMinimum, FirstMinimumTracker, Landslide, Sensitivity, gradient};
