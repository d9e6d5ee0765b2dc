//! Refractive-index sensing analysis for SMS fiber transmission spectra.
//!
//! ```text
//! load_table ─► preprocess ─► curve_pairs ─► FirstMinimumTracker (landslide, sensitivity)
//!                    │                    └─► covariance
//!                    └──────► extract_features ─► StatisticalComparer
//!                                                        │
//!                                                   report::write_*
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod stats;

use analysis::peaks::PeakExtractor;
use config::AnalysisConfig;
use data::model::{CurvePair, FeatureTable, MeasurementTable};
use error::Result;

/// One unetched/etched pair per configured RI label, in config order.
pub fn curve_pairs(table: &MeasurementTable, cfg: &AnalysisConfig) -> Result<Vec<CurvePair>> {
    cfg.ri_labels
        .iter()
        .zip(cfg.unetched_columns.iter().zip(&cfg.etched_columns))
        .map(|(ri, (unetched, etched))| table.pair(&cfg.wavelength_column, unetched, etched, ri))
        .collect()
}

/// Run the dip extractor over every configured curve: all unetched curves
/// first, then all etched ones, each in RI order.
pub fn extract_features(table: &MeasurementTable, cfg: &AnalysisConfig) -> Result<FeatureTable> {
    let extractor = PeakExtractor::new(cfg.peaks.clone());
    let mut features = FeatureTable::default();
    for (diameter, columns) in [
        (&cfg.unetched_label, &cfg.unetched_columns),
        (&cfg.etched_label, &cfg.etched_columns),
    ] {
        for (ri, column) in cfg.ri_labels.iter().zip(columns) {
            let curve = table.curve(&cfg.wavelength_column, column, ri, diameter)?;
            features.extend(extractor.extract(&curve));
        }
    }
    log::info!(
        "extracted {} features from {} curves",
        features.len(),
        cfg.ri_labels.len() * 2
    );
    Ok(features)
}
