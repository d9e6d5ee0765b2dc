use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::analysis::peaks::PeakConfig;

// ---------------------------------------------------------------------------
// AnalysisConfig – everything the pipeline needs besides the input table
// ---------------------------------------------------------------------------

/// Run configuration. Every field has a default matching the six-RI
/// etched/unetched measurement layout, so an empty JSON object is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// RI label of each measurement column pair, in column order.
    pub ri_labels: Vec<String>,
    /// Transmission columns of the unetched (125 µm) fiber.
    pub unetched_columns: Vec<String>,
    /// Transmission columns of the etched (25 µm) fiber.
    pub etched_columns: Vec<String>,
    pub unetched_label: String,
    pub etched_label: String,

    pub wavelength_column: String,
    /// Preprocessing range, inclusive.
    pub wavelength_range: (f64, f64),

    pub peaks: PeakConfig,

    /// Diagnostic window for the first-minimum tracker, inclusive.
    pub minimum_window: (f64, f64),

    /// Significance level shared by all tests.
    pub alpha: f64,
    /// Feature column the normality, ANOVA and Wilcoxon tests run on.
    pub test_column: String,

    pub tables_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let unetched: Vec<String> = ["RI_Water", "RI_B", "RI_C", "RI_D", "RI_E", "RI_F"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let etched = unetched.iter().map(|c| format!("{c}_etching")).collect();
        Self {
            ri_labels: ["1.33", "1.35", "1.37", "1.39", "1.40", "1.41"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unetched_columns: unetched,
            etched_columns: etched,
            unetched_label: "125 µm".to_string(),
            etched_label: "25 µm".to_string(),
            wavelength_column: "Wavelength".to_string(),
            wavelength_range: (1.04, 1.43),
            peaks: PeakConfig::default(),
            minimum_window: (1.16, 1.23),
            alpha: 0.05,
            test_column: "Wavelength".to_string(),
            tables_dir: PathBuf::from("Results").join("tables"),
            processed_dir: PathBuf::from("Data").join("processed"),
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AnalysisConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let n = self.ri_labels.len();
        if self.unetched_columns.len() != n || self.etched_columns.len() != n {
            bail!(
                "{} RI labels but {} unetched and {} etched columns",
                n,
                self.unetched_columns.len(),
                self.etched_columns.len()
            );
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            bail!("alpha must lie in (0, 1), got {}", self.alpha);
        }
        if self.peaks.top_k == 0 {
            bail!("peaks.top_k must be at least 1");
        }
        if self.wavelength_range.0 > self.wavelength_range.1 {
            bail!("wavelength_range is reversed: {:?}", self.wavelength_range);
        }
        if self.minimum_window.0 > self.minimum_window.1 {
            bail!("minimum_window is reversed: {:?}", self.minimum_window);
        }
        Ok(())
    }
}
