//! Batch driver: load a wide transmission table, run the full RI-sensing
//! analysis and write every result table as CSV.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sms_spectra::analysis::covariance::covariance;
use sms_spectra::analysis::shift::FirstMinimumTracker;
use sms_spectra::config::AnalysisConfig;
use sms_spectra::data::filter::preprocess;
use sms_spectra::data::loader::load_table;
use sms_spectra::data::model::COL_DIAMETER;
use sms_spectra::error::AnalysisError;
use sms_spectra::report;
use sms_spectra::stats::StatisticalComparer;
use sms_spectra::{curve_pairs, extract_features};

#[derive(Parser)]
#[command(name = "sms-spectra")]
#[command(author, version, about = "RI sensing analysis of SMS fiber transmission spectra", long_about = None)]
struct Cli {
    /// Wide measurement table (.csv, .parquet or .json)
    #[arg(short, long)]
    input: PathBuf,

    /// JSON run configuration; defaults apply to anything it omits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for result tables
    #[arg(long)]
    tables_dir: Option<PathBuf>,

    /// Directory for the preprocessed measurement table
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Feature column the hypothesis tests run on
    #[arg(long)]
    column: Option<String>,

    /// Significance level
    #[arg(long)]
    alpha: Option<f64>,

    /// Dips kept per curve
    #[arg(long)]
    top_k: Option<usize>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut cfg = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(dir) = &self.tables_dir {
            cfg.tables_dir = dir.clone();
        }
        if let Some(dir) = &self.processed_dir {
            cfg.processed_dir = dir.clone();
        }
        if let Some(column) = &self.column {
            cfg.test_column = column.clone();
        }
        if let Some(alpha) = self.alpha {
            cfg.alpha = alpha;
        }
        if let Some(top_k) = self.top_k {
            cfg.peaks.top_k = top_k;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = cli.resolve_config()?;

    let raw = load_table(&cli.input)?;
    let table = preprocess(&raw, &cfg).context("preprocessing measurement table")?;

    report::ensure_dir(&cfg.processed_dir)?;
    report::ensure_dir(&cfg.tables_dir)?;
    let tables = cfg.tables_dir.as_path();
    report::write_table(&cfg.processed_dir.join(report::PROCESSED_FILE), &table)?;

    // Spectral shift
    let pairs = curve_pairs(&table, &cfg)?;
    let tracker = FirstMinimumTracker::new(cfg.minimum_window.0, cfg.minimum_window.1);
    let landslide = tracker.landslide(&pairs);
    report::write_landslide(&tables.join(report::LANDSLIDE_FILE), &landslide)?;
    match tracker.sensitivity(&pairs) {
        Ok(sensitivity) => {
            report::write_sensitivity(&tables.join(report::SENSITIVITY_FILE), &sensitivity)?
        }
        Err(e) => log::warn!("sensitivity not computed: {e}"),
    }
    let cov = covariance(&table, &cfg.unetched_columns, &cfg.etched_columns)?;
    report::write_covariance(tables, &cov, &cfg.ri_labels)?;

    // Features
    let features = extract_features(&table, &cfg)?;
    report::write_features(&tables.join(report::FEATURES_FILE), &features)?;
    report::write_features(&cfg.processed_dir.join(report::FEATURES_FILE), &features)?;

    // Statistics
    let comparer = StatisticalComparer::new(&features, cfg.alpha)?;
    report::write_summary(&tables.join(report::SUMMARY_FILE), &comparer.summary())?;

    let normality = comparer.normality_by_group(&cfg.test_column, COL_DIAMETER)?;
    report::write_normality(&tables.join(report::NORMALITY_FILE), &normality)?;

    match comparer.group_comparison(&cfg.test_column, COL_DIAMETER) {
        Ok(anova) => report::write_anova(&tables.join(report::ANOVA_FILE), &anova)?,
        Err(e @ AnalysisError::InsufficientGroups(_)) => log::warn!("ANOVA not run: {e}"),
        Err(e) => return Err(e.into()),
    }

    let paired = comparer.paired_test(&cfg.test_column, &cfg.unetched_label, &cfg.etched_label)?;
    report::write_wilcoxon(&tables.join(report::WILCOXON_FILE), &[paired])?;

    log::info!("results written to {}", tables.display());
    Ok(())
}
