//! Hypothesis tests and descriptive statistics over the feature table.
//!
//! ```text
//! FeatureTable ──► describe    summary per column
//!              ├─► normality   Shapiro-Wilk per group
//!              ├─► anova       one-way ANOVA across groups
//!              └─► wilcoxon    RI-matched paired test, A > B
//! ```
//!
//! "Too few observations" produces sentinel records, never errors.

pub mod anova;
pub mod comparer;
pub mod describe;
pub mod normality;
pub mod wilcoxon;

pub use anova::{AnovaRecord, GroupVerdict};
pub use comparer::StatisticalComparer;
pub use describe::{ColumnSummary, Summary};
pub use normality::{NormalityRecord, NormalityVerdict, ShapiroWilk};
pub use wilcoxon::{PairedOutcome, PairedRow, PairedVerdict, WilcoxonRecord};
