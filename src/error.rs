use thiserror::Error;

/// Errors raised by the analysis core.
///
/// "Not enough data to test" is never an error: those cases produce sentinel
/// result records. Everything here means the input itself is malformed or an
/// output could not be written.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed input: non-increasing wavelength, length mismatch, bad parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A grouped test was asked to run on too few groups or observations.
    #[error("insufficient groups: {0}")]
    InsufficientGroups(String),

    /// A reference distribution could not be constructed.
    #[error("distribution error: {0}")]
    Distribution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AnalysisError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        AnalysisError::InvalidInput(message.into())
    }

    pub fn insufficient_groups<S: Into<String>>(message: S) -> Self {
        AnalysisError::InsufficientGroups(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
