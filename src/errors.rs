use std::path::Path;

/// Domain-specific error types for the calibration fitter.
/// Only unreadable input, malformed rows, and unwritable output are fatal.
/// Everything else (bad prior artifact, small groups, low row counts)
/// is logged and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("csv error: {0}")]
    Csv(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("input table error: {0}")]
    Table(String),

    #[error("config error: {0}")]
    Config(String),
}

impl CalibrationError {
    pub fn io(path: &Path, e: impl std::fmt::Display) -> Self {
        CalibrationError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl From<csv::Error> for CalibrationError {
    fn from(e: csv::Error) -> Self {
        CalibrationError::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for CalibrationError {
    fn from(e: serde_json::Error) -> Self {
        CalibrationError::Parse(e.to_string())
    }
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;
