use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which static input a load error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Document,
    Dataset,
    Upload,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Document => f.write_str("document"),
            SourceKind::Dataset => f.write_str("dataset"),
            SourceKind::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Error, Debug)]
pub enum FailsightError {
    #[error("{kind} not found: {}", path.display())]
    SourceNotFound { kind: SourceKind, path: PathBuf },

    #[error("{kind} format error in {}: {reason}", path.display())]
    SourceFormat {
        kind: SourceKind,
        path: PathBuf,
        reason: String,
    },

    #[error("dataset {} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("could not decode bytes as UTF-8 or {encoding}")]
    Decode { encoding: String },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl FailsightError {
    pub fn format(kind: SourceKind, path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        FailsightError::SourceFormat {
            kind,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors raised while reading a source that is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FailsightError::SourceNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, FailsightError>;
