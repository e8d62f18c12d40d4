use std::path::PathBuf;

use thiserror::Error;

pub type DashResult<T> = Result<T, DashError>;

#[derive(Debug, Error)]
pub enum DashError {
    /// The survey file could not be read or has no usable rows.
    #[error("failed to load dataset {path:?}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("no column ends with \"HaveWorkedWith\"; nothing to chart")]
    NoCategoriesFound,

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DashError {
    pub fn data_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DashError::DataLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that abort startup rather than degrading a single chart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DashError::DataLoad { .. } | DashError::NoCategoriesFound)
    }
}
