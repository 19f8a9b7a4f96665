use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unmatched message id {id}: present in {present_in} but missing from {missing_from}")]
    Join {
        id: i64,
        present_in: &'static str,
        missing_from: &'static str,
    },

    #[error("Malformed category encoding for id {id}: {reason}")]
    MalformedCategory { id: i64, reason: String },

    #[error("Malformed input in {source_name} line {line}: {reason}")]
    MalformedInput {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error("Failed to write model artifact to {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },

    #[error("Failed to load model artifact from {path}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed_category(id: i64, reason: impl Into<String>) -> Self {
        Error::MalformedCategory {
            id,
            reason: reason.into(),
        }
    }

    /// Batch stages map every error to a non-zero exit; this tells the
    /// caller whether the failure came from the input data itself.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::Join { .. }
                | Error::MalformedCategory { .. }
                | Error::MalformedInput { .. }
                | Error::EmptyDataset(_)
        )
    }
}
