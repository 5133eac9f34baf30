//! Datasets for the Kindi dashboard
//!
//! The dashboard reads a dataset index and per-dataset JSON documents from a
//! web server or a local directory, keeps recently loaded documents in a
//! cache, and writes the current view out as JSON or CSV.

pub mod cache;
pub mod export;
pub mod model;
pub mod sources;

use thiserror::Error;

// Re-exports
pub use cache::DatasetCache;
pub use export::{export_view, ExportOutput, ExportRequest};
pub use model::{DatasetDocument, DatasetIndex, DatasetInfo, Entity, Event, Location, Relationship};
pub use sources::{DatasetLoader, DatasetSource, DirectorySource, HttpSource};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to load dataset '{dataset_id}': {reason}")]
    Load { dataset_id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl DataError {
    pub fn load(dataset_id: &str, reason: impl ToString) -> Self {
        DataError::Load {
            dataset_id: dataset_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The dataset a load error refers to
    pub fn dataset_id(&self) -> Option<&str> {
        match self {
            DataError::Load { dataset_id, .. } => Some(dataset_id),
            _ => None,
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => {
                DataError::Io(std::io::Error::new(io_err.kind(), error.to_string()))
            }
            _ => DataError::Csv(error.to_string()),
        }
    }
}
