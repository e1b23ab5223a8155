//! The four pipeline stages, each an independently re-runnable batch job.

pub mod aggregate;
pub mod archive_polling_units;
pub mod archive_states;
pub mod upload_stats;

use crate::client::TransportError;
use crate::schema::ValidationError;
use crate::storage::StorageError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A lookup between hierarchy levels that must succeed did not. There is
    /// no safe recovery.
    #[error("invariant violated: {0}")]
    Assertion(String),
    /// Some items in a stage failed while their siblings completed; details
    /// were reported as they happened.
    #[error("{failed} of {total} {subject} failed")]
    Partial {
        failed: usize,
        total: usize,
        subject: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Read a file and parse it as JSON. The parsed value still has to pass
/// shape validation before use.
pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value =
        serde_json::from_str(&contents).map_err(|source| ValidationError::Shape {
            shape: "json document",
            context: path.display().to_string(),
            source,
        })?;
    Ok(value)
}

/// Finish a CSV writer backed by an in-memory buffer.
pub(crate) fn csv_into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| PipelineError::Assertion(format!("csv buffer unavailable: {}", err)))?;
    String::from_utf8(bytes)
        .map_err(|err| PipelineError::Assertion(format!("csv output was not valid utf-8: {}", err)))
}
