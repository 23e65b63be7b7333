//! crates/es_io/src/error.rs — unified error type for this crate.
//!
//! One enum, `From` conversions for the two underlying failure sources
//! (filesystem, JSON), plus the store-specific validation and
//! duplicate-policy variants.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem errors (create_dir_all, rename, fsync, open, read, write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Per-line or whole-document JSON failures. These surface as structural
    /// corruption — the store never silently drops a bad line.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing required field, bad duplicate policy, `end < start`,
    /// non-monotonic checkpoint input.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// `on_duplicate == "raise"` and the id already exists.
    #[error("duplicate event {id:?} already written to {}", existing_path.display())]
    Duplicate {
        id: String,
        existing_path: PathBuf,
    },
}

impl From<es_core::error::CoreError> for IoError {
    fn from(e: es_core::error::CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

pub type IoResult<T> = Result<T, IoError>;
