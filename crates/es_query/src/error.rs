//! Query-facade error type. The facade never produces its own failure modes
//! beyond what the scanner/checkpoint engine already surfaces — this wraps
//! `es_io::IoError` so callers depending on `es_query` alone don't need to
//! name `es_io` directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Io(#[from] es_io::error::IoError),
}

pub type QueryResult<T> = Result<T, QueryError>;
