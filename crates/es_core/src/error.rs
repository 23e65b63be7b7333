//! Minimal error set for core-domain validation — no I/O, no policy errors.
//! Those live in `es_io`/`es_query`, which wrap `CoreError` where relevant.
//! Kept dependency-light like the teacher's `vm_core` — no `thiserror` here.

use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CoreError {
    EmptyField(&'static str),
    InvalidTimestamp(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::EmptyField(field) => {
                write!(f, "{field} is required and must not be empty")
            }
            CoreError::InvalidTimestamp(raw) => write!(f, "could not parse timestamp: {raw:?}"),
        }
    }
}

impl std::error::Error for CoreError {}
