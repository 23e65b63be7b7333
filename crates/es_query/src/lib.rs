//! crates/es_query/src/lib.rs
//! The Query Facade: a thin, deterministic composition layer over
//! `es_io`'s range scanner and checkpoint engine. Nothing here mutates
//! the store; every function is a pure read given its inputs and the
//! partition contents on disk.

#![forbid(unsafe_code)]

pub mod defaults;
pub mod error;
pub mod filter;
pub mod query;

pub use error::{QueryError, QueryResult};

pub mod prelude {
    pub use crate::defaults::*;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{collect_emissions, collect_signals, EmissionFilter, SignalFilter};
    pub use crate::query::*;
}
