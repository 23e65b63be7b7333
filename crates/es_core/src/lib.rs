//! crates/es_core/src/lib.rs
//! Core envelope types, time normalization, and validation errors for the
//! replay event store. No I/O — file layout and persistence live in `es_io`.

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod model;
pub mod time;

pub mod prelude {
    pub use crate::envelope::Envelope;
    pub use crate::error::CoreError;
    pub use crate::model::{EmissionEnvelope, EntityRef, ReplayCheckpoint, SignalEnvelope};
    pub use crate::time::{
        parse_timestamp, partition_day, snapshot_token, to_utc, IntoInstant, StableOrd,
        TieBreakKey,
    };
    #[cfg(feature = "serde")]
    pub use crate::time::parse_timestamp_value;
}
