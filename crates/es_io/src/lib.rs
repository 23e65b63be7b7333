//! crates/es_io/src/lib.rs
//! Partition layout, atomic canonical-JSON writes, append writer, dedup
//! index, range scanner, checkpoint engine, and snapshot persistence for
//! the replay event store. Builds on `es_core`'s envelope types and time
//! normalizer; this crate is where the store actually touches disk.

#![forbid(unsafe_code)]

pub mod canonical_json;
pub mod checkpoint;
pub mod dedup;
pub mod error;
pub mod layout;
pub mod scan;
pub mod snapshot;
pub mod store;
pub mod writer;

pub mod prelude {
    pub use crate::checkpoint::{
        build_checkpoint, iter_from_checkpoint, iter_from_checkpoint_filtered, read_checkpoint,
        write_checkpoint,
    };
    pub use crate::dedup::DedupIndex;
    pub use crate::error::{IoError, IoResult};
    pub use crate::layout::{EnvelopeClass, StoreLayout};
    pub use crate::scan::RangeScanner;
    pub use crate::snapshot::{
        read_calibration_snapshot, read_daily_digest_snapshot, write_calibration_snapshot,
        write_daily_digest_snapshot, write_snapshot, DayKey,
    };
    pub use crate::store::EventStore;
    pub use crate::writer::{AppendWriter, DuplicatePolicy};
}
