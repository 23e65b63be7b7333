//! Append writer: serialized append of one record to the correct
//! partition file, enforcing the duplicate policy. Generic over
//! [`Envelope`] so signal and emission writers share one implementation.

use std::path::PathBuf;

use es_core::envelope::Envelope;
use serde::Serialize;
use tracing::{debug, warn};

use crate::canonical_json::append_canonical_line;
use crate::dedup::DedupIndex;
use crate::error::{IoError, IoResult};
use crate::layout::{EnvelopeClass, StoreLayout};

/// What to do when an id already exists in the dedup index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Silently return the existing partition path; do not write.
    Ignore,
    /// Same as `Ignore` — return the existing partition path.
    ReturnExisting,
    /// Fail with [`IoError::Duplicate`].
    Raise,
}

impl DuplicatePolicy {
    /// Accepts the string spellings a caller (CLI flag, config value) might
    /// hand us; unrecognized input is an invalid-input error, not a panic.
    pub fn parse(raw: &str) -> IoResult<Self> {
        match raw {
            "ignore" => Ok(DuplicatePolicy::Ignore),
            "return_existing" => Ok(DuplicatePolicy::ReturnExisting),
            "raise" => Ok(DuplicatePolicy::Raise),
            other => Err(IoError::Invalid(format!(
                "unknown duplicate policy: {other:?}"
            ))),
        }
    }
}

/// Appends envelopes of one class (signals or emissions) to their
/// partition files, maintaining the in-memory dedup index as it goes.
pub struct AppendWriter<'a> {
    layout: &'a StoreLayout,
    class: EnvelopeClass,
}

impl<'a> AppendWriter<'a> {
    pub fn new(layout: &'a StoreLayout, class: EnvelopeClass) -> Self {
        Self { layout, class }
    }

    /// Append one envelope, returning the partition path it now lives in
    /// (freshly written or pre-existing, per `policy`).
    pub fn write<T>(
        &self,
        index: &mut DedupIndex,
        envelope: &T,
        policy: DuplicatePolicy,
    ) -> IoResult<PathBuf>
    where
        T: Envelope + Serialize,
    {
        envelope.validate()?;

        if let Some(existing) = index.get(envelope.id()) {
            let existing = existing.clone();
            return match policy {
                DuplicatePolicy::Ignore | DuplicatePolicy::ReturnExisting => {
                    debug!(id = envelope.id(), path = %existing.display(), "duplicate, returning existing partition");
                    Ok(existing)
                }
                DuplicatePolicy::Raise => Err(IoError::Duplicate {
                    id: envelope.id().to_string(),
                    existing_path: existing,
                }),
            };
        }

        let dest = self.layout.partition_path(self.class, envelope.timestamp());
        append_canonical_line(&dest, envelope)?;
        index.insert(envelope.id().to_string(), dest.clone());
        debug!(id = envelope.id(), path = %dest.display(), "appended");
        Ok(dest)
    }

    /// Apply `write` to each envelope in order, returning the ordered list
    /// of resulting partition paths (one per input, in input order).
    pub fn write_batch<T>(
        &self,
        index: &mut DedupIndex,
        envelopes: &[T],
        policy: DuplicatePolicy,
    ) -> IoResult<Vec<PathBuf>>
    where
        T: Envelope + Serialize,
    {
        let mut out = Vec::with_capacity(envelopes.len());
        for e in envelopes {
            match self.write(index, e, policy) {
                Ok(p) => out.push(p),
                Err(err) => {
                    warn!(id = e.id(), error = %err, "batch append failed, aborting batch");
                    return Err(err);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use es_core::model::SignalEnvelope;

    fn sig(id: &str, hour: u32) -> SignalEnvelope {
        SignalEnvelope::new(
            id,
            Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap(),
            "src",
            "T",
            serde_json::Map::new(),
            vec![],
            "0.1",
        )
    }

    #[test]
    fn duplicate_raise_reports_existing_path_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let writer = AppendWriter::new(&layout, EnvelopeClass::Signal);
        let mut index = DedupIndex::new();

        let p1 = writer
            .write(&mut index, &sig("s-1", 10), DuplicatePolicy::Raise)
            .unwrap();
        let err = writer
            .write(&mut index, &sig("s-1", 11), DuplicatePolicy::Raise)
            .unwrap_err();
        match err {
            IoError::Duplicate { id, existing_path } => {
                assert_eq!(id, "s-1");
                assert_eq!(existing_path, p1);
            }
            other => panic!("expected Duplicate, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ignore_returns_original_partition() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let writer = AppendWriter::new(&layout, EnvelopeClass::Signal);
        let mut index = DedupIndex::new();

        let p1 = writer
            .write(&mut index, &sig("s-1", 10), DuplicatePolicy::Ignore)
            .unwrap();
        let p2 = writer
            .write(&mut index, &sig("s-1", 23), DuplicatePolicy::Ignore)
            .unwrap();
        assert_eq!(p1, p2);
        let contents = std::fs::read_to_string(&p1).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
