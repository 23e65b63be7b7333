//! Dedup index: in-memory map from record id to the partition file it lives
//! in, lazily rebuilt from disk on first need.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::IoResult;
use crate::layout::{EnvelopeClass, StoreLayout};

#[derive(Debug, Default)]
pub struct DedupIndex {
    by_id: HashMap<String, PathBuf>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&PathBuf> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Insert `id → path` only if `id` is not already present. Returns
    /// `true` if the insert happened (first-seen wins).
    pub fn insert(&mut self, id: String, path: PathBuf) -> bool {
        if self.by_id.contains_key(&id) {
            return false;
        }
        self.by_id.insert(id, path);
        true
    }

    /// Rebuild from scratch by enumerating `class`'s partition files in
    /// lexicographic order and scanning each line-by-line. Blank lines are
    /// skipped; first-seen-per-id wins, which is stable across restarts
    /// because lexicographic partition order is also chronological order.
    pub fn rebuild<T>(layout: &StoreLayout, class: EnvelopeClass) -> IoResult<Self>
    where
        T: DeserializeOwned + IdOf,
    {
        let mut index = Self::new();
        let partitions = layout.list_partitions(class)?;
        debug!(count = partitions.len(), ?class, "rebuilding dedup index");
        for path in partitions {
            let contents = fs::read_to_string(&path)?;
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: T = serde_json::from_str(line)?;
                index.insert(record.id_of().to_string(), path.clone());
            }
        }
        Ok(index)
    }
}

/// Minimal accessor so [`DedupIndex::rebuild`] doesn't need the full
/// `Envelope` trait bound (it only needs the id, not validation/timestamp).
pub trait IdOf {
    fn id_of(&self) -> &str;
}

impl IdOf for es_core::model::SignalEnvelope {
    fn id_of(&self) -> &str {
        &self.signal_id
    }
}

impl IdOf for es_core::model::EmissionEnvelope {
    fn id_of(&self) -> &str {
        &self.emission_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use es_core::model::SignalEnvelope;

    #[test]
    fn first_seen_wins_across_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());

        let s1 = SignalEnvelope::new(
            "s-1",
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            "src",
            "T",
            serde_json::Map::new(),
            vec![],
            "0.1",
        );
        let day1 = layout.partition_path(EnvelopeClass::Signal, s1.timestamp);
        crate::canonical_json::append_canonical_line(&day1, &s1).unwrap();

        let s1_again = SignalEnvelope::new(
            "s-1",
            Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
            "src",
            "T",
            serde_json::Map::new(),
            vec![],
            "0.1",
        );
        let day2 = layout.partition_path(EnvelopeClass::Signal, s1_again.timestamp);
        crate::canonical_json::append_canonical_line(&day2, &s1_again).unwrap();

        let index = DedupIndex::rebuild::<SignalEnvelope>(&layout, EnvelopeClass::Signal).unwrap();
        assert_eq!(index.get("s-1"), Some(&day1));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let path = layout.partition_path_for_day(EnvelopeClass::Signal, "2026-01-01");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "\n{\"signal_id\":\"s-1\",\"timestamp\":\"2026-01-01T00:00:00Z\",\"source\":\"src\",\"payload_type\":\"T\",\"schema_version\":\"0.1\"}\n\n").unwrap();

        let index = DedupIndex::rebuild::<SignalEnvelope>(&layout, EnvelopeClass::Signal).unwrap();
        assert_eq!(index.len(), 1);
    }
}
