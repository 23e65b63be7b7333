//! Checkpoint engine: build a resume token from a processed sequence, apply
//! it to skip already-seen records on the next range scan, and persist/read
//! it as a small JSON document.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use es_core::envelope::Envelope;
use es_core::model::ReplayCheckpoint;
use serde::de::DeserializeOwned;

use crate::canonical_json::write_canonical_file;
use crate::error::{IoError, IoResult};
use crate::layout::{EnvelopeClass, StoreLayout};
use crate::scan::RangeScanner;

/// Build a checkpoint from a sequence of envelopes a consumer just
/// finished processing, in the order it processed them. Empty input has no
/// meaningful resume point — callers should treat that case separately.
///
/// Walks the sequence once, requiring non-decreasing canonical timestamps;
/// a later timestamp strictly less than a prior one is structurally
/// impossible for a well-ordered replay prefix and signals invalid input
/// rather than silently producing a checkpoint that would skip records.
pub fn build_checkpoint<T: Envelope>(processed: &[T]) -> IoResult<Option<ReplayCheckpoint>> {
    let mut max_timestamp = None;
    let mut seen_ids_at_timestamp: Vec<String> = Vec::new();
    let mut seen_at_timestamp: HashSet<String> = HashSet::new();

    for record in processed {
        let ts = record.timestamp();
        match max_timestamp {
            None => {
                max_timestamp = Some(ts);
                let id = record.id().to_string();
                seen_at_timestamp.insert(id.clone());
                seen_ids_at_timestamp.push(id);
            }
            Some(prev) if ts < prev => {
                return Err(IoError::Invalid(format!(
                    "non-monotonic checkpoint input: {ts} is before previously seen {prev}"
                )));
            }
            Some(prev) if ts > prev => {
                max_timestamp = Some(ts);
                let id = record.id().to_string();
                seen_at_timestamp = std::iter::once(id.clone()).collect();
                seen_ids_at_timestamp = vec![id];
            }
            Some(_) => {
                let id = record.id().to_string();
                // first-seen wins: only push ids not already recorded at
                // this timestamp, keeping the list deduplicated.
                if seen_at_timestamp.insert(id.clone()) {
                    seen_ids_at_timestamp.push(id);
                }
            }
        }
    }

    Ok(max_timestamp.map(|ts| ReplayCheckpoint::new(ts, seen_ids_at_timestamp)))
}

/// Resume a range scan from `checkpoint`, re-scanning from
/// `max(start, checkpoint.last_timestamp)` through `end` and dropping any
/// record whose timestamp equals the checkpoint's boundary and whose id is
/// in `seen_ids_at_timestamp` — the inclusive-boundary exclusion rule.
pub fn iter_from_checkpoint<T>(
    layout: &StoreLayout,
    class: EnvelopeClass,
    checkpoint: &ReplayCheckpoint,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> IoResult<impl Iterator<Item = Result<T, IoError>>>
where
    T: Envelope + DeserializeOwned + 'static,
{
    iter_from_checkpoint_filtered(layout, class, checkpoint, start, end, |_: &T| true)
}

/// Same as [`iter_from_checkpoint`], but applies `predicate` inside the
/// underlying scanner itself — before a non-matching record can consume
/// another record's dedup slot (see [`RangeScanner::with_filter`]).
pub fn iter_from_checkpoint_filtered<T>(
    layout: &StoreLayout,
    class: EnvelopeClass,
    checkpoint: &ReplayCheckpoint,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    predicate: impl FnMut(&T) -> bool + 'static,
) -> IoResult<impl Iterator<Item = Result<T, IoError>>>
where
    T: Envelope + DeserializeOwned + 'static,
{
    let effective_start = start.max(checkpoint.last_timestamp);
    let boundary_ts = checkpoint.last_timestamp;
    let seen_at_boundary: HashSet<String> =
        checkpoint.seen_ids_at_timestamp.iter().cloned().collect();

    let scanner =
        RangeScanner::<T>::new(layout, class, effective_start, end)?.with_filter(predicate);
    Ok(scanner.filter(move |res| match res {
        Ok(record) => {
            !(record.timestamp() == boundary_ts && seen_at_boundary.contains(record.id()))
        }
        Err(_) => true,
    }))
}

/// Write (or overwrite) the named checkpoint document.
pub fn write_checkpoint(
    layout: &StoreLayout,
    name: &str,
    checkpoint: &ReplayCheckpoint,
) -> IoResult<()> {
    write_canonical_file(&layout.checkpoint_path(name), checkpoint)
}

/// Read the named checkpoint. A missing file is an absence, not an error.
pub fn read_checkpoint(layout: &StoreLayout, name: &str) -> IoResult<Option<ReplayCheckpoint>> {
    let path = layout.checkpoint_path(name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_json::append_canonical_line;
    use chrono::TimeZone;
    use es_core::model::SignalEnvelope;

    fn sig(id: &str, h: u32, m: u32) -> SignalEnvelope {
        SignalEnvelope::new(
            id,
            Utc.with_ymd_and_hms(2026, 1, 1, h, m, 0).unwrap(),
            "src",
            "T",
            serde_json::Map::new(),
            vec![],
            "0.1",
        )
    }

    #[test]
    fn resume_skips_only_boundary_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());

        let all = vec![
            sig("s-c1", 10, 0),
            sig("s-c2", 10, 0),
            sig("s-c3", 10, 1),
            sig("s-c4", 10, 2),
        ];
        for s in &all {
            let p = layout.partition_path(EnvelopeClass::Signal, s.timestamp);
            append_canonical_line(&p, s).unwrap();
        }

        let cp = build_checkpoint(&all[..2]).unwrap().unwrap();
        assert_eq!(cp.seen_ids_at_timestamp.len(), 2);

        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 23, 59, 59).unwrap();
        let resumed: Vec<String> =
            iter_from_checkpoint::<SignalEnvelope>(&layout, EnvelopeClass::Signal, &cp, start, end)
                .unwrap()
                .map(|r| r.unwrap().signal_id)
                .collect();
        assert_eq!(resumed, vec!["s-c3".to_string(), "s-c4".to_string()]);
    }

    #[test]
    fn non_monotonic_input_is_invalid() {
        let out_of_order = vec![sig("s-c2", 10, 1), sig("s-c1", 10, 0)];
        let res = build_checkpoint(&out_of_order);
        assert!(matches!(res, Err(IoError::Invalid(_))));
    }

    #[test]
    fn empty_input_has_no_checkpoint() {
        let none: Vec<SignalEnvelope> = Vec::new();
        assert!(build_checkpoint(&none).unwrap().is_none());
    }

    #[test]
    fn read_missing_checkpoint_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        assert!(read_checkpoint(&layout, "nope").unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let cp = ReplayCheckpoint::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap(),
            vec!["s-1".to_string()],
        );
        write_checkpoint(&layout, "worker-a", &cp).unwrap();
        let read_back = read_checkpoint(&layout, "worker-a").unwrap().unwrap();
        assert_eq!(read_back, cp);
    }
}
