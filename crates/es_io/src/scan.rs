//! Range scanner: streams records from a closed interval `[start, end]`
//! across partitions with deterministic ordering and dedup-on-read. A lazy,
//! finite pull-iterator — one open file handle at a time, one allocation
//! per line, no partition materialized in full.

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use es_core::envelope::Envelope;
use es_core::time::partition_day;
use serde::de::DeserializeOwned;

use crate::error::IoError;
use crate::layout::{EnvelopeClass, StoreLayout};

/// A lazy, finite iterator over envelopes of one class within `[start, end]`.
///
/// Chronological order within and across partitions is guaranteed only to
/// the extent that producers append in non-decreasing timestamp order:
/// partition file order is always respected, but this scanner does not
/// re-sort lines within a file.
pub struct RangeScanner<T> {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pending_files: VecDeque<PathBuf>,
    current: Option<Lines<BufReader<File>>>,
    seen: HashSet<String>,
    predicate: Option<Box<dyn FnMut(&T) -> bool>>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> RangeScanner<T>
where
    T: Envelope + DeserializeOwned,
{
    pub fn new(
        layout: &StoreLayout,
        class: EnvelopeClass,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, IoError> {
        if end < start {
            return Err(IoError::Invalid(format!(
                "end ({end}) is before start ({start})"
            )));
        }
        let start_day = partition_day(start);
        let end_day = partition_day(end);

        let all = layout.list_partitions(class)?;
        let pending_files: VecDeque<PathBuf> = all
            .into_iter()
            .filter(|p| {
                let day = p
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                day >= start_day.as_str() && day <= end_day.as_str()
            })
            .collect();

        Ok(Self {
            start,
            end,
            pending_files,
            current: None,
            seen: HashSet::new(),
            predicate: None,
            _marker: std::marker::PhantomData,
        })
    }

    /// Apply `predicate` inside the scan itself, before a record is marked
    /// seen. A record that fails the predicate never consumes another
    /// record's dedup slot — required so a business filter (source,
    /// entity_ref, payload_type, ...) can coexist with read-side dedup
    /// without masking a later, matching duplicate line.
    pub fn with_filter(mut self, predicate: impl FnMut(&T) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn advance_file(&mut self) -> Result<bool, IoError> {
        loop {
            match self.pending_files.pop_front() {
                None => return Ok(false),
                Some(path) => match File::open(&path) {
                    Ok(f) => {
                        self.current = Some(BufReader::new(f).lines());
                        return Ok(true);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                },
            }
        }
    }
}

impl<T> Iterator for RangeScanner<T>
where
    T: Envelope + DeserializeOwned,
{
    type Item = Result<T, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                match self.advance_file() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }

            let line = {
                let lines = self.current.as_mut().unwrap();
                lines.next()
            };

            match line {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(e)) => return Some(Err(e.into())),
                Some(Ok(raw)) => {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    let record: T = match serde_json::from_str(&raw) {
                        Ok(r) => r,
                        Err(e) => return Some(Err(e.into())),
                    };
                    let ts = record.timestamp();
                    if ts < self.start || ts > self.end {
                        continue;
                    }
                    if let Some(predicate) = self.predicate.as_mut() {
                        if !predicate(&record) {
                            continue;
                        }
                    }
                    if !self.seen.insert(record.id().to_string()) {
                        continue;
                    }
                    return Some(Ok(record));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_json::append_canonical_line;
    use chrono::TimeZone;
    use es_core::model::SignalEnvelope;

    fn sig(id: &str, y: i32, m: u32, d: u32, h: u32) -> SignalEnvelope {
        SignalEnvelope::new(
            id,
            Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            "src",
            "T",
            serde_json::Map::new(),
            vec![],
            "0.1",
        )
    }

    fn sig_with_source(id: &str, y: i32, m: u32, d: u32, h: u32, source: &str) -> SignalEnvelope {
        SignalEnvelope::new(
            id,
            Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            source,
            "T",
            serde_json::Map::new(),
            vec![],
            "0.1",
        )
    }

    #[test]
    fn scan_skips_out_of_range_partitions_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());

        let a = sig("s-a", 2026, 1, 1, 10);
        let b = sig("s-b", 2026, 1, 2, 10);
        let c = sig("s-c", 2026, 1, 3, 10);
        for s in [&a, &b, &c] {
            let p = layout.partition_path(EnvelopeClass::Signal, s.timestamp);
            append_canonical_line(&p, s).unwrap();
        }
        // duplicate line in day 2's file
        let p_b = layout.partition_path(EnvelopeClass::Signal, b.timestamp);
        append_canonical_line(&p_b, &b).unwrap();

        let start = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 2, 23, 59, 59).unwrap();
        let scanner: RangeScanner<SignalEnvelope> =
            RangeScanner::new(&layout, EnvelopeClass::Signal, start, end).unwrap();
        let results: Vec<_> = scanner.map(|r| r.unwrap().signal_id).collect();
        assert_eq!(results, vec!["s-b".to_string()]);
    }

    #[test]
    fn non_matching_duplicate_line_does_not_consume_the_matching_ones_dedup_slot() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());

        // Same id, two partition days, different sources — the earlier,
        // non-matching line must not shadow the later, matching one.
        let other = sig_with_source("s-1", 2026, 1, 1, 10, "other");
        let matching = sig_with_source("s-1", 2026, 1, 2, 10, "route.worker");
        let p_other = layout.partition_path(EnvelopeClass::Signal, other.timestamp);
        append_canonical_line(&p_other, &other).unwrap();
        let p_matching = layout.partition_path(EnvelopeClass::Signal, matching.timestamp);
        append_canonical_line(&p_matching, &matching).unwrap();

        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap();
        let scanner: RangeScanner<SignalEnvelope> =
            RangeScanner::new(&layout, EnvelopeClass::Signal, start, end)
                .unwrap()
                .with_filter(|s: &SignalEnvelope| s.source == "route.worker");
        let results: Vec<_> = scanner.map(|r| r.unwrap().source).collect();
        assert_eq!(results, vec!["route.worker".to_string()]);
    }

    #[test]
    fn end_before_start_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let start = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let res = RangeScanner::<SignalEnvelope>::new(&layout, EnvelopeClass::Signal, start, end);
        assert!(matches!(res, Err(IoError::Invalid(_))));
    }
}
