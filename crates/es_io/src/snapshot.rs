//! Snapshot writers: daily digests and calibration reports, plus arbitrary
//! named snapshots. Write-or-overwrite, idempotent
//! when the payload is unchanged (canonical serialization makes repeated
//! writes byte-identical). `read_*` for the two structured families
//! returns an absence, not an error, when the file is missing.

use chrono::{DateTime, Utc};
use es_core::time::partition_day;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical_json::write_canonical_file;
use crate::error::IoResult;
use crate::layout::StoreLayout;

/// Anything that can stand in for `<day>` in a snapshot filename: a
/// pre-formatted string, or an instant that gets UTC-normalized first.
pub enum DayKey {
    Formatted(String),
    Instant(DateTime<Utc>),
}

impl DayKey {
    fn resolve(self) -> String {
        match self {
            DayKey::Formatted(s) => s,
            DayKey::Instant(dt) => partition_day(dt),
        }
    }
}

impl From<&str> for DayKey {
    fn from(s: &str) -> Self {
        DayKey::Formatted(s.to_string())
    }
}

impl From<String> for DayKey {
    fn from(s: String) -> Self {
        DayKey::Formatted(s)
    }
}

impl From<DateTime<Utc>> for DayKey {
    fn from(dt: DateTime<Utc>) -> Self {
        DayKey::Instant(dt)
    }
}

/// Write an arbitrary named snapshot: `<name>__<snapshot_token(at)>.json`.
/// The payload is written as-is, with no wrapper.
pub fn write_snapshot<T: Serialize>(
    layout: &StoreLayout,
    name: &str,
    at: DateTime<Utc>,
    payload: &T,
) -> IoResult<()> {
    let path = layout.named_snapshot_path(name, at);
    write_canonical_file(&path, payload)
}

#[derive(Serialize, Deserialize)]
struct DigestWrapper {
    day: String,
    digest: Value,
    schema_version: String,
}

#[derive(Serialize, Deserialize)]
struct CalibrationWrapper {
    day: String,
    report: Value,
    schema_version: String,
}

pub fn write_daily_digest_snapshot(
    layout: &StoreLayout,
    day: impl Into<DayKey>,
    digest: Value,
) -> IoResult<()> {
    let day = day.into().resolve();
    let wrapper = DigestWrapper {
        day: day.clone(),
        digest,
        schema_version: "0.1".to_string(),
    };
    write_canonical_file(&layout.digest_snapshot_path(&day), &wrapper)
}

pub fn read_daily_digest_snapshot(layout: &StoreLayout, day: &str) -> IoResult<Option<Value>> {
    let path = layout.digest_snapshot_path(day);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let wrapper: DigestWrapper = serde_json::from_str(&contents)?;
            Ok(Some(wrapper.digest))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn write_calibration_snapshot(
    layout: &StoreLayout,
    day: impl Into<DayKey>,
    report: Value,
) -> IoResult<()> {
    let day = day.into().resolve();
    let wrapper = CalibrationWrapper {
        day: day.clone(),
        report,
        schema_version: "0.1".to_string(),
    };
    write_canonical_file(&layout.calibration_snapshot_path(&day), &wrapper)
}

pub fn read_calibration_snapshot(layout: &StoreLayout, day: &str) -> IoResult<Option<Value>> {
    let path = layout.calibration_snapshot_path(day);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let wrapper: CalibrationWrapper = serde_json::from_str(&contents)?;
            Ok(Some(wrapper.report))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn digest_round_trips_and_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        assert!(read_daily_digest_snapshot(&layout, "2026-01-01")
            .unwrap()
            .is_none());

        write_daily_digest_snapshot(&layout, "2026-01-01", json!({"count": 3})).unwrap();
        let back = read_daily_digest_snapshot(&layout, "2026-01-01").unwrap().unwrap();
        assert_eq!(back, json!({"count": 3}));
    }

    #[test]
    fn repeated_write_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        write_calibration_snapshot(&layout, "2026-01-01", json!({"x": 1})).unwrap();
        let p = layout.calibration_snapshot_path("2026-01-01");
        let first = std::fs::read(&p).unwrap();
        write_calibration_snapshot(&layout, "2026-01-01", json!({"x": 1})).unwrap();
        let second = std::fs::read(&p).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn named_snapshot_uses_name_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        write_snapshot(&layout, "digest", at, &json!({"a": 1})).unwrap();
        let expected = layout.named_snapshot_path("digest", at);
        assert!(expected.exists());
    }
}
