//! Time & key normalization.
//!
//! Every timestamp crossing a write/read/filter/checkpoint boundary passes
//! through [`to_utc`] (or is already a `DateTime<Utc>`, which is the
//! identity case). Naive instants are assumed to already be UTC — this is
//! the store's only time policy.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Anything the store accepts as a timestamp input, normalized to UTC.
///
/// Covers the three shapes a producer can reasonably hand us: already-UTC,
/// zoned, or naive (assumed UTC).
pub trait IntoInstant {
    fn into_instant(self) -> DateTime<Utc>;
}

impl IntoInstant for DateTime<Utc> {
    fn into_instant(self) -> DateTime<Utc> {
        self
    }
}

impl IntoInstant for DateTime<FixedOffset> {
    fn into_instant(self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

impl IntoInstant for NaiveDateTime {
    fn into_instant(self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self)
    }
}

/// Canonicalize any supported instant to UTC.
pub fn to_utc<T: IntoInstant>(instant: T) -> DateTime<Utc> {
    instant.into_instant()
}

/// `YYYY-MM-DD` of the UTC-normalized instant — the partition file's date.
pub fn partition_day(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Compact snapshot token: `%Y-%m-%dT%H%M%SZ` (no colons, trailing `Z`).
pub fn snapshot_token(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H%M%SZ").to_string()
}

/// Parse a timestamp from text. Strings ending in `Z` are rewritten to
/// `+00:00` before an RFC 3339 parse; a bare `YYYY-MM-DDTHH:MM:SS` (no
/// offset) is treated as UTC. Returns `None` on any failure — never raises.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let rewritten;
    let candidate = if let Some(stripped) = raw.strip_suffix('Z') {
        rewritten = format!("{stripped}+00:00");
        rewritten.as_str()
    } else {
        raw
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}

/// Parse a timestamp out of an opaque JSON payload value (e.g. an
/// `expires_at` field). Only string-shaped values are understood; anything
/// else (or an unparsable string) yields `None`.
#[cfg(feature = "serde")]
pub fn parse_timestamp_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_timestamp)
}

/// Serde helper: (de)serializes a `DateTime<Utc>` as ISO-8601 with a
/// trailing `Z` instead of `+00:00` — the wire format checkpoint files use.
#[cfg(feature = "serde")]
pub mod z_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("bad timestamp: {raw}")))
    }
}

/// The deterministic tie-break key used wherever ranked/ordered output is
/// specified: `(canonical_utc_timestamp, record_id)`, compared lexicographically
/// on the second field once the first is equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TieBreakKey(pub DateTime<Utc>, pub String);

/// Types that expose a stable `(timestamp, id)` ordering key.
pub trait StableOrd {
    fn stable_key(&self) -> TieBreakKey;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_suffix_is_rewritten_before_parse() {
        let dt = parse_timestamp("2026-02-05T10:00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-05T10:00:00+00:00");
    }

    #[test]
    fn naive_string_is_assumed_utc() {
        let dt = parse_timestamp("2026-02-05T10:00:00").unwrap();
        assert_eq!(partition_day(dt), "2026-02-05");
    }

    #[test]
    fn garbage_returns_none() {
        assert!(parse_timestamp("not-a-timestamp").is_none());
    }

    #[test]
    fn snapshot_token_has_no_colons() {
        let dt = parse_timestamp("2026-02-05T12:00:00Z").unwrap();
        assert_eq!(snapshot_token(dt), "2026-02-05T120000Z");
    }
}
