//! Data model: envelopes are opaque to the core except for the attributes
//! listed here. The core never mutates a received envelope — they are
//! value types, cloned and compared, never edited in place.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::time::{to_utc, IntoInstant, StableOrd, TieBreakKey};

/// An entity reference. Equality (and membership tests against an
/// envelope's `entity_refs`) is component-wise.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRef {
    pub ref_type: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub platform: Option<String>,
    pub value: String,
}

impl EntityRef {
    pub fn new(ref_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            ref_type: ref_type.into(),
            platform: None,
            value: value.into(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// `"ref_type:platform:value"`, used as the dedup key for unique-by-entity
    /// ranked reads.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.ref_type,
            self.platform.as_deref().unwrap_or(""),
            self.value
        )
    }
}

/// An observed input event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalEnvelope {
    pub signal_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload_type: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payload: serde_json::Map<String, serde_json::Value>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub entity_refs: Vec<EntityRef>,
    pub schema_version: String,
}

impl SignalEnvelope {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        signal_id: impl Into<String>,
        timestamp: impl IntoInstant,
        source: impl Into<String>,
        payload_type: impl Into<String>,
        payload: serde_json::Map<String, serde_json::Value>,
        entity_refs: Vec<EntityRef>,
        schema_version: impl Into<String>,
    ) -> Self {
        Self {
            signal_id: signal_id.into(),
            timestamp: to_utc(timestamp),
            source: source.into(),
            payload_type: payload_type.into(),
            payload,
            entity_refs,
            schema_version: schema_version.into(),
        }
    }

    /// Validates that every appended envelope carries a non-empty id and a
    /// non-empty schema version.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.signal_id.is_empty() {
            return Err(CoreError::EmptyField("signal_id"));
        }
        if self.schema_version.is_empty() {
            return Err(CoreError::EmptyField("schema_version"));
        }
        Ok(())
    }
}

impl StableOrd for SignalEnvelope {
    fn stable_key(&self) -> TieBreakKey {
        TieBreakKey(self.timestamp, self.signal_id.clone())
    }
}

/// A downstream result, caused by a prior signal.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmissionEnvelope {
    pub emission_id: String,
    pub timestamp: DateTime<Utc>,
    pub emission_type: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payload: serde_json::Map<String, serde_json::Value>,
    pub caused_by: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub entity_refs: Vec<EntityRef>,
    pub schema_version: String,
}

impl EmissionEnvelope {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        emission_id: impl Into<String>,
        timestamp: impl IntoInstant,
        emission_type: impl Into<String>,
        payload: serde_json::Map<String, serde_json::Value>,
        caused_by: impl Into<String>,
        entity_refs: Vec<EntityRef>,
        schema_version: impl Into<String>,
    ) -> Self {
        Self {
            emission_id: emission_id.into(),
            timestamp: to_utc(timestamp),
            emission_type: emission_type.into(),
            payload,
            caused_by: caused_by.into(),
            entity_refs,
            schema_version: schema_version.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.emission_id.is_empty() {
            return Err(CoreError::EmptyField("emission_id"));
        }
        if self.schema_version.is_empty() {
            return Err(CoreError::EmptyField("schema_version"));
        }
        Ok(())
    }
}

impl StableOrd for EmissionEnvelope {
    fn stable_key(&self) -> TieBreakKey {
        TieBreakKey(self.timestamp, self.emission_id.clone())
    }
}

fn default_checkpoint_schema_version() -> String {
    "0.1".to_string()
}

/// A resume token: the last timestamp a consumer processed, plus every id
/// observed at exactly that instant (so a later resume can skip them
/// without losing anything at the inclusive boundary).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayCheckpoint {
    #[cfg_attr(feature = "serde", serde(with = "crate::time::z_format"))]
    pub last_timestamp: DateTime<Utc>,
    pub seen_ids_at_timestamp: Vec<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_checkpoint_schema_version")
    )]
    pub schema_version: String,
}

impl ReplayCheckpoint {
    pub fn new(last_timestamp: impl IntoInstant, seen_ids_at_timestamp: Vec<String>) -> Self {
        Self {
            last_timestamp: to_utc(last_timestamp),
            seen_ids_at_timestamp,
            schema_version: default_checkpoint_schema_version(),
        }
    }
}
