//! A small common trait so `es_io`'s writer/dedup/scanner/checkpoint code can
//! be written once and instantiated for both envelope classes, instead of
//! duplicating four modules per class.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::time::StableOrd;

pub trait Envelope: StableOrd + Clone {
    /// The envelope's stable identifier (`signal_id` / `emission_id`).
    fn id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn validate(&self) -> Result<(), CoreError>;
}

impl Envelope for crate::model::SignalEnvelope {
    fn id(&self) -> &str {
        &self.signal_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    fn validate(&self) -> Result<(), CoreError> {
        crate::model::SignalEnvelope::validate(self)
    }
}

impl Envelope for crate::model::EmissionEnvelope {
    fn id(&self) -> &str {
        &self.emission_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    fn validate(&self) -> Result<(), CoreError> {
        crate::model::EmissionEnvelope::validate(self)
    }
}
