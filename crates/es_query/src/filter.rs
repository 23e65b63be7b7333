//! Shared scan + filter composition the facade queries build on. None of
//! these touch checkpoints — that's layered on top in `query.rs`.

use chrono::{DateTime, Utc};
use es_core::model::{EmissionEnvelope, EntityRef, SignalEnvelope};
use es_io::store::EventStore;

use crate::error::QueryResult;

#[derive(Default, Clone)]
pub struct SignalFilter<'a> {
    pub entity_ref: Option<&'a EntityRef>,
    pub sources: Option<&'a [String]>,
    pub payload_types: Option<&'a [String]>,
}

impl SignalFilter<'_> {
    /// Builds an owned, `'static` predicate matching `source`, `payload_type`,
    /// and `entity_ref`, suitable for passing into
    /// [`es_io::scan::RangeScanner::with_filter`] so it runs before dedup
    /// instead of after a raw scan is materialized.
    fn to_owned_predicate(&self) -> impl FnMut(&SignalEnvelope) -> bool + 'static {
        let entity_ref = self.entity_ref.cloned();
        let sources = self.sources.map(|v| v.to_vec());
        let payload_types = self.payload_types.map(|v| v.to_vec());
        move |s: &SignalEnvelope| {
            if let Some(sources) = &sources {
                if !sources.iter().any(|src| src == &s.source) {
                    return false;
                }
            }
            if let Some(types) = &payload_types {
                if !types.iter().any(|t| t == &s.payload_type) {
                    return false;
                }
            }
            if let Some(er) = &entity_ref {
                if !s.entity_refs.contains(er) {
                    return false;
                }
            }
            true
        }
    }
}

#[derive(Default, Clone)]
pub struct EmissionFilter<'a> {
    pub entity_ref: Option<&'a EntityRef>,
    pub emission_types: Option<&'a [String]>,
}

impl EmissionFilter<'_> {
    /// Builds an owned, `'static` predicate matching `emission_type` and
    /// `entity_ref`, for the same reason as [`SignalFilter::to_owned_predicate`].
    fn to_owned_predicate(&self) -> impl FnMut(&EmissionEnvelope) -> bool + 'static {
        let entity_ref = self.entity_ref.cloned();
        let emission_types = self.emission_types.map(|v| v.to_vec());
        move |e: &EmissionEnvelope| {
            if let Some(types) = &emission_types {
                if !types.iter().any(|t| t == &e.emission_type) {
                    return false;
                }
            }
            if let Some(er) = &entity_ref {
                if !e.entity_refs.contains(er) {
                    return false;
                }
            }
            true
        }
    }
}

/// Scan `[start, end]` for signals and collect those matching `filter`, in
/// scan (append) order. Propagates the first scan error encountered.
pub fn collect_signals(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter: &SignalFilter<'_>,
) -> QueryResult<Vec<SignalEnvelope>> {
    let mut out = Vec::new();
    let scanner = store.scan_signals(start, end)?.with_filter(filter.to_owned_predicate());
    for record in scanner {
        out.push(record?);
    }
    Ok(out)
}

/// Scan `[start, end]` for emissions and collect those matching `filter`,
/// in scan (append) order.
pub fn collect_emissions(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter: &EmissionFilter<'_>,
) -> QueryResult<Vec<EmissionEnvelope>> {
    let mut out = Vec::new();
    let scanner = store.scan_emissions(start, end)?.with_filter(filter.to_owned_predicate());
    for record in scanner {
        out.push(record?);
    }
    Ok(out)
}
