//! Query Facade: pre-canned, deterministic read patterns
//! composed over the range scanner and checkpoint engine. Every function
//! here is a pure read — none of them mutate the store.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use es_core::model::{EmissionEnvelope, EntityRef, ReplayCheckpoint, SignalEnvelope};
use es_core::time::{parse_timestamp_value, StableOrd};
use es_io::error::IoError;
use es_io::store::EventStore;
use tracing::trace;

use crate::defaults::{
    DEFAULT_SCORE_FIELD, ENTITY_RESOLVED_PAYLOAD_TYPES, FAILURE_EMISSION_TYPES,
    PENDING_PAYLOAD_TYPES, SUCCESS_EMISSION_TYPES,
};
use crate::error::{QueryError, QueryResult};
use crate::filter::{collect_emissions, collect_signals, EmissionFilter, SignalFilter};

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()
}

/// Sort in place by `(timestamp desc, id desc)` — the facade's recency
/// order. Ascending by the stable key, then reversed: for equal timestamps
/// this also reverses id order, giving the required descending tie-break.
fn sort_recent_desc<T: StableOrd>(items: &mut [T]) {
    items.sort_by(|a, b| a.stable_key().cmp(&b.stable_key()));
    items.reverse();
}

fn truncate_or_empty<T>(mut items: Vec<T>, limit: i64) -> Vec<T> {
    if limit <= 0 {
        return Vec::new();
    }
    items.truncate(limit as usize);
    items
}

/// Recent signals referencing `entity_ref`, newest first.
pub fn recent_signals_by_entity(
    store: &EventStore,
    entity_ref: &EntityRef,
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    limit: i64,
) -> QueryResult<Vec<SignalEnvelope>> {
    let filter = SignalFilter {
        entity_ref: Some(entity_ref),
        ..Default::default()
    };
    let mut found = collect_signals(store, start.unwrap_or_else(epoch), end, &filter)?;
    sort_recent_desc(&mut found);
    Ok(truncate_or_empty(found, limit))
}

/// Recent signals from `source`, newest first.
pub fn recent_signals_by_source(
    store: &EventStore,
    source: &str,
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    limit: i64,
) -> QueryResult<Vec<SignalEnvelope>> {
    let sources = vec![source.to_string()];
    let filter = SignalFilter {
        sources: Some(&sources),
        ..Default::default()
    };
    let mut found = collect_signals(store, start.unwrap_or_else(epoch), end, &filter)?;
    sort_recent_desc(&mut found);
    Ok(truncate_or_empty(found, limit))
}

/// `get_last_posts_by_entity` — recency-by-entity under the "post" framing
/// the original ingestion pipeline uses; semantically identical to
/// [`recent_signals_by_entity`].
pub fn last_posts_by_entity(
    store: &EventStore,
    entity_ref: &EntityRef,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: i64,
) -> QueryResult<Vec<SignalEnvelope>> {
    recent_signals_by_entity(store, entity_ref, Some(start), end, limit)
}

fn is_resolved(signal: &SignalEnvelope) -> bool {
    !signal.entity_refs.is_empty()
        || ENTITY_RESOLVED_PAYLOAD_TYPES.contains(&signal.payload_type.as_str())
}

/// Classifies signals in `[start, end]` as entity-resolved or not.
/// `resolved = None` admits both.
pub fn entity_candidate_signals(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolved: Option<bool>,
) -> QueryResult<Vec<SignalEnvelope>> {
    let all = collect_signals(store, start, end, &SignalFilter::default())?;
    Ok(all
        .into_iter()
        .filter(|s| resolved.map(|want| is_resolved(s) == want).unwrap_or(true))
        .collect())
}

/// Replays signals in `[start, end]` (resuming from `checkpoint` when given),
/// applying `predicate` inside the scan itself so a non-matching duplicate
/// line never consumes another record's dedup slot.
fn replay_base<F>(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    checkpoint: Option<&ReplayCheckpoint>,
    predicate: F,
) -> QueryResult<Vec<SignalEnvelope>>
where
    F: FnMut(&SignalEnvelope) -> bool + 'static,
{
    match checkpoint {
        Some(cp) => store
            .iter_signals_from_checkpoint_filtered(cp, start, end, predicate)?
            .collect::<Result<Vec<_>, IoError>>()
            .map_err(QueryError::from),
        None => {
            let mut out = Vec::new();
            for rec in store.scan_signals(start, end)?.with_filter(predicate) {
                out.push(rec?);
            }
            Ok(out)
        }
    }
}

/// Replays signals whose `source` equals `stage` or starts with
/// `stage + "."`, unless an explicit `sources` allow-list overrides that
/// rule; `payload_types`, if given, is applied alongside the source filter.
/// Supports checkpoint-based resume like any other replay.
pub fn stage_window_signals(
    store: &EventStore,
    stage: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    checkpoint: Option<&ReplayCheckpoint>,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
) -> QueryResult<Vec<SignalEnvelope>> {
    let stage_owned = stage.to_string();
    let prefix = format!("{stage}.");
    let sources_owned = sources.map(|v| v.to_vec());
    let payload_types_owned = payload_types.map(|v| v.to_vec());

    let predicate = move |s: &SignalEnvelope| {
        let source_ok = match &sources_owned {
            Some(set) => set.iter().any(|src| src == &s.source),
            None => s.source == stage_owned || s.source.starts_with(&prefix),
        };
        if !source_ok {
            return false;
        }
        payload_types_owned
            .as_ref()
            .map(|types| types.iter().any(|t| t == &s.payload_type))
            .unwrap_or(true)
    };

    replay_base(store, start, end, checkpoint, predicate)
}

fn checkpoint_replay_with_filters(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    checkpoint: Option<&ReplayCheckpoint>,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
) -> QueryResult<Vec<SignalEnvelope>> {
    let sources_owned = sources.map(|v| v.to_vec());
    let payload_types_owned = payload_types.map(|v| v.to_vec());

    let predicate = move |s: &SignalEnvelope| {
        let source_ok = sources_owned
            .as_ref()
            .map(|set| set.iter().any(|src| src == &s.source))
            .unwrap_or(true);
        if !source_ok {
            return false;
        }
        payload_types_owned
            .as_ref()
            .map(|types| types.iter().any(|t| t == &s.payload_type))
            .unwrap_or(true)
    };

    replay_base(store, start, end, checkpoint, predicate)
}

/// Thin checkpoint-replay alias for recommendation-candidate consumers.
pub fn recommendation_signals(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    checkpoint: Option<&ReplayCheckpoint>,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
) -> QueryResult<Vec<SignalEnvelope>> {
    checkpoint_replay_with_filters(store, start, end, checkpoint, sources, payload_types)
}

/// Thin checkpoint-replay alias for learning-loop consumers.
pub fn learning_signals(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    checkpoint: Option<&ReplayCheckpoint>,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
) -> QueryResult<Vec<SignalEnvelope>> {
    checkpoint_replay_with_filters(store, start, end, checkpoint, sources, payload_types)
}

fn numeric_field(signal: &SignalEnvelope, field: &str) -> Option<f64> {
    let value = signal.payload.get(field)?;
    let n = value.as_f64()?;
    if n.is_nan() {
        // NaN scores are dropped rather than sorted first or last.
        return None;
    }
    Some(n)
}

fn entity_dedup_key(signal: &SignalEnvelope) -> String {
    signal
        .entity_refs
        .first()
        .map(|er| er.dedup_key())
        .unwrap_or_else(|| format!("signal:{}", signal.signal_id))
}

fn rank_by_score_desc(mut candidates: Vec<(f64, SignalEnvelope)>) -> Vec<SignalEnvelope> {
    candidates.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.stable_key().cmp(&a.stable_key()))
    });
    candidates.into_iter().map(|(_, s)| s).collect()
}

/// Ranked candidate signals: numeric `payload[score_field]` required (else
/// skipped), sorted `(score desc, timestamp desc, id desc)`. When
/// `unique_by_entity`, keeps only the top-ranked signal per entity dedup
/// key (first `entity_ref`, or `"signal:<id>"` when there is none).
#[allow(clippy::too_many_arguments)]
pub fn top_recommendation_candidates(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: usize,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
    score_field: Option<&str>,
    unique_by_entity: bool,
) -> QueryResult<Vec<SignalEnvelope>> {
    let field = score_field.unwrap_or(DEFAULT_SCORE_FIELD);
    let filter = SignalFilter {
        sources,
        payload_types,
        ..Default::default()
    };
    let scanned = collect_signals(store, start, end, &filter)?;

    let scored: Vec<(f64, SignalEnvelope)> = scanned
        .into_iter()
        .filter_map(|s| numeric_field(&s, field).map(|score| (score, s)))
        .collect();
    trace!(candidates = scored.len(), "scored recommendation candidates");
    let ranked = rank_by_score_desc(scored);

    let deduped = if unique_by_entity {
        let mut seen = HashSet::new();
        ranked
            .into_iter()
            .filter(|s| seen.insert(entity_dedup_key(s)))
            .collect()
    } else {
        ranked
    };

    Ok(deduped.into_iter().take(limit).collect())
}

/// `get_ready_candidates` — ranked candidates restricted to
/// `payload["status"] == "READY"`. No checkpoint, no implicit limit.
pub fn ready_candidates(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
    entity_ref: Option<&EntityRef>,
    score_field: Option<&str>,
) -> QueryResult<Vec<SignalEnvelope>> {
    let field = score_field.unwrap_or(DEFAULT_SCORE_FIELD);
    let filter = SignalFilter {
        entity_ref,
        sources,
        payload_types,
    };
    let scanned = collect_signals(store, start, end, &filter)?;

    let ready: Vec<(f64, SignalEnvelope)> = scanned
        .into_iter()
        .filter(|s| s.payload.get("status").and_then(|v| v.as_str()) == Some("READY"))
        .filter_map(|s| numeric_field(&s, field).map(|score| (score, s)))
        .collect();

    Ok(rank_by_score_desc(ready))
}

/// Recent draft signals — a recency query with entity/source/payload-type
/// filters applied before the descending sort.
pub fn latest_draft_signals(
    store: &EventStore,
    limit: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    entity_ref: Option<&EntityRef>,
    sources: Option<&[String]>,
    payload_types: Option<&[String]>,
) -> QueryResult<Vec<SignalEnvelope>> {
    let filter = SignalFilter {
        entity_ref,
        sources,
        payload_types,
    };
    let mut found = collect_signals(store, start, end, &filter)?;
    sort_recent_desc(&mut found);
    Ok(truncate_or_empty(found, limit))
}

/// Recent approval/rejection emissions — the emission-side counterpart of
/// [`latest_draft_signals`].
pub fn latest_approval_outcomes(
    store: &EventStore,
    limit: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    entity_ref: Option<&EntityRef>,
    emission_types: Option<&[String]>,
) -> QueryResult<Vec<EmissionEnvelope>> {
    let filter = EmissionFilter {
        entity_ref,
        emission_types,
    };
    let mut found = collect_emissions(store, start, end, &filter)?;
    sort_recent_desc(&mut found);
    Ok(truncate_or_empty(found, limit))
}

/// `get_outcomes_for_window` — plain scan and filter over emissions, no
/// ranking or checkpoint, in scan (chronological) order.
pub fn outcomes_for_window(
    store: &EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    entity_ref: Option<&EntityRef>,
    emission_types: Option<&[String]>,
) -> QueryResult<Vec<EmissionEnvelope>> {
    let filter = EmissionFilter {
        entity_ref,
        emission_types,
    };
    collect_emissions(store, start, end, &filter)
}

pub struct OutcomeBuckets {
    pub pending: Vec<SignalEnvelope>,
    pub expired: Vec<SignalEnvelope>,
    pub success: Vec<EmissionEnvelope>,
    pub failure: Vec<EmissionEnvelope>,
}

/// `get_outcome_window_buckets`: classifies pending signals against the
/// success/failure emissions that resolved them, splitting the remainder
/// into still-pending vs. expired by `payload[expires_at_field]` relative
/// to `now`.
#[allow(clippy::too_many_arguments)]
pub fn outcome_window_buckets(
    store: &EventStore,
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sources: Option<&[String]>,
    pending_payload_types: Option<&[String]>,
    success_emission_types: Option<&[String]>,
    failure_emission_types: Option<&[String]>,
    expires_at_field: Option<&str>,
) -> QueryResult<OutcomeBuckets> {
    let pending_types: Vec<String> = pending_payload_types
        .map(|v| v.to_vec())
        .unwrap_or_else(|| PENDING_PAYLOAD_TYPES.iter().map(|s| s.to_string()).collect());
    let success_types: Vec<String> = success_emission_types
        .map(|v| v.to_vec())
        .unwrap_or_else(|| SUCCESS_EMISSION_TYPES.iter().map(|s| s.to_string()).collect());
    let failure_types: Vec<String> = failure_emission_types
        .map(|v| v.to_vec())
        .unwrap_or_else(|| FAILURE_EMISSION_TYPES.iter().map(|s| s.to_string()).collect());
    let expires_field = expires_at_field.unwrap_or("expires_at");

    let mut resolving_types = success_types.clone();
    resolving_types.extend(failure_types.iter().cloned());
    let resolving_filter = EmissionFilter {
        entity_ref: None,
        emission_types: Some(&resolving_types),
    };
    let mut resolving = collect_emissions(store, start, end, &resolving_filter)?;
    sort_recent_desc(&mut resolving);
    resolving.reverse(); // ascending (timestamp, id)

    let resolved_ids: HashSet<String> = resolving.iter().map(|e| e.caused_by.clone()).collect();

    let success: Vec<EmissionEnvelope> = resolving
        .iter()
        .filter(|e| success_types.contains(&e.emission_type))
        .cloned()
        .collect();
    let failure: Vec<EmissionEnvelope> = resolving
        .iter()
        .filter(|e| failure_types.contains(&e.emission_type))
        .cloned()
        .collect();

    let pending_filter = SignalFilter {
        entity_ref: None,
        sources,
        payload_types: Some(&pending_types),
    };
    let mut unresolved = collect_signals(store, start, end, &pending_filter)?;
    unresolved.retain(|s| !resolved_ids.contains(&s.signal_id));
    sort_recent_desc(&mut unresolved);
    unresolved.reverse(); // ascending (timestamp, id)

    let (expired, pending): (Vec<_>, Vec<_>) = unresolved.into_iter().partition(|s| {
        s.payload
            .get(expires_field)
            .and_then(parse_timestamp_value)
            .map(|at| at < now)
            .unwrap_or(false)
    });

    Ok(OutcomeBuckets {
        pending,
        expired,
        success,
        failure,
    })
}
