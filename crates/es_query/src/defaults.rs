//! Default payload-type / emission-type closed sets for the outcome
//! queries. Callers override by passing an explicit slice; these are only
//! the fallback.

pub const PENDING_PAYLOAD_TYPES: &[&str] =
    &["OutcomePending", "EvaluationRequested", "RecommendationAttempted"];

pub const SUCCESS_EMISSION_TYPES: &[&str] = &["OutcomeSuccess", "DraftApproved"];

pub const FAILURE_EMISSION_TYPES: &[&str] = &["OutcomeFailure", "DraftRejected"];

pub const ENTITY_RESOLVED_PAYLOAD_TYPES: &[&str] =
    &["EntityResolved", "EntityMerged", "EntityAliasAdded"];

pub const DEFAULT_SCORE_FIELD: &str = "score";
