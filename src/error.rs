//! Error types for the schedule and learning engines.
//!
//! One enum per subsystem so callers can match on the failure domain
//! without pulling in unrelated variants.

use thiserror::Error;

/// Failures while generating schedules or recommending anchors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Plan mode says `fixed` but `fixed_events` is missing or empty,
    /// or the plan is not in fixed mode at all.
    #[error("plan {0} is not a fixed plan with fixed_events")]
    MissingFixedEvents(String),

    /// Plan mode says `flexible` but `flexible_pattern` is missing,
    /// or the plan is not in flexible mode at all.
    #[error("plan {0} is not a flexible plan with flexible_pattern")]
    MissingFlexiblePattern(String),

    /// Anchor recommendation only applies to flexible plans.
    #[error("anchor recommendation requires a flexible plan, plan {0} is fixed")]
    NotFlexiblePlan(String),

    /// A time-of-day string did not parse as 24-hour "HH:mm".
    #[error("invalid time of day {0:?}, expected 24-hour HH:mm")]
    InvalidTimeOfDay(String),
}

/// Failures in the pattern learning store.
#[derive(Error, Debug)]
pub enum LearningError {
    /// Import payload did not parse. The store is left untouched.
    #[error("pattern import failed: {0}")]
    Import(#[source] serde_json::Error),

    /// Export serialization failed.
    #[error("pattern export failed: {0}")]
    Export(#[source] serde_json::Error),
}

/// Failures at the persistence seam (the caller-owned key-value store).
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing key-value store reported an error.
    #[error("key-value store error: {0}")]
    Backend(String),

    /// Stored payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
