//! Data model shared by the schedule and learning engines.
//!
//! All types are JSON-serializable: plans arrive from the extraction
//! pipeline as JSON, schedules leave toward the notification layer as
//! JSON, and learned patterns round-trip through the persistence seam.

pub mod patterns;
pub mod plan;
pub mod preferences;
pub mod schedule;

pub use patterns::{
    ExtractedMedicationValues, LearnedMedicationPattern, LearningMetadata, LearningStats,
    PatternMatch,
};
pub use plan::{
    Cadence, Constraint, ConstraintPriority, ConstraintType, Domain, FixedEvent, FlexiblePattern,
    FlexiblePatternItem, PatternHints, Plan, PlanCategory, PlanMode, RepeatFrequency, RepeatRule,
};
pub use preferences::{MealTimes, SleepWindow, UserPreferences};
pub use schedule::{Alarm, AlarmMetadata, Anchor, AnchorType, Schedule};
