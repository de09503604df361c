//! Schedule generation engine.
//!
//! Pipeline: a [`crate::models::Plan`] plus an anchor and preferences flow
//! through [`generator`] to produce a [`crate::models::Schedule`]; each raw
//! trigger instant is nudged by [`constraints`]; [`anchor`] searches over
//! candidate anchors by scoring trial schedules.

pub mod anchor;
pub mod constraints;
pub mod generator;
pub mod timeofday;

pub use anchor::recommend_anchor;
pub use constraints::{apply_constraint, apply_constraints};
pub use generator::{generate_fixed_schedule, generate_flexible_schedule, GenerationContext};
