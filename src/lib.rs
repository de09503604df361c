//! Photolarm core engine.
//!
//! Two subsystems:
//! - `schedule` — converts a declarative [`models::Plan`] plus a start
//!   [`models::Anchor`] and [`models::UserPreferences`] into a concrete,
//!   time-ordered list of alarms, and recommends anchors that minimize
//!   sleep interruption.
//! - `learning` — normalizes and signature-encodes medication phrases,
//!   matches them against previously validated patterns, and tightens
//!   matching strictness as evidence accumulates.
//!
//! Everything here is synchronous, pure computation over caller-supplied
//! state. Persistence is an injected seam ([`learning::persistence`]);
//! the core never performs I/O itself.

pub mod error;
pub mod learning;
pub mod models;
pub mod schedule;
