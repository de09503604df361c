//! Schedule model — concrete alarms derived from a plan, handed to the
//! notification layer as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::Domain;

/// Where the start instant of a flexible schedule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorType {
    /// Start immediately.
    Now,
    /// User picked the start instant.
    UserSelected,
    /// Recommended by the anchor scorer.
    Recommended,
}

/// Reference start instant for expanding a flexible plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(rename = "type")]
    pub anchor_type: AnchorType,
    pub datetime: DateTime<Utc>,
    pub timezone: String,
    /// Human-readable explanation, set for recommended anchors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Generation bookkeeping attached to every alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AlarmMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    /// Index of the source fixed event, for fixed alarms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_index: Option<usize>,
    /// Index of the source pattern item, for flexible alarms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    /// Position of this alarm within its pattern item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_index: Option<usize>,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub is_flexible: bool,
    /// Raw trigger instant before constraint resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_datetime: Option<DateTime<Utc>>,
    /// Whether a constraint moved the trigger away from the raw instant.
    #[serde(default)]
    pub adjusted: bool,
}

/// A single reminder instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub plan_id: String,
    pub datetime: DateTime<Utc>,
    pub timezone: String,
    pub title: String,
    pub body: String,
    pub enabled: bool,
    pub snoozeable: bool,
    pub triggered: bool,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_before_minutes: Option<u32>,
    pub metadata: AlarmMetadata,
}

/// Ordered set of alarms derived from one plan. Alarms belong exclusively
/// to their schedule; the generator constructs it and the caller owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    /// Sorted ascending by datetime.
    pub alarms: Vec<Alarm>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
