//! Plan model — the declarative description of a reminder need, as
//! produced by the extraction pipeline and validated by the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What area of life a plan belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Medication,
    Appointment,
    Treatment,
    Measurement,
    Lifestyle,
    Cooking,
    Fitness,
    Habit,
    Work,
    Event,
    Other,
}

/// Visual grouping used by the UI layer. Carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Health,
    Cooking,
    Fitness,
    Habit,
    Appointment,
    Class,
    Work,
    Event,
    Other,
}

/// Fixed plans carry absolute events; flexible plans carry a repeating
/// pattern that is expanded from an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Fixed,
    Flexible,
}

/// Timing rule attached to a flexible pattern item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    WithMeal,
    BeforeMeal,
    AfterMeal,
    EmptyStomach,
    BeforeSleep,
    UponWaking,
    AvoidSleep,
    SpecificTime,
}

/// How strictly a constraint is enforced. Declaration order matters:
/// the derived `Ord` makes `Required > Preferred > Optional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintPriority {
    Optional,
    Preferred,
    Required,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    /// Extra detail, e.g. `"breakfast"` or `"22:00"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub priority: ConstraintPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// Repeat rule on a fixed event. The core never expands repeats — fixed
/// events are scheduled single-shot and the rule is carried for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatRule {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<RepeatFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

/// An event pinned to an absolute instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedEvent {
    #[serde(rename = "start_datetime_iso")]
    pub start_datetime: DateTime<Utc>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_before_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatRule>,
}

fn default_timezone() -> String {
    "local".to_string()
}

/// One repeating item of a flexible pattern (one medication, one habit).
///
/// Exactly one cardinality specifier is expected; when several are set the
/// dispatch in [`FlexiblePatternItem::cadence`] picks the first present in
/// the fixed order interval_hours, times_per_day, times_of_day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexiblePatternItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_per_day: Option<u32>,
    /// Specific "HH:mm" times, e.g. `["08:00", "14:00", "20:00"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_of_day: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    /// "For 10 doses" — caps the total alarm count when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_doses: Option<u32>,

    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// "1 tablet", "5ml", etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
}

/// Cardinality of a flexible item, resolved to a single variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Cadence<'a> {
    /// Every N hours, chained from the anchor. Fractional hours allowed.
    Interval { hours: f64 },
    /// N evenly spaced doses per day.
    TimesPerDay(u32),
    /// Doses at specific "HH:mm" times each day.
    TimesOfDay(&'a [String]),
    /// Fallback: once per day.
    Daily,
}

impl FlexiblePatternItem {
    /// Resolve the duck-typed cardinality fields into a tagged variant.
    /// First present wins: interval_hours, then times_per_day, then a
    /// non-empty times_of_day; otherwise once per day.
    pub fn cadence(&self) -> Cadence<'_> {
        if let Some(hours) = self.interval_hours {
            return Cadence::Interval { hours };
        }
        if let Some(n) = self.times_per_day {
            return Cadence::TimesPerDay(n);
        }
        if let Some(times) = self.times_of_day.as_deref() {
            if !times.is_empty() {
                return Cadence::TimesOfDay(times);
            }
        }
        Cadence::Daily
    }
}

/// Hints the extractor attaches for anchor recommendation. Data only —
/// carried through serialization for the UI and future scoring work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_morning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_evening: Option<bool>,
    #[serde(default = "default_true")]
    pub avoid_sleep_interruption: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_dose_urgent: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexiblePattern {
    pub items: Vec<FlexiblePatternItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<PatternHints>,
}

/// A plan extracted from a document. Invariant: exactly one of
/// `fixed_events` / `flexible_pattern` is present, matching `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub mode: PlanMode,
    pub domain: Domain,
    pub category: PlanCategory,

    /// Extraction confidence, 0–1.
    pub confidence: f64,
    /// Quote from the document that led to this plan.
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_for_user: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_events: Option<Vec<FixedEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flexible_pattern: Option<FlexiblePattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with(
        interval_hours: Option<f64>,
        times_per_day: Option<u32>,
        times_of_day: Option<Vec<String>>,
    ) -> FlexiblePatternItem {
        FlexiblePatternItem {
            interval_hours,
            times_per_day,
            times_of_day,
            duration_days: Some(1),
            duration_doses: None,
            title: "Test".into(),
            description: None,
            constraints: vec![],
            dosage: None,
        }
    }

    #[test]
    fn priority_order_required_highest() {
        assert!(ConstraintPriority::Required > ConstraintPriority::Preferred);
        assert!(ConstraintPriority::Preferred > ConstraintPriority::Optional);
    }

    #[test]
    fn cadence_interval_wins_over_everything() {
        let item = item_with(Some(8.0), Some(3), Some(vec!["08:00".into()]));
        assert_eq!(item.cadence(), Cadence::Interval { hours: 8.0 });
    }

    #[test]
    fn cadence_times_per_day_wins_over_times_of_day() {
        let item = item_with(None, Some(3), Some(vec!["08:00".into()]));
        assert_eq!(item.cadence(), Cadence::TimesPerDay(3));
    }

    #[test]
    fn cadence_empty_times_of_day_falls_back_to_daily() {
        let item = item_with(None, None, Some(vec![]));
        assert_eq!(item.cadence(), Cadence::Daily);
    }

    #[test]
    fn constraint_json_uses_snake_case_tags() {
        let constraint = Constraint {
            constraint_type: ConstraintType::EmptyStomach,
            value: None,
            priority: ConstraintPriority::Required,
        };
        let json = serde_json::to_string(&constraint).unwrap();
        assert!(json.contains("\"empty_stomach\""), "got {json}");
        assert!(json.contains("\"required\""), "got {json}");
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = Plan {
            id: "plan-1".into(),
            mode: PlanMode::Flexible,
            domain: Domain::Medication,
            category: PlanCategory::Health,
            confidence: 0.9,
            evidence: "amoxicilina 500mg cada 8 horas".into(),
            questions_for_user: None,
            fixed_events: None,
            flexible_pattern: Some(FlexiblePattern {
                items: vec![item_with(Some(8.0), None, None)],
                hints: None,
            }),
            notes: None,
            warnings: None,
        };
        let json = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
