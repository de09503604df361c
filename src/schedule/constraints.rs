//! Constraint resolution: nudging a raw trigger instant so it respects a
//! plan item's meal- and sleep-relative rules.
//!
//! Priority semantics, pinned by tests below:
//! - `required` constraints move the instant.
//! - `preferred` constraints never move it. Closest-time resolution and
//!   sleep avoidance are computed but intentionally discarded for
//!   preferred priority; changing this needs a product decision, not a
//!   code cleanup.
//! - `optional` constraints are skipped entirely.

use chrono::{DateTime, NaiveTime, Utc};

use crate::error::ScheduleError;
use crate::models::{Constraint, ConstraintPriority, ConstraintType, UserPreferences};
use crate::schedule::timeofday::{
    at_time_of, in_sleep_window, meal_times, shift_minutes, sleep_window_end, sleep_window_start,
};

/// Offset applied to meal times for `before_meal` constraints.
const BEFORE_MEAL_MINUTES: i64 = -30;
/// Offset applied to meal times for `after_meal` constraints.
const AFTER_MEAL_MINUTES: i64 = 30;
/// Offset applied to meal times for `empty_stomach` constraints.
const EMPTY_STOMACH_MINUTES: i64 = 120;

/// Apply a plan item's constraints to a candidate instant, strictest
/// first. Each constraint transforms the output of the previous one.
pub fn apply_constraints(
    time: DateTime<Utc>,
    constraints: &[Constraint],
    prefs: &UserPreferences,
) -> Result<DateTime<Utc>, ScheduleError> {
    let mut sorted: Vec<&Constraint> = constraints.iter().collect();
    // Stable sort: equal priorities keep their declared order.
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut adjusted = time;
    for constraint in sorted {
        if constraint.priority == ConstraintPriority::Optional {
            continue;
        }
        adjusted = apply_constraint(adjusted, constraint, prefs)?;
    }
    Ok(adjusted)
}

/// Apply one constraint to an instant. Optional priority never adjusts,
/// regardless of constraint type.
pub fn apply_constraint(
    time: DateTime<Utc>,
    constraint: &Constraint,
    prefs: &UserPreferences,
) -> Result<DateTime<Utc>, ScheduleError> {
    if constraint.priority == ConstraintPriority::Optional {
        return Ok(time);
    }

    match constraint.constraint_type {
        ConstraintType::WithMeal => {
            move_to_closest(time, &meal_times(prefs)?, constraint.priority)
        }
        ConstraintType::BeforeMeal => {
            let targets = shifted_meal_times(prefs, BEFORE_MEAL_MINUTES)?;
            move_to_closest(time, &targets, constraint.priority)
        }
        ConstraintType::AfterMeal => {
            let targets = shifted_meal_times(prefs, AFTER_MEAL_MINUTES)?;
            move_to_closest(time, &targets, constraint.priority)
        }
        ConstraintType::EmptyStomach => {
            let targets = shifted_meal_times(prefs, EMPTY_STOMACH_MINUTES)?;
            move_to_closest(time, &targets, constraint.priority)
        }
        ConstraintType::AvoidSleep => {
            let Some(window) = &prefs.sleep_window else {
                return Ok(time);
            };
            if in_sleep_window(time, window)? && constraint.priority == ConstraintPriority::Required
            {
                sleep_window_end(time, window)
            } else {
                Ok(time)
            }
        }
        ConstraintType::UponWaking => match &prefs.sleep_window {
            Some(window) => sleep_window_end(time, window),
            None => Ok(time),
        },
        ConstraintType::BeforeSleep => match &prefs.sleep_window {
            Some(window) => sleep_window_start(time, window),
            None => Ok(time),
        },
        // Instant already pinned upstream by times_of_day.
        ConstraintType::SpecificTime => Ok(time),
    }
}

fn shifted_meal_times(
    prefs: &UserPreferences,
    minutes: i64,
) -> Result<Vec<NaiveTime>, ScheduleError> {
    Ok(meal_times(prefs)?
        .into_iter()
        .map(|t| shift_minutes(t, minutes))
        .collect())
}

/// Move an instant to whichever target time-of-day (materialized on the
/// instant's own calendar day) is chronologically closest. `required`
/// returns the closest candidate; `preferred` returns the input unchanged.
fn move_to_closest(
    time: DateTime<Utc>,
    targets: &[NaiveTime],
    priority: ConstraintPriority,
) -> Result<DateTime<Utc>, ScheduleError> {
    if priority == ConstraintPriority::Optional || targets.is_empty() {
        return Ok(time);
    }

    let mut closest = at_time_of(time, targets[0]);
    let mut min_diff = (time - closest).num_milliseconds().abs();
    for target in &targets[1..] {
        let candidate = at_time_of(time, *target);
        let diff = (time - candidate).num_milliseconds().abs();
        // Strict comparison: ties keep the earlier-listed meal.
        if diff < min_diff {
            min_diff = diff;
            closest = candidate;
        }
    }

    if priority == ConstraintPriority::Required {
        Ok(closest)
    } else {
        Ok(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SleepWindow;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn constraint(constraint_type: ConstraintType, priority: ConstraintPriority) -> Constraint {
        Constraint {
            constraint_type,
            value: None,
            priority,
        }
    }

    #[test]
    fn required_avoid_sleep_moves_to_wake_time() {
        // 02:00 falls inside the 23:00–07:00 window: push to 07:00 same day.
        let prefs = UserPreferences::default();
        let adjusted = apply_constraint(
            utc("2025-01-01T02:00:00Z"),
            &constraint(ConstraintType::AvoidSleep, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T07:00:00Z"));
    }

    #[test]
    fn preferred_avoid_sleep_leaves_time_unchanged() {
        // Current semantics: preferred is a soft signal and never moves
        // the instant, even inside the sleep window.
        let prefs = UserPreferences::default();
        let time = utc("2025-01-01T02:00:00Z");
        let adjusted = apply_constraint(
            time,
            &constraint(ConstraintType::AvoidSleep, ConstraintPriority::Preferred),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, time);
    }

    #[test]
    fn avoid_sleep_outside_window_is_untouched() {
        let prefs = UserPreferences::default();
        let time = utc("2025-01-01T12:00:00Z");
        let adjusted = apply_constraint(
            time,
            &constraint(ConstraintType::AvoidSleep, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, time);
    }

    #[test]
    fn required_with_meal_snaps_to_closest_meal() {
        // 11:00 is closest to lunch at 13:00 (vs 08:00 and 20:00).
        let prefs = UserPreferences::default();
        let adjusted = apply_constraint(
            utc("2025-01-01T11:00:00Z"),
            &constraint(ConstraintType::WithMeal, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T13:00:00Z"));
    }

    #[test]
    fn preferred_with_meal_is_informational_only() {
        let prefs = UserPreferences::default();
        let time = utc("2025-01-01T11:00:00Z");
        let adjusted = apply_constraint(
            time,
            &constraint(ConstraintType::WithMeal, ConstraintPriority::Preferred),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, time);
    }

    #[test]
    fn before_meal_shifts_targets_back_half_hour() {
        let prefs = UserPreferences::default();
        let adjusted = apply_constraint(
            utc("2025-01-01T12:00:00Z"),
            &constraint(ConstraintType::BeforeMeal, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T12:30:00Z"));
    }

    #[test]
    fn empty_stomach_lands_two_hours_after_meal() {
        let prefs = UserPreferences::default();
        let adjusted = apply_constraint(
            utc("2025-01-01T09:30:00Z"),
            &constraint(ConstraintType::EmptyStomach, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        // Breakfast 08:00 + 2h = 10:00, closest of {10:00, 15:00, 22:00}.
        assert_eq!(adjusted, utc("2025-01-01T10:00:00Z"));
    }

    #[test]
    fn upon_waking_forces_sleep_window_end() {
        let prefs = UserPreferences::default();
        let adjusted = apply_constraint(
            utc("2025-01-01T12:00:00Z"),
            &constraint(ConstraintType::UponWaking, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        // 07:00 already passed: rolls to tomorrow's wake time.
        assert_eq!(adjusted, utc("2025-01-02T07:00:00Z"));
    }

    #[test]
    fn before_sleep_forces_window_start_same_day() {
        let prefs = UserPreferences::default();
        let adjusted = apply_constraint(
            utc("2025-01-01T12:00:00Z"),
            &constraint(ConstraintType::BeforeSleep, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T23:00:00Z"));
    }

    #[test]
    fn optional_priority_never_adjusts_any_type() {
        let prefs = UserPreferences::default();
        let time = utc("2025-01-01T02:00:00Z");
        for constraint_type in [
            ConstraintType::WithMeal,
            ConstraintType::BeforeMeal,
            ConstraintType::AfterMeal,
            ConstraintType::EmptyStomach,
            ConstraintType::BeforeSleep,
            ConstraintType::UponWaking,
            ConstraintType::AvoidSleep,
            ConstraintType::SpecificTime,
        ] {
            let adjusted = apply_constraint(
                time,
                &constraint(constraint_type, ConstraintPriority::Optional),
                &prefs,
            )
            .unwrap();
            assert_eq!(adjusted, time, "optional {constraint_type:?} adjusted");
        }
    }

    #[test]
    fn constraints_without_preferences_are_noops() {
        let prefs = UserPreferences::empty();
        let time = utc("2025-01-01T02:00:00Z");
        for constraint_type in [
            ConstraintType::WithMeal,
            ConstraintType::AvoidSleep,
            ConstraintType::UponWaking,
            ConstraintType::BeforeSleep,
        ] {
            let adjusted = apply_constraint(
                time,
                &constraint(constraint_type, ConstraintPriority::Required),
                &prefs,
            )
            .unwrap();
            assert_eq!(adjusted, time);
        }
    }

    #[test]
    fn required_applied_before_preferred() {
        // avoid_sleep(required) pushes 02:00 to 07:00; the preferred meal
        // constraint afterwards changes nothing.
        let prefs = UserPreferences::default();
        let adjusted = apply_constraints(
            utc("2025-01-01T02:00:00Z"),
            &[
                constraint(ConstraintType::WithMeal, ConstraintPriority::Preferred),
                constraint(ConstraintType::AvoidSleep, ConstraintPriority::Required),
            ],
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T07:00:00Z"));
    }

    #[test]
    fn chained_required_constraints_compose() {
        // avoid_sleep moves 02:00 → 07:00, then with_meal snaps 07:00 →
        // 08:00 breakfast.
        let prefs = UserPreferences::default();
        let adjusted = apply_constraints(
            utc("2025-01-01T02:00:00Z"),
            &[
                constraint(ConstraintType::AvoidSleep, ConstraintPriority::Required),
                constraint(ConstraintType::WithMeal, ConstraintPriority::Required),
            ],
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T08:00:00Z"));
    }

    #[test]
    fn malformed_meal_time_is_rejected() {
        let prefs = UserPreferences {
            meal_times: Some(crate::models::MealTimes {
                breakfast: Some("breakfast-ish".into()),
                lunch: None,
                dinner: None,
            }),
            ..UserPreferences::empty()
        };
        let result = apply_constraint(
            utc("2025-01-01T09:00:00Z"),
            &constraint(ConstraintType::WithMeal, ConstraintPriority::Required),
            &prefs,
        );
        assert!(matches!(result, Err(ScheduleError::InvalidTimeOfDay(_))));
    }

    #[test]
    fn closest_meal_tie_keeps_earlier_meal() {
        let prefs = UserPreferences {
            meal_times: Some(crate::models::MealTimes {
                breakfast: Some("08:00".into()),
                lunch: Some("12:00".into()),
                dinner: None,
            }),
            ..UserPreferences::empty()
        };
        // 10:00 is exactly 2h from both: breakfast wins.
        let adjusted = apply_constraint(
            utc("2025-01-01T10:00:00Z"),
            &constraint(ConstraintType::WithMeal, ConstraintPriority::Required),
            &prefs,
        )
        .unwrap();
        assert_eq!(adjusted, utc("2025-01-01T08:00:00Z"));
    }
}
