//! Anchor recommendation: pick the start instant for a flexible plan that
//! least disturbs sleep and best aligns with meals.
//!
//! Search is exhaustive over a tiny candidate set (start now, start after
//! waking, start with breakfast): each candidate gets a full trial
//! schedule which is then scored. Ties keep the earliest-generated
//! candidate, so "now" wins when nothing beats it.

use chrono::{DateTime, Duration, Utc};

use crate::error::ScheduleError;
use crate::models::{Anchor, AnchorType, Plan, PlanMode, Schedule, UserPreferences};
use crate::schedule::generator::{generate_flexible_schedule, GenerationContext};
use crate::schedule::timeofday::{at_time_of, in_sleep_window, meal_times, parse_hhmm};

/// Scoring weights. The uniform-spacing bonus is deliberately
/// all-or-nothing rather than proportional: predictable over clever.
mod scoring {
    pub const BASE: i32 = 50;
    pub const SLEEP_INTERRUPTION_PENALTY: i32 = 20;
    pub const MEAL_ALIGNMENT_BONUS: i32 = 5;
    pub const UNIFORM_SPACING_BONUS: i32 = 10;
    /// |alarm − meal| within this counts as meal-aligned.
    pub const MEAL_WINDOW_MINUTES: i64 = 30;
    /// Minimum gap between consecutive alarms for the spacing bonus.
    pub const MIN_GAP_HOURS: i64 = 2;
}

/// Recommend the best anchor for a flexible plan.
pub fn recommend_anchor(
    plan: &Plan,
    ctx: &GenerationContext<'_>,
) -> Result<Anchor, ScheduleError> {
    if plan.mode != PlanMode::Flexible || plan.flexible_pattern.is_none() {
        return Err(ScheduleError::NotFlexiblePlan(plan.id.clone()));
    }

    let candidates = candidate_anchors(ctx.preferences, ctx.current_time)?;

    let mut best: Option<(Anchor, i32)> = None;
    for anchor in candidates {
        let trial = generate_flexible_schedule(plan, &anchor, ctx)?;
        let score = score_schedule(&trial, ctx.preferences)?;
        tracing::debug!(
            anchor = %anchor.datetime,
            score,
            "scored anchor candidate"
        );
        // Strictly greater: first-generated candidate wins ties.
        match &best {
            Some((_, best_score)) if score <= *best_score => {}
            _ => best = Some((anchor, score)),
        }
    }

    // Candidate list always contains "now".
    let (anchor, _) = best.expect("candidate list is never empty");
    Ok(anchor)
}

/// Build the candidate list: always "now"; "after waking" when a sleep
/// window is configured; "with breakfast" when breakfast is configured.
/// Time-of-day candidates already behind the clock roll to tomorrow.
fn candidate_anchors(
    prefs: &UserPreferences,
    current_time: DateTime<Utc>,
) -> Result<Vec<Anchor>, ScheduleError> {
    let mut candidates = vec![Anchor {
        anchor_type: AnchorType::Now,
        datetime: current_time,
        timezone: prefs.timezone.clone(),
        reason: None,
    }];

    if let Some(window) = &prefs.sleep_window {
        let wake = next_occurrence(current_time, parse_hhmm(&window.end)?);
        candidates.push(Anchor {
            anchor_type: AnchorType::Recommended,
            datetime: wake,
            timezone: prefs.timezone.clone(),
            reason: Some("Starts right after you wake up".into()),
        });
    }

    if let Some(breakfast) = prefs
        .meal_times
        .as_ref()
        .and_then(|meals| meals.breakfast.as_ref())
    {
        let with_breakfast = next_occurrence(current_time, parse_hhmm(breakfast)?);
        candidates.push(Anchor {
            anchor_type: AnchorType::Recommended,
            datetime: with_breakfast,
            timezone: prefs.timezone.clone(),
            reason: Some("Starts with your breakfast".into()),
        });
    }

    Ok(candidates)
}

fn next_occurrence(current_time: DateTime<Utc>, time: chrono::NaiveTime) -> DateTime<Utc> {
    let today = at_time_of(current_time, time);
    if today < current_time {
        today + Duration::days(1)
    } else {
        today
    }
}

/// Score a trial schedule, 0–100. Base 50; −20 per alarm inside the sleep
/// window; +5 per meal-aligned alarm; +10 when all consecutive gaps are
/// at least two hours.
fn score_schedule(schedule: &Schedule, prefs: &UserPreferences) -> Result<i32, ScheduleError> {
    let mut score = scoring::BASE;
    let meals = meal_times(prefs)?;

    for alarm in &schedule.alarms {
        if let Some(window) = &prefs.sleep_window {
            if in_sleep_window(alarm.datetime, window)? {
                score -= scoring::SLEEP_INTERRUPTION_PENALTY;
            }
        }
        if near_any_meal(alarm.datetime, &meals) {
            score += scoring::MEAL_ALIGNMENT_BONUS;
        }
    }

    if uniformly_spaced(schedule) {
        score += scoring::UNIFORM_SPACING_BONUS;
    }

    Ok(score.clamp(0, 100))
}

fn near_any_meal(time: DateTime<Utc>, meals: &[chrono::NaiveTime]) -> bool {
    meals.iter().any(|meal| {
        let meal_instant = at_time_of(time, *meal);
        (time - meal_instant).num_minutes().abs() <= scoring::MEAL_WINDOW_MINUTES
    })
}

/// All consecutive alarms at least two hours apart. Vacuously true for
/// fewer than two alarms. Alarms are already sorted by the generator.
fn uniformly_spaced(schedule: &Schedule) -> bool {
    schedule
        .alarms
        .windows(2)
        .all(|pair| pair[1].datetime - pair[0].datetime >= Duration::hours(scoring::MIN_GAP_HOURS))
}
