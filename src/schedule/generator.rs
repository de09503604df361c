//! Schedule generation: expanding a plan into concrete alarms.
//!
//! Fixed plans map 1:1, event to alarm, with no constraint resolution —
//! fixed events are already pinned to an instant. Flexible plans expand
//! each pattern item into a run of raw trigger instants and pipe every
//! instant through constraint resolution.
//!
//! Pure construction: identical `(plan, anchor, context)` inputs produce
//! identical schedules. The only clock is `GenerationContext::current_time`.

use chrono::{DateTime, Duration, Utc};

use crate::error::ScheduleError;
use crate::models::{
    Alarm, AlarmMetadata, Anchor, Cadence, FixedEvent, FlexiblePatternItem, Plan, PlanMode,
    Schedule, UserPreferences,
};
use crate::schedule::constraints::apply_constraints;
use crate::schedule::timeofday::{parse_hhmm, start_of_day};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Caller-supplied environment for a generation run.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub preferences: &'a UserPreferences,
    /// Wall clock as seen by the caller; stamps schedule ids and
    /// created/updated times so repeated runs are reproducible.
    pub current_time: DateTime<Utc>,
}

/// Expand a fixed plan: one alarm per event, in input order, untouched.
pub fn generate_fixed_schedule(
    plan: &Plan,
    ctx: &GenerationContext<'_>,
) -> Result<Schedule, ScheduleError> {
    let events = match (plan.mode, plan.fixed_events.as_deref()) {
        (PlanMode::Fixed, Some(events)) if !events.is_empty() => events,
        _ => return Err(ScheduleError::MissingFixedEvents(plan.id.clone())),
    };

    let alarms = events
        .iter()
        .enumerate()
        .map(|(index, event)| fixed_event_to_alarm(event, plan, index))
        .collect();

    Ok(build_schedule(plan, None, alarms, ctx))
}

/// Expand a flexible plan from an anchor. Alarms from all pattern items
/// are merged and sorted ascending by trigger time.
pub fn generate_flexible_schedule(
    plan: &Plan,
    anchor: &Anchor,
    ctx: &GenerationContext<'_>,
) -> Result<Schedule, ScheduleError> {
    let pattern = match (plan.mode, plan.flexible_pattern.as_ref()) {
        (PlanMode::Flexible, Some(pattern)) => pattern,
        _ => return Err(ScheduleError::MissingFlexiblePattern(plan.id.clone())),
    };

    let mut alarms = Vec::new();
    for (item_index, item) in pattern.items.iter().enumerate() {
        alarms.extend(alarms_for_item(item, anchor.datetime, plan, item_index, ctx)?);
    }
    alarms.sort_by_key(|alarm: &Alarm| alarm.datetime);

    Ok(build_schedule(plan, Some(anchor.clone()), alarms, ctx))
}

fn build_schedule(
    plan: &Plan,
    anchor: Option<Anchor>,
    alarms: Vec<Alarm>,
    ctx: &GenerationContext<'_>,
) -> Schedule {
    Schedule {
        id: format!("schedule-{}-{}", plan.id, ctx.current_time.timestamp_millis()),
        plan_id: plan.id.clone(),
        anchor,
        alarms,
        created_at: ctx.current_time,
        updated_at: ctx.current_time,
    }
}

fn fixed_event_to_alarm(event: &FixedEvent, plan: &Plan, index: usize) -> Alarm {
    Alarm {
        id: format!("alarm-{}-{}", plan.id, index),
        plan_id: plan.id.clone(),
        datetime: event.start_datetime,
        timezone: event.timezone.clone(),
        title: event.title.clone(),
        body: event.description.clone().unwrap_or_default(),
        enabled: true,
        snoozeable: true,
        triggered: false,
        completed: false,
        completed_at: None,
        alert_before_minutes: event.alert_before_minutes,
        metadata: AlarmMetadata {
            domain: Some(plan.domain),
            event_index: Some(index),
            is_fixed: true,
            ..AlarmMetadata::default()
        },
    }
}

fn alarms_for_item(
    item: &FlexiblePatternItem,
    anchor_time: DateTime<Utc>,
    plan: &Plan,
    item_index: usize,
    ctx: &GenerationContext<'_>,
) -> Result<Vec<Alarm>, ScheduleError> {
    let total = total_alarms(item);
    let mut alarms = Vec::with_capacity(total as usize);

    // Interval cadence chains forward: each raw trigger is the base for
    // the next, so fractional intervals accumulate without re-deriving
    // from the anchor.
    let mut previous = anchor_time;
    for alarm_index in 0..total {
        let raw = next_trigger(previous, anchor_time, item, alarm_index)?;
        let adjusted = apply_constraints(raw, &item.constraints, ctx.preferences)?;

        alarms.push(Alarm {
            id: format!("alarm-{}-{}-{}", plan.id, item_index, alarm_index),
            plan_id: plan.id.clone(),
            datetime: adjusted,
            timezone: ctx.preferences.timezone.clone(),
            title: item.title.clone(),
            body: item.description.clone().unwrap_or_default(),
            enabled: true,
            snoozeable: true,
            triggered: false,
            completed: false,
            completed_at: None,
            alert_before_minutes: None,
            metadata: AlarmMetadata {
                domain: Some(plan.domain),
                item_index: Some(item_index),
                alarm_index: Some(alarm_index as usize),
                is_flexible: true,
                original_datetime: Some(raw),
                adjusted: adjusted != raw,
                ..AlarmMetadata::default()
            },
        });

        previous = raw;
    }

    Ok(alarms)
}

/// Total alarms an item expands to. `duration_doses`, when set, caps the
/// count computed from `duration_days` (default 1 day).
fn total_alarms(item: &FlexiblePatternItem) -> u32 {
    let duration_days = item.duration_days.unwrap_or(1);

    let computed = match item.cadence() {
        Cadence::Interval { hours } => {
            let per_day = 24.0 / hours;
            (per_day * f64::from(duration_days)).ceil() as u32
        }
        Cadence::TimesPerDay(n) => n * duration_days,
        Cadence::TimesOfDay(times) => times.len() as u32 * duration_days,
        Cadence::Daily => duration_days,
    };

    match item.duration_doses {
        Some(doses) => computed.min(doses),
        None => computed,
    }
}

/// Raw trigger instant for alarm `index` of an item.
fn next_trigger(
    previous: DateTime<Utc>,
    anchor_time: DateTime<Utc>,
    item: &FlexiblePatternItem,
    index: u32,
) -> Result<DateTime<Utc>, ScheduleError> {
    match item.cadence() {
        Cadence::Interval { hours } => {
            // First dose fires at the anchor itself; later doses chain
            // from the previous raw trigger. Whole-millisecond arithmetic
            // keeps fractional hours (0.33 ≈ 20min) from drifting.
            if index == 0 {
                Ok(anchor_time)
            } else {
                Ok(previous + Duration::milliseconds((hours * MILLIS_PER_HOUR).round() as i64))
            }
        }
        Cadence::TimesPerDay(n) => {
            let day = index / n;
            let slot = index % n;
            let slot_millis = (f64::from(slot) * (24.0 / f64::from(n)) * MILLIS_PER_HOUR).round();
            Ok(start_of_day(anchor_time)
                + Duration::days(i64::from(day))
                + Duration::milliseconds(slot_millis as i64))
        }
        Cadence::TimesOfDay(times) => {
            let day = index as usize / times.len();
            let slot = index as usize % times.len();
            let time = parse_hhmm(&times[slot])?;
            let base = start_of_day(anchor_time) + Duration::days(day as i64);
            Ok(base.date_naive().and_time(time).and_utc())
        }
        Cadence::Daily => Ok(anchor_time + Duration::days(i64::from(index) + 1)),
    }
}
