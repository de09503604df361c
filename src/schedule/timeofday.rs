//! Time-of-day arithmetic: "HH:mm" parsing, sleep-window membership, and
//! meal-time materialization.
//!
//! All comparisons run at minute granularity (preference times carry no
//! seconds); absolute arithmetic runs on UTC instants.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

use crate::error::ScheduleError;
use crate::models::{SleepWindow, UserPreferences};

/// Parse a 24-hour "HH:mm" string. Fails rather than guessing — a wrong
/// meal time would silently shift medication alarms.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| ScheduleError::InvalidTimeOfDay(s.to_string()))
}

/// Midnight at the start of the instant's UTC calendar day.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// The given time-of-day on the same calendar day as `t`.
pub fn at_time_of(t: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    t.date_naive().and_time(time).and_utc()
}

/// Shift a time-of-day by whole minutes, wrapping around midnight.
pub fn shift_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    time.overflowing_add_signed(Duration::minutes(minutes)).0
}

/// Configured meal times in breakfast, lunch, dinner order. Missing meals
/// are simply absent.
pub fn meal_times(prefs: &UserPreferences) -> Result<Vec<NaiveTime>, ScheduleError> {
    let mut times = Vec::new();
    if let Some(meals) = &prefs.meal_times {
        for meal in [&meals.breakfast, &meals.lunch, &meals.dinner]
            .into_iter()
            .flatten()
        {
            times.push(parse_hhmm(meal)?);
        }
    }
    Ok(times)
}

fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Whether an instant falls inside the sleep window, bounds inclusive.
/// A window whose start is later than its end wraps midnight
/// (23:00–07:00 contains 02:00).
pub fn in_sleep_window(t: DateTime<Utc>, window: &SleepWindow) -> Result<bool, ScheduleError> {
    let start = minutes_of_day(parse_hhmm(&window.start)?);
    let end = minutes_of_day(parse_hhmm(&window.end)?);
    let candidate = minutes_of_day(t.time());

    if start > end {
        Ok(candidate >= start || candidate <= end)
    } else {
        Ok(candidate >= start && candidate <= end)
    }
}

/// End of the sleep window covering `t`: the window's end time on the same
/// day, or on the next day when that instant already lies behind `t`.
pub fn sleep_window_end(
    t: DateTime<Utc>,
    window: &SleepWindow,
) -> Result<DateTime<Utc>, ScheduleError> {
    let end = at_time_of(t, parse_hhmm(&window.end)?);
    if end < t {
        Ok(end + Duration::days(1))
    } else {
        Ok(end)
    }
}

/// Start of the sleep window on the same calendar day as `t`.
pub fn sleep_window_start(
    t: DateTime<Utc>,
    window: &SleepWindow,
) -> Result<DateTime<Utc>, ScheduleError> {
    Ok(at_time_of(t, parse_hhmm(&window.start)?))
}
