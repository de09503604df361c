//! User preferences consumed by constraint resolution and anchor scoring.

use serde::{Deserialize, Serialize};

/// Sleep window as "HH:mm" local times. May wrap midnight
/// (e.g. 23:00–07:00).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepWindow {
    pub start: String,
    pub end: String,
}

/// Habitual meal times as "HH:mm" local times; each is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MealTimes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dinner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_window: Option<SleepWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_times: Option<MealTimes>,
    pub timezone: String,
}

impl Default for UserPreferences {
    /// Defaults mirror the onboarding presets: sleep 23:00–07:00, meals
    /// at 08:00 / 13:00 / 20:00.
    fn default() -> Self {
        Self {
            sleep_window: Some(SleepWindow {
                start: "23:00".into(),
                end: "07:00".into(),
            }),
            meal_times: Some(MealTimes {
                breakfast: Some("08:00".into()),
                lunch: Some("13:00".into()),
                dinner: Some("20:00".into()),
            }),
            timezone: "local".into(),
        }
    }
}

impl UserPreferences {
    /// Preferences with no sleep window and no meals configured.
    pub fn empty() -> Self {
        Self {
            sleep_window: None,
            meal_times: None,
            timezone: "local".into(),
        }
    }
}
