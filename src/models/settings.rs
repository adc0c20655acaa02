use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// IANA zone used to cut completion timestamps into calendar days. Set
    /// at startup and read-only here.
    pub reference_timezone: String,
    pub reminders_enabled: bool,
    pub reminder_window_days: i64,
    pub updated_at: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdateInput {
    pub reminders_enabled: Option<bool>,
    pub reminder_window_days: Option<i64>,
}
