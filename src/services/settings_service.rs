use std::sync::RwLock;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::info;

use crate::db::repositories::settings_repository::{AppSettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{AppSettings, SettingsUpdateInput};

const KEY_REMINDERS_ENABLED: &str = "reminders_enabled";
const KEY_REMINDER_WINDOW_DAYS: &str = "reminder_window_days";

const DEFAULT_REMINDER_WINDOW_DAYS: i64 = 1;
const MAX_REMINDER_WINDOW_DAYS: i64 = 7;

/// Runtime reminder settings backed by `app_settings`. The reference zone is
/// fixed when the service is built and cannot be changed through `update`.
pub struct SettingsService {
    db: DbPool,
    reference_timezone: Tz,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self::with_reference_timezone(db, Tz::UTC)
    }

    pub fn with_reference_timezone(db: DbPool, reference_timezone: Tz) -> Self {
        Self {
            db,
            reference_timezone,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    /// Zone used to cut completion timestamps into calendar days.
    pub fn reference_timezone(&self) -> Tz {
        self.reference_timezone
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut current = self.get()?;
        let mut entries: Vec<(&str, String)> = Vec::new();

        if let Some(enabled) = input.reminders_enabled {
            current.reminders_enabled = enabled;
            entries.push((KEY_REMINDERS_ENABLED, enabled.to_string()));
        }

        if let Some(days) = input.reminder_window_days {
            if !(0..=MAX_REMINDER_WINDOW_DAYS).contains(&days) {
                return Err(AppError::validation(format!(
                    "提醒窗口需在 0 到 {MAX_REMINDER_WINDOW_DAYS} 天之间"
                )));
            }
            current.reminder_window_days = days;
            entries.push((KEY_REMINDER_WINDOW_DAYS, days.to_string()));
        }

        if entries.is_empty() {
            return Ok(current);
        }

        let now = Utc::now().to_rfc3339();
        self.db
            .with_connection(|conn| SettingsRepository::upsert_all(conn, &entries, &now))?;
        current.updated_at = now;

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        info!(
            target: "app::settings",
            timezone = %current.reference_timezone,
            reminders = current.reminders_enabled,
            window_days = current.reminder_window_days,
            "settings updated"
        );
        Ok(current)
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        let rows = self.db.with_connection(|conn| SettingsRepository::load_map(conn))?;

        let reminders_enabled = rows
            .get(KEY_REMINDERS_ENABLED)
            .and_then(|row| row.value.parse::<bool>().ok())
            .unwrap_or(true);

        let reminder_window_days = rows
            .get(KEY_REMINDER_WINDOW_DAYS)
            .and_then(|row| row.value.parse::<i64>().ok())
            .filter(|days| (0..=MAX_REMINDER_WINDOW_DAYS).contains(days))
            .unwrap_or(DEFAULT_REMINDER_WINDOW_DAYS);

        let updated_at = rows
            .values()
            .map(|row: &AppSettingRow| row.updated_at.clone())
            .max()
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        Ok(AppSettings {
            reference_timezone: self.reference_timezone.name().to_string(),
            reminders_enabled,
            reminder_window_days,
            updated_at,
        })
    }
}
