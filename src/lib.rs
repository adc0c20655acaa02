pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use tracing::info;

use crate::commands::AppState;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::auth::SessionValidator;
use crate::services::reminder_service::ReminderNotifier;
use crate::utils::calendar::{parse_timezone, DEFAULT_TIMEZONE};

const ENV_DATA_DIR: &str = "GROWTRACK_DATA_DIR";
const ENV_DB_FILE: &str = "GROWTRACK_DB_FILE";
const ENV_TIMEZONE: &str = "GROWTRACK_TIMEZONE";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DB_FILE: &str = "growtrack.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    /// IANA zone that decides where one calendar day ends for every user's
    /// streak. Fixed for the lifetime of the process.
    pub reference_timezone: String,
    /// `EnvFilter` directives; `None` defers to `RUST_LOG` and then the default.
    pub log_directives: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_file: DEFAULT_DB_FILE.to_string(),
            reference_timezone: DEFAULT_TIMEZONE.to_string(),
            log_directives: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var_os(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            database_file: std::env::var(ENV_DB_FILE)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.database_file),
            reference_timezone: std::env::var(ENV_TIMEZONE)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.reference_timezone),
            log_directives: None,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn timezone(&self) -> AppResult<Tz> {
        parse_timezone(&self.reference_timezone)
    }
}

/// Wires logging, storage and services. The caller owns transport and hands
/// in the identity and mail collaborators.
pub fn bootstrap(
    config: &AppConfig,
    sessions: Arc<dyn SessionValidator>,
    notifier: Arc<dyn ReminderNotifier>,
) -> AppResult<AppState> {
    let reference_timezone = config.timezone()?;
    std::fs::create_dir_all(&config.data_dir)?;
    crate::utils::logger::init_logging(&config.log_dir(), config.log_directives.as_deref())?;

    let pool = DbPool::new(config.database_path())?;
    let state = AppState::new(pool, reference_timezone, sessions, notifier)?;
    info!(
        db_path = %config.database_path().display(),
        timezone = %reference_timezone,
        "growtrack ready"
    );
    Ok(state)
}
