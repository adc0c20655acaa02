pub mod progression;
pub mod settings;
pub mod task;

use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::error;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::user::AuthenticatedUser;
use crate::services::auth::{authenticate, SessionValidator};
use crate::services::progression_service::ProgressionService;
use crate::services::reminder_service::ReminderNotifier;
use crate::services::settings_service::SettingsService;
use crate::services::task_service::TaskService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    task_service: Arc<TaskService>,
    progression_service: Arc<ProgressionService>,
    settings_service: Arc<SettingsService>,
    sessions: Arc<dyn SessionValidator>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl AppState {
    pub fn new(
        db_pool: DbPool,
        reference_timezone: Tz,
        sessions: Arc<dyn SessionValidator>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> AppResult<Self> {
        let settings_service = Arc::new(SettingsService::with_reference_timezone(
            db_pool.clone(),
            reference_timezone,
        ));
        // Warm the settings cache.
        settings_service.get()?;

        let progression_service = Arc::new(ProgressionService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let task_service = Arc::new(TaskService::new(
            db_pool.clone(),
            Arc::clone(&progression_service),
            Arc::clone(&settings_service),
        ));

        Ok(Self {
            db_pool,
            task_service,
            progression_service,
            settings_service,
            sessions,
            notifier,
        })
    }

    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.task_service)
    }

    pub fn progression(&self) -> Arc<ProgressionService> {
        Arc::clone(&self.progression_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn notifier(&self) -> Arc<dyn ReminderNotifier> {
        Arc::clone(&self.notifier)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn authorize(&self, authorization: Option<&str>) -> CommandResult<AuthenticatedUser> {
        authenticate(self.sessions.as_ref(), authorization).map_err(CommandError::from)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => CommandError::new("NOT_FOUND", "请求的资源不存在", None),
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Unauthorized { message } => {
                CommandError::new("UNAUTHORIZED", message, None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "序列化失败", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "文件系统读写失败", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("任务执行失败: {err}"), None))?
        .map_err(CommandError::from)
}
