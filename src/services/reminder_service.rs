use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::task::TaskRecord;
use crate::utils::calendar::parse_timestamp;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub user_id: String,
    pub recipient: String,
    pub task_id: String,
    pub task_description: String,
    pub goal_date: String,
}

impl ReminderRequest {
    pub fn for_task(recipient: impl Into<String>, task: &TaskRecord) -> Option<Self> {
        let goal_date = task.goal_date.clone()?;
        Some(Self {
            user_id: task.user_id.clone(),
            recipient: recipient.into(),
            task_id: task.id.clone(),
            task_description: task.description.clone(),
            goal_date,
        })
    }
}

/// Outbound channel for goal-date reminders. Mail transport lives outside
/// this crate; implementations only need to deliver the request.
#[async_trait::async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send_reminder(&self, request: &ReminderRequest) -> AppResult<()>;
}

/// Records reminders in the log when no transport is wired.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait::async_trait]
impl ReminderNotifier for LoggingNotifier {
    async fn send_reminder(&self, request: &ReminderRequest) -> AppResult<()> {
        info!(
            target: "app::reminder",
            user_id = %request.user_id,
            task_id = %request.task_id,
            goal_date = %request.goal_date,
            "goal date reminder"
        );
        Ok(())
    }
}

/// Whole days until `goal`, rounded up. A goal later today counts as 1.
pub fn days_until(goal: &DateTime<Utc>, now: &DateTime<Utc>) -> i64 {
    let diff = (*goal - *now).num_milliseconds();
    diff.div_euclid(MILLIS_PER_DAY) + i64::from(diff.rem_euclid(MILLIS_PER_DAY) != 0)
}

/// True when the goal date falls within `window_days` of `now` and is not past.
pub fn reminder_due(goal_date: Option<&str>, now: &DateTime<Utc>, window_days: i64) -> bool {
    let Some(raw) = goal_date else {
        return false;
    };
    match parse_timestamp(raw) {
        Ok(goal) => (0..=window_days).contains(&days_until(&goal, now)),
        Err(_) => false,
    }
}

/// Fire-and-log delivery: failures never surface to the request.
pub async fn dispatch(notifier: Arc<dyn ReminderNotifier>, request: ReminderRequest) {
    if let Err(error) = notifier.send_reminder(&request).await {
        warn!(
            target: "app::reminder",
            task_id = %request.task_id,
            error = %error,
            "failed to send goal date reminder"
        );
    }
}
