use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{TaskCreateInput, TaskMutation, TaskRecord, TaskUpdateInput};
use crate::services::progression_service::ProgressionService;
use crate::services::reminder_service::reminder_due;
use crate::services::settings_service::SettingsService;
use crate::utils::calendar::parse_timestamp;

const MAX_DESCRIPTION_CHARS: usize = 500;

pub struct TaskService {
    db: DbPool,
    progression: Arc<ProgressionService>,
    settings: Arc<SettingsService>,
}

impl TaskService {
    pub fn new(
        db: DbPool,
        progression: Arc<ProgressionService>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            db,
            progression,
            settings,
        }
    }

    pub fn create_task(&self, user_id: &str, input: TaskCreateInput) -> AppResult<TaskMutation> {
        self.create_task_at(user_id, input, Utc::now())
    }

    pub fn create_task_at(
        &self,
        user_id: &str,
        input: TaskCreateInput,
        now: DateTime<Utc>,
    ) -> AppResult<TaskMutation> {
        let completed = input.completed.unwrap_or(false);
        let timestamp = now.to_rfc3339();
        let record = TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            description: normalize_description(&input.description)?,
            completed,
            goal_date: normalize_goal_date(input.goal_date)?,
            completed_at: completed.then(|| timestamp.clone()),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        };

        let row = TaskRow::from_record(&record);
        self.db
            .with_connection(|conn| TaskRepository::insert(conn, &row))?;
        info!(target: "app::task", task_id = %record.id, %user_id, "task created");

        let reminder_due = self.goal_reminder_due(&record, &now)?;
        Ok(TaskMutation {
            task: record,
            growth_update: None,
            reminder_due,
        })
    }

    pub fn update_task(
        &self,
        user_id: &str,
        id: &str,
        update: TaskUpdateInput,
    ) -> AppResult<TaskMutation> {
        self.update_task_at(user_id, id, update, Utc::now())
    }

    /// Applies `update` and, when it moves the task from incomplete to
    /// complete, records the completion against the owner's progression in
    /// the same transaction. Every other edit leaves progression alone.
    pub fn update_task_at(
        &self,
        user_id: &str,
        id: &str,
        update: TaskUpdateInput,
        now: DateTime<Utc>,
    ) -> AppResult<TaskMutation> {
        let goal_date_changed = update.goal_date.is_some();
        let description = update
            .description
            .as_deref()
            .map(normalize_description)
            .transpose()?;
        let goal_date = normalize_goal_date(update.goal_date)?;

        let (task, growth_update) = self.db.with_transaction(|tx| {
            let mut task = TaskRepository::find_by_id(tx, id)?
                .ok_or_else(AppError::not_found)?
                .into_record();
            ensure_owner(&task, user_id)?;

            let was_completed = task.completed;
            let is_being_completed = update.completed == Some(true);

            if let Some(description) = description {
                task.description = description;
            }
            if let Some(completed) = update.completed {
                task.completed = completed;
                if !completed {
                    task.completed_at = None;
                }
            }
            if goal_date.is_some() {
                task.goal_date = goal_date;
            }
            task.updated_at = now.to_rfc3339();

            let growth_update = if !was_completed && is_being_completed {
                task.completed_at = Some(task.updated_at.clone());
                TaskRepository::update(tx, &TaskRow::from_record(&task))?;
                Some(self.progression.record_completion(tx, user_id, now)?)
            } else {
                TaskRepository::update(tx, &TaskRow::from_record(&task))?;
                None
            };

            Ok((task, growth_update))
        })?;

        info!(
            target: "app::task",
            task_id = %task.id,
            %user_id,
            completed = task.completed,
            progressed = growth_update.is_some(),
            "task updated"
        );

        let reminder_due = growth_update.is_none()
            && goal_date_changed
            && self.goal_reminder_due(&task, &now)?;

        Ok(TaskMutation {
            task,
            growth_update,
            reminder_due,
        })
    }

    pub fn delete_task(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db.with_transaction(|tx| {
            let task = TaskRepository::find_by_id(tx, id)?
                .ok_or_else(AppError::not_found)?
                .into_record();
            ensure_owner(&task, user_id)?;
            TaskRepository::delete(tx, id)
        })?;
        info!(target: "app::task", task_id = %id, %user_id, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, user_id: &str, id: &str) -> AppResult<TaskRecord> {
        let task = self
            .db
            .with_connection(|conn| TaskRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?
            .into_record();
        ensure_owner(&task, user_id)?;
        debug!(target: "app::task", task_id = %task.id, "task fetched");
        Ok(task)
    }

    pub fn list_tasks(&self, user_id: &str) -> AppResult<Vec<TaskRecord>> {
        let rows = self
            .db
            .with_connection(|conn| TaskRepository::list_for_user(conn, user_id))?;
        let tasks: Vec<TaskRecord> = rows.into_iter().map(TaskRow::into_record).collect();
        debug!(target: "app::task", %user_id, count = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    fn goal_reminder_due(&self, task: &TaskRecord, now: &DateTime<Utc>) -> AppResult<bool> {
        if task.goal_date.is_none() {
            return Ok(false);
        }
        let settings = self.settings.get()?;
        Ok(settings.reminders_enabled
            && reminder_due(task.goal_date.as_deref(), now, settings.reminder_window_days))
    }
}

fn ensure_owner(task: &TaskRecord, user_id: &str) -> AppResult<()> {
    if task.user_id != user_id {
        return Err(AppError::unauthorized("无权操作该任务"));
    }
    Ok(())
}

fn normalize_description(description: &str) -> AppResult<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("任务描述不能为空"));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::validation(format!(
            "任务描述长度需在 {MAX_DESCRIPTION_CHARS} 字以内"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_goal_date(value: Option<String>) -> AppResult<Option<String>> {
    match value {
        Some(value) if !value.trim().is_empty() => {
            parse_timestamp(&value).map_err(|_| AppError::validation("目标日期格式非法"))?;
            Ok(Some(value.trim().to_string()))
        }
        _ => Ok(None),
    }
}
