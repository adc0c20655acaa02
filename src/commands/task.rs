use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::task::{TaskCreateInput, TaskMutation, TaskRecord, TaskUpdateInput};
use crate::services::reminder_service::{self, ReminderRequest};

use super::{run_blocking, AppState, CommandResult};

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskListFilters {
    pub search: Option<String>,
    pub completed: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl Default for TaskListFilters {
    fn default() -> Self {
        Self {
            search: None,
            completed: None,
            page: Some(1),
            page_size: Some(DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub items: Vec<TaskRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

pub async fn tasks_list(
    state: &AppState,
    authorization: Option<&str>,
    filters: Option<TaskListFilters>,
) -> CommandResult<TaskListResponse> {
    let user = state.authorize(authorization)?;
    let service = state.tasks();
    let filters = filters.unwrap_or_default();

    let records = run_blocking(move || service.list_tasks(&user.user_id)).await?;
    Ok(filter_and_paginate(records, filters))
}

pub async fn tasks_create(
    state: &AppState,
    authorization: Option<&str>,
    payload: TaskCreateInput,
) -> CommandResult<TaskRecord> {
    let user = state.authorize(authorization)?;
    let service = state.tasks();
    let user_id = user.user_id.clone();
    let mutation = run_blocking(move || service.create_task(&user_id, payload)).await?;

    notify_if_due(state, &user.email, &mutation).await;
    Ok(mutation.task)
}

/// Returns the task and, when this update completed it, the growth earned.
pub async fn tasks_update(
    state: &AppState,
    authorization: Option<&str>,
    id: String,
    payload: TaskUpdateInput,
) -> CommandResult<TaskMutation> {
    let user = state.authorize(authorization)?;
    let service = state.tasks();
    let user_id = user.user_id.clone();
    let mutation = run_blocking(move || service.update_task(&user_id, &id, payload)).await?;

    notify_if_due(state, &user.email, &mutation).await;
    Ok(mutation)
}

pub async fn tasks_delete(
    state: &AppState,
    authorization: Option<&str>,
    id: String,
) -> CommandResult<()> {
    let user = state.authorize(authorization)?;
    let service = state.tasks();
    run_blocking(move || service.delete_task(&user.user_id, &id)).await
}

async fn notify_if_due(state: &AppState, email: &str, mutation: &TaskMutation) {
    if !mutation.reminder_due {
        return;
    }
    if let Some(request) = ReminderRequest::for_task(email, &mutation.task) {
        reminder_service::dispatch(state.notifier(), request).await;
    }
}

fn filter_and_paginate(records: Vec<TaskRecord>, filters: TaskListFilters) -> TaskListResponse {
    let search = filters
        .search
        .map(|value| value.trim().to_lowercase())
        .filter(|v| !v.is_empty());

    let filtered: Vec<TaskRecord> = records
        .into_iter()
        .filter(|task| filters.completed.map_or(true, |done| task.completed == done))
        .filter(|task| {
            search
                .as_deref()
                .map_or(true, |needle| task.description.to_lowercase().contains(needle))
        })
        .collect();

    let page = filters.page.unwrap_or(1).max(1);
    let page_size = filters
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let total = filtered.len();
    let start = (page - 1).saturating_mul(page_size);
    let items = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(page_size).min(total);
        filtered[start..end].to_vec()
    };

    debug!(
        target: "app::command",
        total,
        page,
        page_size,
        returned = items.len(),
        "tasks_list"
    );

    TaskListResponse {
        items,
        total,
        page,
        page_size,
    }
}
