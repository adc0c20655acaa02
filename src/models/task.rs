use serde::{Deserialize, Serialize};

use crate::models::progression::GrowthUpdate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub completed: bool,
    pub goal_date: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
    pub description: String,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub goal_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateInput {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub goal_date: Option<String>,
}

/// Result of a task mutation. `growth_update` is present only when the
/// mutation completed a previously incomplete task. `reminder_due` asks the
/// caller to notify the owner about an approaching goal date.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskMutation {
    pub task: TaskRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_update: Option<GrowthUpdate>,
    #[serde(skip)]
    pub reminder_due: bool,
}
