use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::TaskRecord;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        description,
        completed,
        goal_date,
        completed_at,
        created_at,
        updated_at
    FROM tasks
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub completed: bool,
    pub goal_date: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            description: record.description.clone(),
            completed: record.completed,
            goal_date: record.goal_date.clone(),
            completed_at: record.completed_at.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> TaskRecord {
        TaskRecord {
            id: self.id,
            user_id: self.user_id,
            description: self.description,
            completed: self.completed,
            goal_date: self.goal_date,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TaskRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            description: row.get("description")?,
            completed: row.get::<_, i64>("completed")? != 0,
            goal_date: row.get("goal_date")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    user_id,
                    description,
                    completed,
                    goal_date,
                    completed_at,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :user_id,
                    :description,
                    :completed,
                    :goal_date,
                    :completed_at,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":description": &row.description,
                ":completed": row.completed as i64,
                ":goal_date": &row.goal_date,
                ":completed_at": &row.completed_at,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    description = :description,
                    completed = :completed,
                    goal_date = :goal_date,
                    completed_at = :completed_at,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":description": &row.description,
                ":completed": row.completed as i64,
                ":goal_date": &row.goal_date,
                ":completed_at": &row.completed_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ?1 ORDER BY created_at DESC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([user_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
