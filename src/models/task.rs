//!
//! # Task Model
//!
//! Defines the `Task` entity, its request payloads, the list filter, and the
//! database operations on the `tasks` table. Every read and write is scoped
//! by owner: a task belonging to someone else behaves exactly like a task
//! that does not exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// A task as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a task. `completed` may be set up front and defaults
/// to `false`. Unknown fields, including any attempt to pick the owner, are
/// ignored; ownership always comes from the authenticated caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl CreateTask {
    fn normalize(&mut self) {
        self.description = self.description.trim().to_string();
    }
}

/// Payload for updating a task. Only `description` and `completed` may be
/// patched; any other field fails deserialization.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTask {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTask {
    fn normalize(&mut self) {
        if let Some(description) = &self.description {
            self.description = Some(description.trim().to_string());
        }
    }

    fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }
}

/// Query parameters accepted by the task listing endpoint, e.g.
/// `?completed=true&limit=10&skip=20&sortBy=createdAt:desc`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort_by: Option<String>,
}

impl TaskFilter {
    fn validate(&self) -> Result<(), AppError> {
        if matches!(self.limit, Some(limit) if limit < 0) {
            return Err(AppError::Validation("limit must not be negative".into()));
        }
        if matches!(self.skip, Some(skip) if skip < 0) {
            return Err(AppError::Validation("skip must not be negative".into()));
        }
        Ok(())
    }

    /// Translates the `sortBy` parameter into an `ORDER BY` clause.
    ///
    /// Only known columns are accepted; the sort key never reaches the SQL
    /// text unchecked. The direction defaults to ascending, and the overall
    /// default of `created_at ASC` keeps pagination stable across requests.
    fn order_clause(&self) -> Result<&'static str, AppError> {
        let raw = match &self.sort_by {
            None => return Ok("created_at ASC"),
            Some(raw) => raw,
        };

        let (key, direction) = match raw.split_once(':') {
            Some((key, direction)) => (key, direction),
            None => (raw.as_str(), "asc"),
        };

        let clause = match (key, direction) {
            ("createdAt", "asc") => "created_at ASC",
            ("createdAt", "desc") => "created_at DESC",
            ("updatedAt", "asc") => "updated_at ASC",
            ("updatedAt", "desc") => "updated_at DESC",
            ("description", "asc") => "description ASC",
            ("description", "desc") => "description DESC",
            ("completed", "asc") => "completed ASC",
            ("completed", "desc") => "completed DESC",
            ("createdAt" | "updatedAt" | "description" | "completed", other) => {
                return Err(AppError::Validation(format!(
                    "Invalid sort direction \"{}\"",
                    other
                )))
            }
            (other, _) => {
                return Err(AppError::Validation(format!("Cannot sort by \"{}\"", other)))
            }
        };
        Ok(clause)
    }
}

impl Task {
    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        mut input: CreateTask,
    ) -> Result<Task, AppError> {
        input.normalize();
        input.validate()?;

        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, description, completed, owner_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id, description, completed, owner_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&input.description)
        .bind(input.completed)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    pub async fn find_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(
            "SELECT id, description, completed, owner_id, created_at, updated_at
             FROM tasks WHERE id = $1 AND owner_id = $2",
        )
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists the owner's tasks with optional completion filter, sorting, and
    /// pagination. The statement is assembled from the filters actually
    /// present; values are always bound, never spliced into the SQL.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, AppError> {
        filter.validate()?;
        let order = filter.order_clause()?;

        let mut sql = String::from(
            "SELECT id, description, completed, owner_id, created_at, updated_at
             FROM tasks WHERE owner_id = $1",
        );
        let mut idx = 2;
        if filter.completed.is_some() {
            sql.push_str(&format!(" AND completed = ${}", idx));
            idx += 1;
        }
        sql.push_str(&format!(" ORDER BY {}", order));
        if filter.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", idx));
            idx += 1;
        }
        if filter.skip.is_some() {
            sql.push_str(&format!(" OFFSET ${}", idx));
        }

        let mut query = sqlx::query_as::<_, Task>(&sql);
        query = query.bind(owner_id);
        if let Some(completed) = filter.completed {
            query = query.bind(completed);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }
        if let Some(skip) = filter.skip {
            query = query.bind(skip);
        }

        let tasks = query.fetch_all(pool).await?;
        Ok(tasks)
    }

    /// Applies a partial update to an owned task. Returns `None` when no task
    /// with this id belongs to the owner, which handlers report as not found.
    pub async fn update_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
        mut patch: UpdateTask,
    ) -> Result<Option<Task>, AppError> {
        patch.normalize();
        patch.validate()?;

        if patch.is_empty() {
            return Task::find_for_owner(pool, owner_id, task_id).await;
        }

        let mut sets: Vec<String> = Vec::new();
        let mut idx = 1;
        if patch.description.is_some() {
            sets.push(format!("description = ${}", idx));
            idx += 1;
        }
        if patch.completed.is_some() {
            sets.push(format!("completed = ${}", idx));
            idx += 1;
        }
        sets.push("updated_at = now()".to_string());

        let sql = format!(
            "UPDATE tasks SET {} WHERE id = ${} AND owner_id = ${}
             RETURNING id, description, completed, owner_id, created_at, updated_at",
            sets.join(", "),
            idx,
            idx + 1
        );

        let mut query = sqlx::query_as::<_, Task>(&sql);
        if let Some(description) = patch.description {
            query = query.bind(description);
        }
        if let Some(completed) = patch.completed {
            query = query.bind(completed);
        }

        let task = query.bind(task_id).bind(owner_id).fetch_optional(pool).await?;
        Ok(task)
    }

    /// Deletes an owned task, returning the deleted row, or `None` when no
    /// task with this id belongs to the owner.
    pub async fn delete_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(
            "DELETE FROM tasks WHERE id = $1 AND owner_id = $2
             RETURNING id, description, completed, owner_id, created_at, updated_at",
        )
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }
}
