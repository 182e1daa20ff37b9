// Database-backed TaskStore

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use smartstudy_core::{NewTask, OwnerId, StoreResult, Task, TaskFilter, TaskPatch, TaskStore};

use crate::models::{TaskRow, TASK_COLUMNS};
use crate::repositories::{store_error, Database};

/// Postgres task store
#[derive(Clone)]
pub struct PgTaskStore {
    db: Database,
}

impl PgTaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find_many(&self, owner: &OwnerId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE owner_id = $1
              AND ($2::boolean IS NULL OR done = $2)
              AND ($3::timestamptz IS NULL OR due_at <= $3)
              AND ($4::timestamptz IS NULL OR due_at >= $4)
            ORDER BY due_at ASC NULLS LAST, created_at DESC, id DESC
            LIMIT $5
            "#
        );

        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(owner.as_str())
            .bind(filter.done)
            .bind(filter.due_before)
            .bind(filter.due_after)
            .bind(filter.limit.map(|l| l as i64))
            .fetch_all(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2");

        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(row.map(Task::from))
    }

    async fn create(&self, owner: &OwnerId, task: NewTask) -> StoreResult<Task> {
        let sql = format!(
            r#"
            INSERT INTO tasks (id, owner_id, title, due_at, notes, done, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            RETURNING {TASK_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(owner.as_str())
            .bind(&task.title)
            .bind(task.due)
            .bind(&task.notes)
            .bind(Utc::now())
            .fetch_one(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(row.into())
    }

    async fn update_one(
        &self,
        owner: &OwnerId,
        id: Uuid,
        patch: &TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($3, title),
                due_at = COALESCE($4, due_at),
                done = COALESCE($5, done),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .bind(&patch.title)
            .bind(patch.due)
            .bind(patch.done)
            .bind(&patch.notes)
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(row.map(Task::from))
    }

    async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Task>> {
        let sql =
            format!("DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}");

        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(row.map(Task::from))
    }

    async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = $1 AND id = ANY($2)")
            .bind(owner.as_str())
            .bind(ids)
            .execute(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected())
    }
}
