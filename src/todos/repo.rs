use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewTodo, Todo, TodoFilter, TodoPatch, TodoRow, TodoStatus};

/// Access to the `todos` table. Every method is scoped by `owner`; a row
/// belonging to someone else behaves exactly like a missing row.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn create(&self, owner: Uuid, new_todo: NewTodo) -> anyhow::Result<Todo>;
    /// Newest first.
    async fn list(&self, owner: Uuid, filter: TodoFilter) -> anyhow::Result<Vec<Todo>>;
    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>>;
    async fn update(&self, owner: Uuid, id: Uuid, patch: &TodoPatch) -> anyhow::Result<Option<Todo>>;
    /// `true` if a row was removed.
    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

const TODO_COLUMNS: &str =
    "id, title, description, status, priority, due_date, user_id, created_at";

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn create(&self, owner: Uuid, new_todo: NewTodo) -> anyhow::Result<Todo> {
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            r#"
            INSERT INTO todos (title, description, status, priority, due_date, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(&new_todo.title)
        .bind(&new_todo.description)
        .bind(TodoStatus::Pending.as_str())
        .bind(new_todo.priority.as_str())
        .bind(new_todo.due_date)
        .bind(owner)
        .fetch_one(&self.db)
        .await
        .context("insert todo")?;
        row.try_into()
    }

    async fn list(&self, owner: Uuid, filter: TodoFilter) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, TodoRow>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM todos
            WHERE user_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR priority = $3)
            ORDER BY created_at DESC
            "#
        ))
        .bind(owner)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .fetch_all(&self.db)
        .await
        .context("list todos")?;
        rows.into_iter().map(Todo::try_from).collect()
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>> {
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM todos
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("get todo")?;
        row.map(Todo::try_from).transpose()
    }

    async fn update(&self, owner: Uuid, id: Uuid, patch: &TodoPatch) -> anyhow::Result<Option<Todo>> {
        // Nullable columns carry a "present" flag so that an explicit null
        // clears the value while an absent field keeps it.
        let row = sqlx::query_as::<_, TodoRow>(&format!(
            r#"
            UPDATE todos SET
                title       = COALESCE($3::text, title),
                description = CASE WHEN $4::boolean THEN $5::text ELSE description END,
                status      = COALESCE($6::text, status),
                priority    = COALESCE($7::text, priority),
                due_date    = CASE WHEN $8::boolean THEN $9::date ELSE due_date END
            WHERE id = $1 AND user_id = $2
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(patch.title.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.priority.map(|p| p.as_str()))
        .bind(patch.due_date.is_some())
        .bind(patch.due_date.flatten())
        .fetch_optional(&self.db)
        .await
        .context("update todo")?;
        row.map(Todo::try_from).transpose()
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await
        .context("delete todo")?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub use memory::MemoryTodoStore;
