use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Todo record in the database. Every statement below is scoped to the
/// owning user except `find_by_id`, which callers use to tell a missing
/// record apart from somebody else's.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Todo {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: &str,
        completed: bool,
    ) -> anyhow::Result<Todo> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (user_id, title, description, completed)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(completed)
        .fetch_one(db)
        .await?;
        Ok(todo)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM todos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(todo)
    }

    pub async fn count_for_user(
        db: &PgPool,
        user_id: Uuid,
        pattern: Option<&str>,
    ) -> anyhow::Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM todos
            WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            "#,
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_one(db)
        .await?;
        Ok(total)
    }

    /// One page of the user's todos. `sort_column` must come from the query
    /// whitelist; it is interpolated, not bound.
    pub async fn list_for_user(
        db: &PgPool,
        user_id: Uuid,
        pattern: Option<&str>,
        sort_column: &'static str,
        descending: bool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Todo>> {
        let direction = if descending { "DESC" } else { "ASC" };
        let sql = format!(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM todos
            WHERE user_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            ORDER BY {sort_column} {direction}
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, Todo>(&sql)
            .bind(user_id)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;
        Ok(rows)
    }

    /// Partial update. The owner check rides in the WHERE clause so a record
    /// deleted or re-owned between read and write is never touched; None
    /// fields keep their current value.
    pub async fn update_fields(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> anyhow::Result<Option<Todo>> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                completed = COALESCE($5, completed),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(completed)
        .fetch_optional(db)
        .await?;
        Ok(todo)
    }

    pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM todos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
