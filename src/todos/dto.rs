use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Todo;
use crate::error::ApiError;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Partial update: a field left out of the body is left untouched, which is
/// why every field is optional. An empty title is present-and-invalid, not
/// absent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Query string for listing. Numbers arrive as raw strings so that junk
/// input coerces to defaults instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> i64 {
        coerce_positive(self.page.as_deref(), 1)
    }

    pub fn limit(&self) -> i64 {
        coerce_positive(self.limit.as_deref(), 10)
    }

    /// Sort column restricted to a whitelist; anything else falls back to
    /// creation time.
    pub fn sort_column(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("title") => "title",
            Some("completed") => "completed",
            Some("updatedAt") | Some("updated_at") => "updated_at",
            _ => "created_at",
        }
    }

    pub fn descending(&self) -> bool {
        !self
            .order
            .as_deref()
            .map(|o| o.eq_ignore_ascii_case("asc"))
            .unwrap_or(false)
    }

    /// ILIKE pattern for a literal case-insensitive substring match on the
    /// title, or None when no usable search term was given.
    pub fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

fn coerce_positive(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub fn validate_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".into()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ApiError::Validation(
            "Title cannot exceed 200 characters".into(),
        ));
    }
    Ok(title.to_string())
}

pub fn validate_description(raw: &str) -> Result<String, ApiError> {
    let description = raw.trim();
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ApiError::Validation(
            "Description cannot exceed 1000 characters".into(),
        ));
    }
    Ok(description.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoCreated {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdated {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Todo> for TodoItem {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            completed: t.completed,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// One page of todos plus the unpaginated match count.
#[derive(Debug, Serialize)]
pub struct TodoPage {
    pub data: Vec<TodoItem>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}
