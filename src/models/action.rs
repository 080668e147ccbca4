use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::AppError;

/// What happened to an author or a book, as announced on the event bus.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AuthorCreated,
    AuthorUpdated,
    BookCreated,
    BookUpdated,
}

impl ActionKind {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "author_created" => Some(Self::AuthorCreated),
            "author_updated" => Some(Self::AuthorUpdated),
            "book_created" => Some(Self::BookCreated),
            "book_updated" => Some(Self::BookUpdated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorCreated => "author_created",
            Self::AuthorUpdated => "author_updated",
            Self::BookCreated => "book_created",
            Self::BookUpdated => "book_updated",
        }
    }
}

/// A stored author/book event.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AuthorBookAction {
    pub id: i64,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub book_id: Option<i64>,
    pub book_title: Option<String>,
    pub action: ActionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of an action before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub book_id: Option<i64>,
    pub book_title: Option<String>,
}

impl AuthorBookAction {
    pub async fn create(
        pool: &SqlitePool,
        action: ActionKind,
        payload: &ActionPayload,
    ) -> Result<AuthorBookAction, AppError> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO author_book_actions
             (author_id, author_name, book_id, book_title, action, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payload.author_id)
        .bind(&payload.author_name)
        .bind(payload.book_id)
        .bind(&payload.book_title)
        .bind(action)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Ok(AuthorBookAction {
            id,
            author_id: payload.author_id,
            author_name: payload.author_name.clone(),
            book_id: payload.book_id,
            book_title: payload.book_title.clone(),
            action,
            created_at: now,
            updated_at: now,
        })
    }

    /// Newest first.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<AuthorBookAction>, AppError> {
        Ok(sqlx::query_as::<_, AuthorBookAction>(
            "SELECT id, author_id, author_name, book_id, book_title, action, created_at, updated_at
             FROM author_book_actions ORDER BY id DESC",
        )
        .fetch_all(pool)
        .await?)
    }
}
