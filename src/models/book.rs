use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::error::AppError;
use crate::search::{folded_pattern, search_key};

/// A book in the library, serialised with the creator's username in `user`.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_year: i64,
    /// Username of the user who added the book.
    pub user: String,
    #[serde(skip_serializing, default)]
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Username of the last editor, if the book was ever updated.
    pub updated_by: Option<String>,
}

/// Body of `POST /api/books/` and `PUT /api/books/{id}/`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BookInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub author: String,
    #[validate(length(min = 1, max = 100))]
    pub genre: String,
    #[validate(range(min = 0, max = 2147483647))]
    pub publication_year: i64,
}

/// Body of `PATCH /api/books/{id}/`: every field optional.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct BookPatch {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub author: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub genre: Option<String>,
    #[validate(range(min = 0, max = 2147483647))]
    pub publication_year: Option<i64>,
}

impl BookPatch {
    /// Applies the present fields on top of `book`.
    pub fn merge(self, book: &Book) -> BookInput {
        BookInput {
            title: self.title.unwrap_or_else(|| book.title.clone()),
            author: self.author.unwrap_or_else(|| book.author.clone()),
            genre: self.genre.unwrap_or_else(|| book.genre.clone()),
            publication_year: self.publication_year.unwrap_or(book.publication_year),
        }
    }
}

/// Sort keys accepted by `?ordering=`; a leading `-` sorts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOrdering {
    Title,
    TitleDesc,
    Year,
    YearDesc,
}

impl BookOrdering {
    /// Unknown keys yield `None` and the default order is used.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "title" => Some(Self::Title),
            "-title" => Some(Self::TitleDesc),
            "publication_year" => Some(Self::Year),
            "-publication_year" => Some(Self::YearDesc),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Title => "b.title ASC, b.id ASC",
            Self::TitleDesc => "b.title DESC, b.id ASC",
            Self::Year => "b.publication_year ASC, b.id ASC",
            Self::YearDesc => "b.publication_year DESC, b.id ASC",
        }
    }
}

/// Query parameters of `GET /api/books/`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BookQuery {
    /// Exact author match.
    pub author: Option<String>,
    /// Exact genre match.
    pub genre: Option<String>,
    pub publication_year: Option<i64>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    pub ordering: Option<String>,
}

const BOOK_SELECT: &str = "SELECT b.id, b.title, b.author, b.genre, b.publication_year, \
     u.username AS user, b.user_id, b.created_at, b.updated_at, b.updated_by \
     FROM books b JOIN users u ON u.id = b.user_id";

impl Book {
    pub async fn list(pool: &SqlitePool, query: &BookQuery) -> Result<Vec<Book>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(BOOK_SELECT);
        builder.push(" WHERE 1 = 1");

        if let Some(author) = &query.author {
            builder.push(" AND b.author = ").push_bind(author.clone());
        }
        if let Some(genre) = &query.genre {
            builder.push(" AND b.genre = ").push_bind(genre.clone());
        }
        if let Some(year) = query.publication_year {
            builder.push(" AND b.publication_year = ").push_bind(year);
        }
        if let Some(pattern) = query.search.as_deref().and_then(folded_pattern) {
            builder
                .push(" AND b.title_search LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\'");
        }

        let ordering = query
            .ordering
            .as_deref()
            .and_then(BookOrdering::parse)
            .map(BookOrdering::sql)
            .unwrap_or("b.id ASC");
        builder.push(" ORDER BY ").push(ordering);

        Ok(builder.build_query_as::<Book>().fetch_all(pool).await?)
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Book, AppError> {
        let sql = format!("{} WHERE b.id = ?", BOOK_SELECT);
        sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".into()))
    }

    pub async fn create(pool: &SqlitePool, input: &BookInput, user_id: i64) -> Result<Book, AppError> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO books (title, title_search, author, genre, publication_year, user_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(search_key(&input.title))
        .bind(&input.author)
        .bind(&input.genre)
        .bind(input.publication_year)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find(pool, id).await
    }

    /// Replaces the editable fields and records `editor` in `updated_by`.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        input: &BookInput,
        editor: &str,
    ) -> Result<Book, AppError> {
        let result = sqlx::query(
            "UPDATE books
             SET title = ?, title_search = ?, author = ?, genre = ?, publication_year = ?,
                 updated_at = ?, updated_by = ?
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(search_key(&input.title))
        .bind(&input.author)
        .bind(&input.genre)
        .bind(input.publication_year)
        .bind(Utc::now())
        .bind(editor)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".into()));
        }
        Self::find(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".into()));
        }
        Ok(())
    }
}
