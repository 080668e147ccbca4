use actix_web::{delete, get, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{AuthorBookAction, BoardStatistics, TokenUsage, User},
};

#[derive(Debug, Deserialize)]
pub struct TokenFilter {
    pub user_id: Option<i64>,
}

/// Lists recorded token issues, optionally for one `?user_id=`. Staff only.
#[get("/admin/tokens/")]
pub async fn list_tokens(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
    filter: web::Query<TokenFilter>,
) -> Result<impl Responder, AppError> {
    User::require_staff(&pool, user.id).await?;
    let tokens = TokenUsage::list(&pool, filter.user_id).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Token records of one user. Staff only.
#[get("/admin/tokens/{user_id}/")]
pub async fn list_user_tokens(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
    user_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    User::require_staff(&pool, user.id).await?;
    let tokens = TokenUsage::list(&pool, Some(user_id.into_inner())).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Deletes one token record. The id is checked by hand so a non-numeric id
/// answers `400 {"error": "Invalid token ID"}` instead of a routing error.
#[delete("/admin/tokens/delete/{pk}/")]
pub async fn delete_token(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
    pk: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    User::require_staff(&pool, user.id).await?;

    let raw = pk.into_inner();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Invalid token ID".into()));
    }
    let id: i64 = raw
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid token ID".into()))?;

    TokenUsage::delete(&pool, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Deletes a user with their profile, ads, comments, books and token records.
#[delete("/users/{id}/delete/")]
pub async fn delete_user(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    User::require_staff(&pool, user.id).await?;
    User::delete(&pool, user_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Board figures as JSON. Staff only.
#[get("/admin/statistics/")]
pub async fn statistics(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::require_staff(&pool, user.id).await?;
    let stats = BoardStatistics::collect(&pool, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Recorded author/book actions, newest first. Staff only.
#[get("/admin/actions/")]
pub async fn list_actions(
    pool: web::Data<SqlitePool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::require_staff(&pool, user.id).await?;
    let actions = AuthorBookAction::list(&pool).await?;
    Ok(HttpResponse::Ok().json(actions))
}
