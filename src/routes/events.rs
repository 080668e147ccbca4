use actix_web::{post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    events::{AuthorBookEvent, EventBus},
    models::User,
};

/// Accepts an author/book event for the consumer. Staff only.
///
/// The event is stored asynchronously, so the answer is `202 Accepted`
/// even for keys the consumer will end up ignoring.
#[post("/events/")]
pub async fn publish_event(
    pool: web::Data<SqlitePool>,
    bus: web::Data<EventBus>,
    user: AuthenticatedUser,
    event: web::Json<AuthorBookEvent>,
) -> Result<impl Responder, AppError> {
    User::require_staff(&pool, user.id).await?;

    let event = event.into_inner();
    if event.key.trim().is_empty() {
        return Err(AppError::BadRequest("Event key is required".into()));
    }
    let key = event.key.clone();
    bus.publish(event);

    Ok(HttpResponse::Accepted().json(json!({ "status": "accepted", "key": key })))
}
