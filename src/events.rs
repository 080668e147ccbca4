//! Author/book events.
//!
//! Producers (book handlers, `POST /api/events/`) publish onto an in-process
//! bus; one consumer task stores each event as an `AuthorBookAction`.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::models::{ActionKind, ActionPayload, AuthorBookAction};

/// A keyed event, e.g. `{"key": "book_created", "payload": {"book_id": 3}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorBookEvent {
    pub key: String,
    #[serde(default)]
    pub payload: ActionPayload,
}

impl AuthorBookEvent {
    pub fn new(kind: ActionKind, payload: ActionPayload) -> Self {
        Self {
            key: kind.as_str().to_string(),
            payload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<AuthorBookEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuthorBookEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn publish(&self, event: AuthorBookEvent) {
        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            log::warn!("event consumer is not running, dropping {:?}", event);
        }
    }
}

/// Stores one event. Unknown keys are logged and yield `None`.
pub async fn record_event(
    pool: &SqlitePool,
    event: &AuthorBookEvent,
) -> Result<Option<AuthorBookAction>, AppError> {
    let Some(kind) = ActionKind::parse(&event.key) else {
        log::warn!("ignoring event with unknown key {:?}", event.key);
        return Ok(None);
    };
    let action = AuthorBookAction::create(pool, kind, &event.payload).await?;
    log::info!(
        "saved {} action: author_id={:?}, book_id={:?}",
        kind.as_str(),
        action.author_id,
        action.book_id
    );
    Ok(Some(action))
}

/// Consumes events until every `EventBus` handle is dropped.
pub async fn run_consumer(pool: SqlitePool, mut receiver: mpsc::UnboundedReceiver<AuthorBookEvent>) {
    log::info!("event consumer started");
    while let Some(event) = receiver.recv().await {
        if let Err(e) = record_event(&pool, &event).await {
            log::error!("failed to save event {:?}: {}", event.key, e);
        }
    }
    log::info!("event consumer stopped");
}
