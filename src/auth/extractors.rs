use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::SqlitePool;
use std::future::{ready, Ready};

use crate::auth::token::{Claims, TokenKeys, TokenType};
use crate::error::AppError;
use crate::models::User;

/// Name of the cookie that carries the board's session (an access token).
pub const SESSION_COOKIE: &str = "token";

/// The caller of an API route, taken from the claims `AuthMiddleware` stored.
///
/// Returns `AppError::Unauthorized` when the middleware did not run.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(claims.into())),
            None => {
                let err = AppError::Unauthorized(
                    "User not found in request. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}

/// The visitor of a board page: `Some` when the session cookie holds a valid
/// access token of an active user, `None` for anonymous visitors.
///
/// Only a database failure while loading the user is an error.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Option<AuthenticatedUser>);

impl SessionUser {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequest for SessionUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = match (req.cookie(SESSION_COOKIE), req.app_data::<web::Data<TokenKeys>>()) {
            (Some(cookie), Some(keys)) => keys.verify(cookie.value(), TokenType::Access).ok(),
            _ => None,
        };
        let pool = req.app_data::<web::Data<SqlitePool>>().cloned();

        Box::pin(async move {
            let (claims, pool) = match (claims, pool) {
                (Some(claims), Some(pool)) => (claims, pool),
                _ => return Ok(SessionUser(None)),
            };
            let active = User::find_active(&pool, claims.sub).await?;
            Ok(SessionUser(active.map(|_| claims.into())))
        })
    }
}
