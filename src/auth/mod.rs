pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use extractors::{AuthenticatedUser, SessionUser, SESSION_COOKIE};
pub use middleware::AuthMiddleware;
pub use password::{hash_password, password_problems, verify_password, MIN_PASSWORD_LENGTH};
pub use token::{Claims, TokenKeys, TokenPair, TokenType};

lazy_static! {
    // Letters, digits and @ . + - _
    pub static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[\w.@+-]+$").unwrap();
}

/// Payload of `POST /api/token/`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Payload of `POST /api/register/`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Up to 150 characters: letters, digits and `@ . + - _`.
    #[validate(
        length(min = 1, max = 150),
        regex(
            path = "USERNAME_REGEX",
            message = "Username may contain only letters, digits and @/./+/-/_"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Response of a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Access token, also set as the `token` cookie.
    pub token: String,
    pub refresh: String,
    pub user_id: i64,
}

/// Payload of `POST /api/token/refresh/`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access: String,
}
