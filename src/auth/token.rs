use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distinguishes short-lived access tokens from refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Represents the claims encoded within a JWT.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i64,
    /// Username at the time of issue, shown by the board without a database lookup.
    pub username: String,
    pub token_type: TokenType,
    /// Unique token id. Two tokens issued in the same second still hash differently.
    pub jti: String,
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// An access/refresh pair, as returned by `POST /api/token/`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signing secret and lifetimes, shared with handlers and the middleware as `web::Data`.
#[derive(Debug, Clone)]
pub struct TokenKeys {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    fn issue(
        &self,
        user_id: i64,
        username: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::InternalServerError("Token lifetime overflow".into()))?;

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Issues a fresh access token.
    pub fn generate_access(&self, user_id: i64, username: &str) -> Result<String, AppError> {
        self.issue(user_id, username, TokenType::Access, self.access_ttl)
    }

    /// Issues an access/refresh pair for a user that just authenticated.
    pub fn generate_pair(&self, user_id: i64, username: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.issue(user_id, username, TokenType::Access, self.access_ttl)?,
            refresh: self.issue(user_id, username, TokenType::Refresh, self.refresh_ttl)?,
        })
    }

    /// Verifies signature and expiry, then checks the token is of the `expected` type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {:?}", e.kind())))?;

        if claims.token_type != expected {
            return Err(AppError::Unauthorized("Invalid token: wrong token type".into()));
        }
        Ok(claims)
    }

    /// Exchanges a valid refresh token for a new access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        self.generate_access(claims.sub, &claims.username)
    }
}
