use std::env;

use crate::error::AppError;

/// Runtime settings, read once at start-up from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub user_count_interval_secs: u64,
    pub ad_expiry_interval_secs: u64,
    pub mail_from: String,
    pub admin: Option<AdminSeed>,
}

/// Credentials for a staff account created on start-up if it does not exist yet.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::InternalServerError("JWT_SECRET must be set".into()))?;

        let admin = match (
            env::var("ADMIN_USERNAME"),
            env::var("ADMIN_EMAIL"),
            env::var("ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(email), Ok(password)) => Some(AdminSeed {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://noticeboard.db".to_string()),
            server_port: parse_var("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret,
            access_token_minutes: parse_var("ACCESS_TOKEN_MINUTES", 60)?,
            refresh_token_days: parse_var("REFRESH_TOKEN_DAYS", 1)?,
            user_count_interval_secs: parse_var("USER_COUNT_INTERVAL_SECS", 600)?,
            ad_expiry_interval_secs: parse_var("AD_EXPIRY_INTERVAL_SECS", 3600)?,
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@example.com".to_string()),
            admin,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
