use std::net::SocketAddr;

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::{
        AccessResponse, LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse,
        TokenKeys, SESSION_COOKIE,
    },
    error::AppError,
    models::{NewProfile, TokenUsage, User},
    tasks::{Job, JobQueue},
};

/// Client address without the port, as reported by the connection.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    let info = req.connection_info();
    let addr = info.realip_remote_addr()?;
    match addr.parse::<SocketAddr>() {
        Ok(socket) => Some(socket.ip().to_string()),
        Err(_) => Some(addr.to_string()),
    }
}

/// The board session cookie holding an access token. `SameSite=Lax` keeps it
/// off cross-site form posts.
pub fn session_cookie(token: &str, keys: &TokenKeys) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(keys.access_ttl().num_seconds()))
        .finish()
}

/// An expired session cookie, which makes the browser drop it.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

/// Queues the welcome mails sent after any registration.
pub fn enqueue_welcome_mail(jobs: &JobQueue, user_id: i64) {
    jobs.enqueue(Job::RegistrationEmail { user_id });
    jobs.enqueue(Job::AdvertisementEmail { user_id });
}

/// Register a new user
///
/// Creates the account and its profile, then answers `201` with an
/// access/refresh pair. The access token is also set as the `token` cookie
/// and its use is recorded with the client address.
#[post("/register/")]
pub async fn register(
    pool: web::Data<SqlitePool>,
    keys: web::Data<TokenKeys>,
    jobs: web::Data<JobQueue>,
    req: HttpRequest,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let user = User::create(
        &pool,
        &register_data.username,
        &register_data.email,
        &register_data.password,
        NewProfile::default(),
    )
    .await?;

    let pair = keys.generate_pair(user.id, &user.username)?;
    TokenUsage::record(&pool, user.id, &pair.access, client_ip(&req).as_deref()).await?;
    enqueue_welcome_mail(&jobs, user.id);

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&pair.access, &keys))
        .json(RegisterResponse {
            token: pair.access,
            refresh: pair.refresh,
            user_id: user.id,
        }))
}

/// Obtain a token pair
///
/// Exchanges username and password for `{access, refresh}`.
#[post("/token/")]
pub async fn obtain_token(
    pool: web::Data<SqlitePool>,
    keys: web::Data<TokenKeys>,
    req: HttpRequest,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = User::authenticate(&pool, &login_data.username, &login_data.password).await?;
    let pair = keys.generate_pair(user.id, &user.username)?;
    TokenUsage::record(&pool, user.id, &pair.access, client_ip(&req).as_deref()).await?;

    log::info!("issued token pair to {}", user.username);
    Ok(HttpResponse::Ok().json(pair))
}

/// Refresh an access token
#[post("/token/refresh/")]
pub async fn refresh_token(
    keys: web::Data<TokenKeys>,
    refresh_data: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    let access = keys.refresh(&refresh_data.refresh)?;
    Ok(HttpResponse::Ok().json(AccessResponse { access }))
}
