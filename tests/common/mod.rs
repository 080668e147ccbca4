#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{http::header, test};
use chrono::Duration;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::mpsc::UnboundedReceiver;

use noticeboard::auth::{TokenKeys, TokenPair, SESSION_COOKIE};
use noticeboard::config::AdminSeed;
use noticeboard::db;
use noticeboard::events::{AuthorBookEvent, EventBus};
use noticeboard::models::{NewProfile, User};
use noticeboard::tasks::{Job, JobQueue};

/// Everything the app keeps in `web::Data`, plus the receiving ends of the
/// job and event channels so tests can inspect what was queued.
pub struct TestState {
    pub pool: SqlitePool,
    pub keys: TokenKeys,
    pub jobs: JobQueue,
    pub job_receiver: UnboundedReceiver<Job>,
    pub bus: EventBus,
    pub event_receiver: UnboundedReceiver<AuthorBookEvent>,
}

pub async fn state() -> TestState {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create in-memory database");
    let keys = TokenKeys::new("integration-secret", Duration::minutes(15), Duration::days(1));
    let (jobs, job_receiver) = JobQueue::new();
    let (bus, event_receiver) = EventBus::new();
    TestState {
        pool,
        keys,
        jobs,
        job_receiver,
        bus,
        event_receiver,
    }
}

/// Builds the full application around a `TestState`, wired like `main`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.pool.clone()))
                .app_data(actix_web::web::Data::new($state.keys.clone()))
                .app_data(actix_web::web::Data::new($state.jobs.clone()))
                .app_data(actix_web::web::Data::new($state.bus.clone()))
                .wrap(
                    actix_cors::Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(actix_web::middleware::Logger::default())
                .service(noticeboard::routes::health::health)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(noticeboard::auth::AuthMiddleware)
                        .configure(noticeboard::routes::config),
                )
                .configure(noticeboard::routes::board::config)
                .configure(noticeboard::routes::pages::config),
        )
        .await
    };
}

pub async fn create_user(pool: &SqlitePool, username: &str, password: &str) -> User {
    User::create(
        pool,
        username,
        &format!("{}@example.com", username),
        password,
        NewProfile::default(),
    )
    .await
    .expect("Failed to create user")
}

pub async fn create_staff(pool: &SqlitePool, username: &str, password: &str) -> User {
    let seed = AdminSeed {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: password.to_string(),
    };
    User::ensure_admin(pool, &seed)
        .await
        .expect("Failed to create staff user");
    User::find_by_username(pool, username)
        .await
        .expect("Failed to load staff user")
        .expect("Staff user missing")
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Board session cookie for `user`, as the login form would set it.
pub fn session_for(keys: &TokenKeys, user: &User) -> Cookie<'static> {
    let token = keys
        .generate_access(user.id, &user.username)
        .expect("Failed to issue access token");
    Cookie::new(SESSION_COOKIE, token)
}

/// Logs in through `POST /api/token/` and returns the pair.
pub async fn obtain_tokens(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    password: &str,
) -> TokenPair {
    let req = test::TestRequest::post()
        .uri("/api/token/")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(
        resp.status().is_success(),
        "Failed to obtain token for {}: {}",
        username,
        resp.status()
    );
    test::read_body_json(resp).await
}

pub async fn body_text(resp: ServiceResponse<impl MessageBody>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).expect("Body is not UTF-8")
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Jobs queued so far, without waiting for more.
pub fn drain_jobs(receiver: &mut UnboundedReceiver<Job>) -> Vec<Job> {
    let mut jobs = Vec::new();
    while let Ok(job) = receiver.try_recv() {
        jobs.push(job);
    }
    jobs
}
