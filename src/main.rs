use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use noticeboard::{
    auth::{AuthMiddleware, TokenKeys},
    config::Config,
    db,
    events::{self, EventBus},
    models::User,
    routes,
    tasks::{self, JobQueue, LogMailer},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let pool = db::connect(&config.database_url)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    if let Some(seed) = &config.admin {
        User::ensure_admin(&pool, seed)
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    }

    let keys = TokenKeys::new(
        config.jwt_secret.clone(),
        chrono::Duration::minutes(config.access_token_minutes),
        chrono::Duration::days(config.refresh_token_days),
    );

    let (jobs, job_receiver) = JobQueue::new();
    tokio::spawn(tasks::run_worker(
        pool.clone(),
        Arc::new(LogMailer),
        config.mail_from.clone(),
        job_receiver,
    ));

    let (bus, event_receiver) = EventBus::new();
    tokio::spawn(events::run_consumer(pool.clone(), event_receiver));

    tasks::spawn_scheduler(
        pool.clone(),
        Duration::from_secs(config.user_count_interval_secs),
        Duration::from_secs(config.ad_expiry_interval_secs),
    );

    let pool = web::Data::new(pool);
    let keys = web::Data::new(keys);
    let jobs = web::Data::new(jobs);
    let bus = web::Data::new(bus);

    log::info!("starting noticeboard server at {}", config.server_url());

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(pool.clone())
            .app_data(keys.clone())
            .app_data(jobs.clone())
            .app_data(bus.clone())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
            .configure(routes::board::config)
            .configure(routes::pages::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
