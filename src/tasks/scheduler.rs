use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::AppError;
use crate::models::{Ad, User};

pub async fn log_total_users(pool: &SqlitePool) -> Result<i64, AppError> {
    let total = User::count(pool).await?;
    log::info!("total users in the system: {}", total);
    Ok(total)
}

/// Deactivates ads that outlived their listing period.
pub async fn expire_ads(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let expired = Ad::deactivate_expired(pool, now).await?;
    if expired > 0 {
        log::info!("deactivated {} expired ads", expired);
    }
    Ok(expired)
}

/// Starts both periodic jobs. Each runs once immediately, then every period.
pub fn spawn_scheduler(
    pool: SqlitePool,
    user_count_every: Duration,
    ad_expiry_every: Duration,
) -> Vec<JoinHandle<()>> {
    let counter_pool = pool.clone();
    let user_count = tokio::spawn(async move {
        let mut ticker = interval(user_count_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = log_total_users(&counter_pool).await {
                log::error!("user count job failed: {}", e);
            }
        }
    });

    let ad_expiry = tokio::spawn(async move {
        let mut ticker = interval(ad_expiry_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = expire_ads(&pool, Utc::now()).await {
                log::error!("ad expiry job failed: {}", e);
            }
        }
    });

    log::info!(
        "scheduler started: user count every {:?}, ad expiry every {:?}",
        user_count_every,
        ad_expiry_every
    );
    vec![user_count, ad_expiry]
}
