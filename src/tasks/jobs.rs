use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::models::{Ad, User};

/// Work handed off by request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    RegistrationEmail { user_id: i64 },
    AdvertisementEmail { user_id: i64 },
    AdCreatedEmail { ad_id: i64 },
}

/// Sending half of the job channel, shared through `web::Data`.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Never blocks. If the worker is gone the job is logged and dropped.
    pub fn enqueue(&self, job: Job) {
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            log::warn!("job worker is not running, dropping {:?}", job);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers outgoing mail.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &Email) -> Result<(), AppError>;
}

/// Writes every message to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &Email) -> Result<(), AppError> {
        log::info!(
            "mail from {} to {}: {} / {}",
            email.from,
            email.to,
            email.subject,
            email.body
        );
        Ok(())
    }
}

async fn compose(pool: &SqlitePool, job: &Job, from: &str) -> Result<Option<Email>, AppError> {
    let email = |to: String, subject: &str, body: String| Email {
        from: from.to_string(),
        to,
        subject: subject.to_string(),
        body,
    };

    let composed = match job {
        Job::RegistrationEmail { user_id } => User::find(pool, *user_id).await?.map(|user| {
            email(
                user.email,
                "Registration successful!",
                "Welcome! You have successfully registered on our service.".to_string(),
            )
        }),
        Job::AdvertisementEmail { user_id } => User::find(pool, *user_id).await?.map(|user| {
            email(
                user.email,
                "What our service offers",
                "Take a look at what you can do: post ads, search, filter and much more!"
                    .to_string(),
            )
        }),
        Job::AdCreatedEmail { ad_id } => match Ad::find(pool, *ad_id).await {
            Ok(ad) => User::find(pool, ad.user_id).await?.map(|user| {
                email(
                    user.email,
                    "Your ad is live",
                    format!("Your ad \"{}\" has been published.", ad.title),
                )
            }),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
    };
    Ok(composed)
}

/// Runs one job. A job whose user or ad has since been deleted is skipped.
pub async fn run_job(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    from: &str,
    job: &Job,
) -> Result<(), AppError> {
    match compose(pool, job, from).await? {
        Some(email) => {
            mailer.send(&email)?;
            log::info!("{:?} delivered to {}", job, email.to);
        }
        None => log::warn!("{:?} skipped: target no longer exists", job),
    }
    Ok(())
}

/// Processes jobs until every `JobQueue` handle is dropped.
pub async fn run_worker(
    pool: SqlitePool,
    mailer: Arc<dyn Mailer>,
    from: String,
    mut receiver: mpsc::UnboundedReceiver<Job>,
) {
    log::info!("job worker started");
    while let Some(job) = receiver.recv().await {
        if let Err(e) = run_job(&pool, mailer.as_ref(), &from, &job).await {
            log::error!("{:?} failed: {}", job, e);
        }
    }
    log::info!("job worker stopped");
}
