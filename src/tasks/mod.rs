//! Background work: queued jobs (emails) and periodic maintenance.
//!
//! Jobs travel over an unbounded tokio channel from request handlers to a
//! single worker task. The scheduler runs its jobs on tokio intervals.

pub mod jobs;
pub mod scheduler;

pub use jobs::{run_job, run_worker, Email, Job, JobQueue, LogMailer, Mailer};
pub use scheduler::{expire_ads, log_total_users, spawn_scheduler};
