use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::httplog::ports::HttpLogServicePort;
use crate::inbound::http::rate_limit::ClientRateLimiter;
use crate::domain::report::ports::Mailer;
use crate::domain::report::service::DailyReportService;
use crate::domain::user::ports::UserRepository;

/// How long `stop` waits for in-flight jobs before aborting them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Invalid schedule '{expression}' for job {name}: {reason}")]
    InvalidSchedule {
        name: String,
        expression: String,
        reason: String,
    },
}

/// Runs named jobs on six-field cron expressions (`sec min hour dom month dow`).
///
/// Each job owns a tokio task that sleeps until its next occurrence. Runs of
/// the same job never overlap; occurrences missed while a run was in
/// progress are skipped.
pub struct JobScheduler {
    shutdown: watch::Sender<bool>,
    jobs: Vec<(String, JoinHandle<()>)>,
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            jobs: Vec::new(),
        }
    }

    /// Parse `expression` and start the job.
    ///
    /// # Errors
    /// * `InvalidSchedule` - `expression` is not a valid cron expression
    pub fn add_job<F, Fut>(
        &mut self,
        name: impl Into<String>,
        expression: &str,
        job: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let schedule =
            Schedule::from_str(expression).map_err(|e| SchedulerError::InvalidSchedule {
                name: name.clone(),
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        let mut shutdown = self.shutdown.subscribe();
        let job_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut after = Utc::now();
            loop {
                let Some(next) = schedule.after(&after).next() else {
                    tracing::info!(job = %job_name, "Schedule has no further occurrences");
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => break,
                }

                tracing::debug!(job = %job_name, scheduled_for = %next, "Job started");
                job().await;
                tracing::debug!(job = %job_name, "Job finished");

                after = next.max(Utc::now());
            }
        });

        tracing::info!(job = %name, schedule = %expression, "Job scheduled");
        self.jobs.push((name, handle));
        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Signal every job to stop and wait up to [`SHUTDOWN_GRACE`] for
    /// in-flight runs. Jobs still running after that are aborted.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);

        let aborts: Vec<_> = self
            .jobs
            .iter()
            .map(|(name, handle)| (name.clone(), handle.abort_handle()))
            .collect();
        let handles = self.jobs.into_iter().map(|(_, handle)| handle);

        if tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles))
            .await
            .is_err()
        {
            for (name, abort) in aborts {
                if !abort.is_finished() {
                    tracing::warn!(job = %name, "Job did not finish in time, aborting");
                    abort.abort();
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

/// Register the job that mails the daily user report.
///
/// # Errors
/// * `InvalidSchedule` - `expression` is not a valid cron expression
pub fn schedule_daily_report<UR, M>(
    scheduler: &mut JobScheduler,
    expression: &str,
    service: Arc<DailyReportService<UR, M>>,
) -> Result<(), SchedulerError>
where
    UR: UserRepository,
    M: Mailer + ?Sized,
{
    scheduler.add_job("daily_report", expression, move || {
        let service = Arc::clone(&service);
        async move {
            match service.generate_and_send().await {
                Ok(report) => tracing::info!(
                    total_users = report.total_users,
                    new_users = report.new_users,
                    "Daily report sent"
                ),
                Err(e) => tracing::error!(error = %e, "Daily report failed"),
            }
        }
    })
}

/// Register the job that prunes HTTP logs older than `retention_days`.
///
/// # Errors
/// * `InvalidSchedule` - `expression` is not a valid cron expression
pub fn schedule_http_log_cleanup(
    scheduler: &mut JobScheduler,
    expression: &str,
    service: Arc<dyn HttpLogServicePort>,
    retention_days: i64,
) -> Result<(), SchedulerError> {
    scheduler.add_job("http_log_cleanup", expression, move || {
        let service = Arc::clone(&service);
        async move {
            if let Err(e) = service.cleanup_older_than(retention_days).await {
                tracing::error!(retention_days, error = %e, "HTTP log cleanup failed");
            }
        }
    })
}

/// Register the job that forgets rate limit buckets which have refilled.
///
/// # Errors
/// * `InvalidSchedule` - `expression` is not a valid cron expression
pub fn schedule_rate_limit_cleanup(
    scheduler: &mut JobScheduler,
    expression: &str,
    rate_limiter: Arc<ClientRateLimiter>,
) -> Result<(), SchedulerError> {
    scheduler.add_job("rate_limit_cleanup", expression, move || {
        let rate_limiter = Arc::clone(&rate_limiter);
        async move {
            let tracked = rate_limiter.retain_recent();
            tracing::debug!(tracked_clients = tracked, "Rate limit buckets pruned");
        }
    })
}
