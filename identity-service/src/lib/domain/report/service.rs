use std::sync::Arc;

use chrono::Duration;
use chrono::Utc;

use crate::domain::report::errors::ReportError;
use crate::domain::report::models::DailyReport;
use crate::domain::report::models::Email;
use crate::domain::report::ports::Mailer;
use crate::domain::user::ports::UserRepository;

/// Builds the daily user report and mails it to the configured recipients.
pub struct DailyReportService<UR, M>
where
    UR: UserRepository,
    M: Mailer + ?Sized,
{
    repository: Arc<UR>,
    mailer: Arc<M>,
    recipients: Vec<String>,
}

impl<UR, M> DailyReportService<UR, M>
where
    UR: UserRepository,
    M: Mailer + ?Sized,
{
    pub fn new(repository: Arc<UR>, mailer: Arc<M>, recipients: Vec<String>) -> Self {
        Self {
            repository,
            mailer,
            recipients,
        }
    }

    /// Collect counts from the user directory.
    ///
    /// # Errors
    /// * `Directory` - A count query failed
    pub async fn generate(&self) -> Result<DailyReport, ReportError> {
        let now = Utc::now();
        let total_users = self.repository.count_active().await?;
        let new_users = self
            .repository
            .count_created_since(now - Duration::hours(24))
            .await?;

        Ok(DailyReport {
            total_users,
            new_users,
            generated_at: now,
        })
    }

    /// Generate the report and send it.
    ///
    /// # Errors
    /// * `Directory` - A count query failed
    /// * `Mail` - No recipients configured or delivery failed
    pub async fn generate_and_send(&self) -> Result<DailyReport, ReportError> {
        let report = self.generate().await?;
        let email = Email::new(
            self.recipients.clone(),
            report.subject(),
            report.render_html(),
        )?;

        self.mailer.send(&email).await?;
        tracing::info!(
            recipients = email.to.len(),
            total_users = report.total_users,
            new_users = report.new_users,
            "Daily report sent"
        );

        Ok(report)
    }
}
