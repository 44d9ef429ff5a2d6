use chrono::DateTime;
use chrono::Utc;

use crate::domain::report::errors::MailError;

/// Outbound HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

impl Email {
    /// # Errors
    /// * `NoRecipients` - `to` is empty or only blank entries
    pub fn new(to: Vec<String>, subject: String, html_body: String) -> Result<Self, MailError> {
        let to: Vec<String> = to
            .into_iter()
            .map(|address| address.trim().to_string())
            .filter(|address| !address.is_empty())
            .collect();

        if to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        Ok(Self {
            to,
            subject,
            html_body,
        })
    }
}

/// User activity summary mailed once a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    pub total_users: i64,
    pub new_users: i64,
    pub generated_at: DateTime<Utc>,
}

impl DailyReport {
    pub fn subject(&self) -> String {
        format!("Daily Report - {}", self.generated_at.format("%Y-%m-%d"))
    }

    pub fn render_html(&self) -> String {
        format!(
            concat!(
                "<html><body>",
                "<h2>Daily Report</h2>",
                "<p>Generated at {generated_at}</p>",
                "<table>",
                "<tr><td>New users (last 24h)</td><td>{new_users}</td></tr>",
                "<tr><td>Total users</td><td>{total_users}</td></tr>",
                "</table>",
                "</body></html>"
            ),
            generated_at = self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            new_users = self.new_users,
            total_users = self.total_users,
        )
    }
}
