use thiserror::Error;

use crate::domain::user::errors::UserError;

/// Error for outbound mail
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    #[error("Email has no recipients")]
    NoRecipients,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Error for report generation and dispatch
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Failed to collect report data: {0}")]
    Directory(#[from] UserError),

    #[error("Failed to send report: {0}")]
    Mail(#[from] MailError),
}
