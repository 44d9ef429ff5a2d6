use async_trait::async_trait;

use crate::domain::report::errors::MailError;
use crate::domain::report::models::Email;

/// Outbound mail dispatch.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Deliver an HTML email to every recipient.
    ///
    /// # Errors
    /// * `InvalidAddress` - A recipient or the sender does not parse
    /// * `Build` - Message could not be assembled
    /// * `Delivery` - Transport rejected the message
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}
