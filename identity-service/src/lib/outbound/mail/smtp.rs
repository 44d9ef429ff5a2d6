use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;

use crate::config::EmailConfig;
use crate::domain::report::errors::MailError;
use crate::domain::report::models::Email;
use crate::domain::report::ports::Mailer;

/// SMTP mailer on a pooled async transport.
///
/// With credentials configured the connection is upgraded with STARTTLS.
/// Without them it talks plain SMTP, which suits local catch-all servers.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// # Errors
    /// * `InvalidAddress` - `from` does not parse
    /// * `Build` - TLS setup for the relay failed
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.from)?;

        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailError::Build(e.to_string()))?
                .port(config.smtp_port)
                .credentials(Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.clone(),
                ))
                .build()
        };

        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &Email) -> Result<Message, MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML);

        for recipient in &email.to {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        builder
            .body(email.html_body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress(format!("{}: {}", address, e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        tracing::info!(
            recipients = email.to.len(),
            subject = %email.subject,
            "Email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(username: &str) -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: username.to_string(),
            smtp_password: String::new(),
            from: "Identity <noreply@example.com>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_build_message() {
        let mailer = SmtpMailer::new(&config("")).unwrap();
        let email = Email::new(
            vec!["ada@example.com".to_string(), "bob@example.com".to_string()],
            "Hello".to_string(),
            "<p>Hi</p>".to_string(),
        )
        .unwrap();

        let message = mailer.build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("ada@example.com"));
        assert!(raw.contains("bob@example.com"));
        assert!(raw.contains("text/html"));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mailer = SmtpMailer::new(&config("")).unwrap();
        let email = Email::new(
            vec!["not an address".to_string()],
            "Hello".to_string(),
            "<p>Hi</p>".to_string(),
        )
        .unwrap();

        assert!(matches!(
            mailer.build_message(&email),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_invalid_sender() {
        let mut config = config("");
        config.from = "nope".to_string();

        assert!(matches!(
            SmtpMailer::new(&config),
            Err(MailError::InvalidAddress(_))
        ));
    }
}
