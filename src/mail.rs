//! Outbound mail.
//!
//! Delivery is an external collaborator behind [`Mailer`]. The binary ships
//! with [`LogMailer`], which only records the dispatch.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to deliver mail: {0}")]
    Delivery(String),
    #[error("Mail delivery timed out")]
    Timeout,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Build the verification mail for a freshly issued code.
pub fn verification_message(email: &str, code: &str) -> MailMessage {
    MailMessage {
        to: email.to_string(),
        subject: "[studyhall] Email verification code".to_string(),
        body: format!(
            "Your verification code is {code}.\n\
             Enter it within 3 minutes to activate your account."
        ),
    }
}

/// Mailer that writes each message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Mail dispatched (log only)"
        );
        Ok(())
    }
}
