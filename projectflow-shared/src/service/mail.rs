/// Outgoing mail
///
/// The services only need to hand a message to something that delivers
/// it. [`LogMailer`] writes messages to the log, which is enough for local
/// development; [`MemoryMailer`] keeps them for tests to inspect.
///
/// # Example
///
/// ```
/// use projectflow_shared::service::mail::{MailMessage, Mailer, MemoryMailer};
///
/// # async fn example() -> Result<(), projectflow_shared::service::mail::MailError> {
/// let mailer = MemoryMailer::new();
/// mailer.send(MailMessage {
///     to: "ada@example.com".to_string(),
///     subject: "Hello".to_string(),
///     body: "Hi Ada".to_string(),
/// }).await?;
///
/// assert_eq!(mailer.sent().len(), 1);
/// # Ok(())
/// # }
/// ```

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Account confirmation mail with a link carrying `token`
    pub fn confirmation(to: &str, name: &str, client_url: &str, token: &str) -> Self {
        let link = format!(
            "{}/confirmation?token={}",
            client_url.trim_end_matches('/'),
            token
        );

        Self {
            to: to.to_string(),
            subject: "Confirm your ProjectFlow account".to_string(),
            body: format!(
                "Hi {},\n\nConfirm your email address by opening the link below:\n\n{}\n",
                name, link
            ),
        }
    }
}

/// Delivers mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Mailer that writes every message to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Mail (log delivery)"
        );
        Ok(())
    }
}

/// Mailer that records messages in memory
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<MailMessage>>,
    failing: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            failing: true,
        }
    }

    /// Messages delivered so far
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recent message sent to `to`
    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Delivery("mailer is set to fail".to_string()));
        }

        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
        Ok(())
    }
}

/// Pulls the `token` query value out of a confirmation mail
pub fn confirmation_token(message: &MailMessage) -> Option<&str> {
    let start = message.body.find("token=")? + "token=".len();
    message.body[start..].split_whitespace().next()
}
