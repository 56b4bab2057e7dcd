//! SMTP delivery for notifications.
//!
//! Plaintext submission to a local relay with no authentication. A new
//! connection is opened for every message and closed after it; nothing is
//! pooled across packagers.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info};

use crate::contract::{Mailer, NotificationEmail};
use crate::error::NotifyError;

pub struct SmtpMailer {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        SmtpMailer {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn relay(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
}

/// Turns a composed notification into an RFC 5322 message.
pub fn build_message(email: &NotificationEmail) -> Result<Message, NotifyError> {
    Message::builder()
        .from(mailbox(&email.from_address)?)
        .to(mailbox(&email.to_address)?)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| NotifyError::MailTransport(format!("failed to build message: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &NotificationEmail) -> Result<(), NotifyError> {
        let message = build_message(email)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host.as_str())
            .port(self.port)
            .timeout(Some(self.timeout))
            .build();

        debug!(relay = %self.relay(), to = %email.to_address, "[MAIL] Submitting message");
        match transport.send(message).await {
            Ok(response) => {
                info!(relay = %self.relay(), to = %email.to_address, code = %response.code(), "[MAIL] Message accepted");
                Ok(())
            }
            Err(e) => {
                error!(relay = %self.relay(), to = %email.to_address, error = %e, "[MAIL][ERROR] Submission failed");
                Err(NotifyError::from(e))
            }
        }
    }
}
