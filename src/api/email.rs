//! Mail delivery abstraction for access-link emails.
//!
//! The core only depends on the outcome of a send: `Ok` means the message
//! was handed off, any `Err` is a uniform delivery failure. Transport is an
//! external concern; the default server wiring uses [`LogMailSender`], which
//! logs the message and reports success. That is enough for local
//! development and for deployments where a relay sidecar tails the logs.
//! Tests substitute a capturing sender and assert on the recorded outbox.

use anyhow::Result;
use tracing::info;

/// A single outbound email.
#[derive(Clone, Debug)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: String,
}

/// Mail delivery abstraction consumed by the token lifecycle.
pub trait MailSender: Send + Sync {
    /// Deliver a message or return an error to report delivery failure.
    fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Sender that logs the message instead of delivering real email.
#[derive(Clone, Debug)]
pub struct LogMailSender;

impl MailSender for LogMailSender {
    fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.body,
            "mail send stub"
        );
        Ok(())
    }
}

/// Sender that records every message for later assertions.
#[cfg(test)]
pub(crate) struct CaptureMailSender {
    outbox: std::sync::Mutex<Vec<MailMessage>>,
}

#[cfg(test)]
impl CaptureMailSender {
    pub(crate) fn new() -> Self {
        Self {
            outbox: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Messages sent so far, oldest first.
    pub(crate) fn outbox(&self) -> Vec<MailMessage> {
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .clone()
    }
}

#[cfg(test)]
impl MailSender for CaptureMailSender {
    fn send(&self, message: &MailMessage) -> Result<()> {
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .push(message.clone());
        Ok(())
    }
}
