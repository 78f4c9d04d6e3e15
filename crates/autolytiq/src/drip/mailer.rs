use std::collections::HashSet;
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

pub const DEFAULT_FROM: &str = "Autolytiq <hello@autolytiqs.com>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    /// Advertised in the `List-Unsubscribe` header by real transports.
    pub unsubscribe_url: String,
}

/// Outbound mail transport. Implementations must not retry internally; the
/// drip scheduler retries unsent steps on its next tick.
pub trait MailSender: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    #[error("mail transport not configured")]
    NotConfigured,
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("invalid mailbox address: {0}")]
    InvalidAddress(String),
}

/// Used when no transport is configured; every send fails so no lead advances.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredMailer;

impl MailSender for UnconfiguredMailer {
    fn send(&self, _email: &OutgoingEmail) -> Result<(), MailError> {
        Err(MailError::NotConfigured)
    }
}

/// Dry-run transport that records each message in the log and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl MailSender for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            to = %email.to,
            from = %email.from,
            subject = %email.subject,
            bytes = email.html_body.len(),
            "mail delivered to log transport"
        );
        Ok(())
    }
}

/// In-memory transport that keeps every delivered message.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    rejected: Mutex<HashSet<String>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later send to `address` fail with a transport error.
    pub fn reject(&self, address: &str) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.insert(address.to_string());
        }
    }

    pub fn accept(&self, address: &str) {
        if let Ok(mut rejected) = self.rejected.lock() {
            rejected.remove(address);
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == address)
            .collect()
    }
}

impl MailSender for OutboxMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let rejected = self
            .rejected
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?;
        if rejected.contains(&email.to) {
            return Err(MailError::Transport(format!("recipient {} rejected", email.to)));
        }
        drop(rejected);

        self.sent
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?
            .push(email.clone());
        Ok(())
    }
}
