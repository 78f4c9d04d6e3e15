//! SMTP relay transport for drip emails.

use std::time::Duration;

use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

use super::mailer::{MailError, MailSender, OutgoingEmail};
use crate::config::SmtpConfig;

/// Port that speaks TLS from the first byte; every other port upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends each message through an authenticated SMTP relay. Blocking; the drip
/// scheduler calls it from the blocking pool.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|err| MailError::Transport(err.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SEND_TIMEOUT))
            .build();

        Ok(Self { transport })
    }
}

impl MailSender for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(email)?;
        let response = self
            .transport
            .send(&message)
            .map_err(|err| MailError::Transport(err.to_string()))?;
        debug!(to = %email.to, code = %response.code(), "smtp relay accepted message");
        Ok(())
    }
}

/// `List-Unsubscribe` header pointing at the lead's one-click unsubscribe URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListUnsubscribe(String);

impl Header for ListUnsubscribe {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let url = s.trim().trim_start_matches('<').trim_end_matches('>');
        Ok(Self(url.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), format!("<{}>", self.0))
    }
}

pub(crate) fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|_| MailError::InvalidAddress(email.from.clone()))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .header(ListUnsubscribe(email.unsubscribe_url.clone()))
        .body(email.html_body.clone())
        .map_err(|err| MailError::Transport(err.to_string()))
}
