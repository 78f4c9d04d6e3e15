//! Eight-step email sequence delivered to new subscribers over eight weeks.

pub mod content;
pub mod mailer;
pub mod schedule;
pub mod scheduler;
pub mod smtp;

pub use content::{unsubscribe_url, DripEmail, DripSequence, RenderedEmail};
pub use mailer::{LogMailer, MailError, MailSender, OutboxMailer, OutgoingEmail, UnconfiguredMailer};
pub use schedule::{DelaySchedule, ScheduleError, STANDARD_DELAY_DAYS};
pub use scheduler::{
    DripCadence, DripError, DripPreview, DripRunSummary, DripScheduler, DripSettings,
    DEFAULT_BATCH_LIMIT,
};
pub use smtp::SmtpMailer;
