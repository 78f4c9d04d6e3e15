use autolytiq::config::{AppConfig, ConfigError, MailConfig, MailTransport};
use autolytiq::drip::{
    DripCadence, DripScheduler, DripSettings, LogMailer, MailSender, SmtpMailer,
    UnconfiguredMailer,
};
use autolytiq::error::AppError;
use autolytiq::leads::SqliteStore;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type Drip = DripScheduler<SqliteStore, dyn MailSender>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_mailer(mail: &MailConfig) -> Result<Arc<dyn MailSender>, AppError> {
    match mail.transport {
        MailTransport::Smtp => {
            let smtp = mail.smtp.as_ref().ok_or(ConfigError::MissingSmtpSetting {
                name: "APP_SMTP_HOST",
            })?;
            info!(host = %smtp.host, port = smtp.port, "drip emails relayed over smtp");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        MailTransport::Log => {
            warn!("mail transport is 'log'; drip emails are logged, not delivered");
            Ok(Arc::new(LogMailer))
        }
        MailTransport::None => {
            warn!("no mail transport configured; drip emails will not be sent");
            Ok(Arc::new(UnconfiguredMailer))
        }
    }
}

pub(crate) fn build_drip(
    config: &AppConfig,
    store: Arc<SqliteStore>,
) -> Result<Arc<Drip>, AppError> {
    let settings = DripSettings {
        batch_limit: config.drip.batch_limit,
        public_url: config.site.public_url.clone(),
        from: config.mail.from.clone(),
    };
    Ok(Arc::new(DripScheduler::new(
        store,
        build_mailer(&config.mail)?,
        settings,
    )))
}

pub(crate) fn drip_cadence(config: &AppConfig) -> DripCadence {
    DripCadence {
        initial_delay: config.drip.initial_delay,
        interval: config.drip.interval,
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
