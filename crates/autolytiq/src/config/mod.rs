use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub site: SiteConfig,
    pub mail: MailConfig,
    pub drip: DripConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let database_path = env::var("APP_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("leads.db"));

        let public_url = env::var("APP_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        let admin_token = env::var("APP_ADMIN_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let transport = MailTransport::parse(
            &env::var("APP_MAIL_TRANSPORT").unwrap_or_else(|_| "none".to_string()),
        )?;
        let from = env::var("APP_MAIL_FROM")
            .unwrap_or_else(|_| "Autolytiq <hello@autolytiqs.com>".to_string());
        let smtp = SmtpConfig::from_env()?;
        if transport == MailTransport::Smtp && smtp.is_none() {
            return Err(ConfigError::MissingSmtpSetting {
                name: "APP_SMTP_HOST",
            });
        }

        let drip = DripConfig {
            enabled: parse_flag("APP_DRIP_ENABLED", true)?,
            interval: Duration::from_secs(parse_number("APP_DRIP_INTERVAL_SECS", 3600)?),
            initial_delay: Duration::from_secs(parse_number("APP_DRIP_INITIAL_DELAY_SECS", 30)?),
            batch_limit: parse_number("APP_DRIP_BATCH_LIMIT", 50)?,
        };
        if drip.interval.is_zero() {
            return Err(ConfigError::InvalidNumber {
                name: "APP_DRIP_INTERVAL_SECS",
            });
        }
        if drip.batch_limit == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "APP_DRIP_BATCH_LIMIT",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            database: DatabaseConfig {
                path: database_path,
            },
            site: SiteConfig {
                public_url,
                admin_token,
            },
            mail: MailConfig {
                transport,
                from,
                smtp,
            },
            drip,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Externally reachable base URL used in email links.
    pub public_url: String,
    /// Bearer token for `/api/v1/admin`; admin routes reject every request when unset.
    pub admin_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    /// No transport; sends fail and leads stay at their current step.
    None,
    /// Messages are written to the log and treated as delivered.
    Log,
    /// Messages are relayed through the SMTP server in [`SmtpConfig`].
    Smtp,
}

impl MailTransport {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "log" => Ok(Self::Log),
            "smtp" => Ok(Self::Smtp),
            _ => Err(ConfigError::InvalidMailTransport(value.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub from: String,
    /// Present whenever `APP_SMTP_HOST` is set, whatever the transport.
    pub smtp: Option<SmtpConfig>,
}

pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Relay settings for STARTTLS submission with plain authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = match env::var("APP_SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => host.trim().to_string(),
            _ => return Ok(None),
        };
        let port = parse_number("APP_SMTP_PORT", DEFAULT_SMTP_PORT)?;
        if port == 0 {
            return Err(ConfigError::InvalidNumber {
                name: "APP_SMTP_PORT",
            });
        }
        let username = env::var("APP_SMTP_USER")
            .map_err(|_| ConfigError::MissingSmtpSetting {
                name: "APP_SMTP_USER",
            })?;
        let password = env::var("APP_SMTP_PASS")
            .map_err(|_| ConfigError::MissingSmtpSetting {
                name: "APP_SMTP_PASS",
            })?;

        Ok(Some(Self {
            host,
            port,
            username,
            password,
        }))
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DripConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub initial_delay: Duration,
    pub batch_limit: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidMailTransport(String),
    InvalidNumber { name: &'static str },
    InvalidFlag { name: &'static str },
    MissingSmtpSetting { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'pretty', got '{value}'")
            }
            ConfigError::InvalidMailTransport(value) => {
                write!(
                    f,
                    "APP_MAIL_TRANSPORT must be 'none', 'log', or 'smtp', got '{value}'"
                )
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a positive whole number")
            }
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
            ConfigError::MissingSmtpSetting { name } => {
                write!(f, "{name} is required for SMTP delivery")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_DATABASE_PATH",
            "APP_PUBLIC_URL",
            "APP_ADMIN_TOKEN",
            "APP_MAIL_TRANSPORT",
            "APP_MAIL_FROM",
            "APP_DRIP_ENABLED",
            "APP_DRIP_INTERVAL_SECS",
            "APP_DRIP_INITIAL_DELAY_SECS",
            "APP_DRIP_BATCH_LIMIT",
            "APP_SMTP_HOST",
            "APP_SMTP_PORT",
            "APP_SMTP_USER",
            "APP_SMTP_PASS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.database.path, PathBuf::from("leads.db"));
        assert_eq!(config.site.public_url, "http://127.0.0.1:3000");
        assert!(config.site.admin_token.is_none());
        assert_eq!(config.mail.transport, MailTransport::None);
        assert!(config.mail.smtp.is_none());
        assert!(config.drip.enabled);
        assert_eq!(config.drip.interval, Duration::from_secs(3600));
        assert_eq!(config.drip.initial_delay, Duration::from_secs(30));
        assert_eq!(config.drip.batch_limit, 50);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_drip_and_mail_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PUBLIC_URL", "https://autolytiqs.com/");
        env::set_var("APP_ADMIN_TOKEN", " secret ");
        env::set_var("APP_MAIL_TRANSPORT", "LOG");
        env::set_var("APP_DRIP_ENABLED", "off");
        env::set_var("APP_DRIP_INTERVAL_SECS", "60");
        env::set_var("APP_DRIP_BATCH_LIMIT", "5");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.site.public_url, "https://autolytiqs.com");
        assert_eq!(config.site.admin_token.as_deref(), Some("secret"));
        assert_eq!(config.mail.transport, MailTransport::Log);
        assert!(!config.drip.enabled);
        assert_eq!(config.drip.interval, Duration::from_secs(60));
        assert_eq!(config.drip.batch_limit, 5);
        reset_env();
    }

    #[test]
    fn rejects_unknown_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAIL_TRANSPORT", "carrier-pigeon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidMailTransport(_))
        ));

        reset_env();
        env::set_var("APP_DRIP_INTERVAL_SECS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                name: "APP_DRIP_INTERVAL_SECS"
            })
        ));

        reset_env();
        env::set_var("APP_DRIP_BATCH_LIMIT", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                name: "APP_DRIP_BATCH_LIMIT"
            })
        ));
        reset_env();
    }

    #[test]
    fn reads_smtp_relay_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAIL_TRANSPORT", "smtp");
        env::set_var("APP_SMTP_HOST", " smtp.example.com ");
        env::set_var("APP_SMTP_USER", "mailer");
        env::set_var("APP_SMTP_PASS", "hunter2");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.mail.transport, MailTransport::Smtp);
        let smtp = config.mail.smtp.expect("smtp settings");
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, DEFAULT_SMTP_PORT);
        assert_eq!(smtp.username, "mailer");
        assert!(!format!("{smtp:?}").contains("hunter2"));

        env::set_var("APP_SMTP_PORT", "465");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.mail.smtp.map(|smtp| smtp.port), Some(465));
        reset_env();
    }

    #[test]
    fn smtp_transport_requires_complete_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAIL_TRANSPORT", "smtp");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingSmtpSetting {
                name: "APP_SMTP_HOST"
            })
        ));

        env::set_var("APP_SMTP_HOST", "smtp.example.com");
        env::set_var("APP_SMTP_USER", "mailer");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingSmtpSetting {
                name: "APP_SMTP_PASS"
            })
        ));

        env::set_var("APP_SMTP_PASS", "hunter2");
        env::set_var("APP_SMTP_PORT", "submission");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                name: "APP_SMTP_PORT"
            })
        ));
        reset_env();
    }
}
