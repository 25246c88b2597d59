use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::monitor::institution::{Roster, RosterError};

const DEFAULT_PORTAL_URL: &str =
    "https://registros.condusef.gob.mx/reco/cartera_credito_institucion.php";
const DEFAULT_STATE_FILE: &str = "state/last_known_period.json";

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

/// Top-level configuration for the monitor.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalConfig,
    pub state: StateConfig,
    pub mail: MailConfig,
    pub roster: Roster,
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
            .map_err(|_| ConfigError::InvalidPort("APP_PORT"))?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let timeout = Duration::from_secs(positive_secs("MONITOR_FETCH_TIMEOUT_SECS", 30)?);
        let portal = PortalConfig {
            url: env::var("MONITOR_PORTAL_URL").unwrap_or_else(|_| DEFAULT_PORTAL_URL.to_string()),
            section: env::var("MONITOR_PORTAL_SECTION").unwrap_or_else(|_| "27".to_string()),
            currency: env::var("MONITOR_PORTAL_CURRENCY").unwrap_or_else(|_| "peso".to_string()),
            timeout,
        };

        let state = StateConfig {
            path: env::var("MONITOR_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE)),
        };

        let smtp_port = env::var("MONITOR_SMTP_PORT")
            .unwrap_or_else(|_| "465".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("MONITOR_SMTP_PORT"))?;
        let credentials = match (
            non_empty_var("MONITOR_SMTP_USER"),
            non_empty_var("MONITOR_SMTP_PASSWORD"),
        ) {
            (Some(user), Some(password)) => Some(SmtpCredentials { user, password }),
            _ => None,
        };
        let mail = MailConfig {
            recipients: parse_recipients(&env::var("MONITOR_RECIPIENTS").unwrap_or_default()),
            smtp_host: env::var("MONITOR_SMTP_HOST")
                .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port,
            credentials,
            timeout,
        };

        let roster = match non_empty_var("MONITOR_ROSTER_FILE") {
            Some(path) => Roster::from_path(&path).map_err(|source| ConfigError::Roster {
                path: PathBuf::from(path),
                source,
            })?,
            None => Roster::sofipos(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            portal,
            state,
            mail,
            roster,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = non_empty_var(name) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings controlling the feed server binding.
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Where and how the portal is queried.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub url: String,
    pub section: String,
    pub currency: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StateConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub recipients: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub credentials: Option<SmtpCredentials>,
    pub timeout: Duration,
}

/// Sender identity and secret. Only ever read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(&'static str),
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
    Roster { path: PathBuf, source: RosterError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort(name) => write!(f, "{name} must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a positive integer (got '{value}')")
            }
            ConfigError::Roster { path, source } => {
                write!(f, "could not load roster {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort(_) | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Roster { source, .. } => Some(source),
        }
    }
}
