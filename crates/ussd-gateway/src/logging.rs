//! Subscriber setup for the gateway binary

use std::net::SocketAddr;
use std::str::FromStr;

use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// Crates whose per-connection chatter is capped at `warn` unless `RUST_LOG`
/// asks for more.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "mio"];

/// How log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for terminals
    Pretty,
    /// One JSON object per line, for aggregator log shipping
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Add file and line to each event
    pub source_location: bool,
    /// Emit an event when an HTTP request span closes, with its duration
    pub request_spans: bool,
}

impl LoggingConfig {
    pub fn from_gateway(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            level: parse_log_level(&config.log_level)?,
            format: if config.json_logs { LogFormat::Json } else { LogFormat::Pretty },
            source_location: config.log_source_location,
            request_spans: config.log_request_spans,
        })
    }

    /// Filter directives applied when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        let mut directives = vec![level];
        if self.level > Level::WARN {
            directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
        }
        directives.join(",")
    }

    fn filter(&self) -> Result<EnvFilter> {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
            _ => EnvFilter::try_new(self.default_directives()),
        }
        .map_err(|e| GatewayError::Logging(format!("Invalid log filter: {}", e)))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the configured level entirely. Fails if a
/// global subscriber is already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let span_events = if config.request_spans { FmtSpan::CLOSE } else { FmtSpan::NONE };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(config.filter()?)
        .with_span_events(span_events)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Json => subscriber.with_writer(std::io::stdout).json().try_init(),
        LogFormat::Pretty => subscriber.try_init(),
    };
    installed.map_err(|e| GatewayError::Logging(e.to_string()))
}

pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim())
        .map_err(|_| GatewayError::Config(format!("Invalid log level: {}", level)))
}

/// One startup line carrying the effective settings.
pub fn log_startup(config: &GatewayConfig, addr: SocketAddr) {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        session_ttl_secs = config.session_ttl_secs,
        sweep_interval_secs = config.sweep_interval_secs,
        serialize_sessions = config.serialize_sessions,
        signed = config.hmac_secret.is_some(),
        "USSD gateway starting"
    );
}
