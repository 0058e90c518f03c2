//! Gateway configuration
//!
//! Values come from built-in defaults, then an optional config file, then
//! `USSD_`-prefixed environment variables (`USSD_BIND_ADDRESS`,
//! `USSD_SESSION_TTL_SECS`, ...), later sources winning.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use rvoip_ussd_core::{EngineConfig, StoreConfig};

use crate::error::{GatewayError, Result};
use crate::logging::parse_log_level;

/// Prefix of environment variables read by [`GatewayConfig::load`].
pub const ENV_PREFIX: &str = "USSD";

/// Upper bound for `session_ttl_secs`. USSD aggregators drop a dialog after
/// a few minutes, so a day is already far beyond any live session.
pub const MAX_SESSION_TTL_SECS: i64 = 86_400;
/// Upper bound for `sweep_interval_secs`.
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the HTTP listener binds to
    pub bind_address: String,
    /// Idle lifetime of a session, in seconds
    pub session_ttl_secs: i64,
    /// Period of the expired-session sweep, in seconds; 0 disables it
    pub sweep_interval_secs: u64,
    /// Serialize concurrent calls sharing a session id
    pub serialize_sessions: bool,
    pub log_level: String,
    pub json_logs: bool,
    /// Include file and line in log events
    pub log_source_location: bool,
    /// Log each HTTP request span when it closes
    pub log_request_spans: bool,
    /// Shared secret for aggregator request signatures; unsigned when absent
    pub hmac_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            session_ttl_secs: 60,
            sweep_interval_secs: 60,
            serialize_sessions: false,
            log_level: "info".to_string(),
            json_logs: false,
            log_source_location: false,
            log_request_spans: false,
            hmac_secret: None,
        }
    }
}

impl GatewayConfig {
    /// Load from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        Self::finish(builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)))
    }

    /// Load from TOML text only, ignoring the environment.
    pub fn from_toml(source: &str) -> Result<Self> {
        Self::finish(config::Config::builder().add_source(File::from_str(source, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs <= 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(GatewayError::Config(format!(
                "session_ttl_secs must be in 1..={}, got {}",
                MAX_SESSION_TTL_SECS, self.session_ttl_secs
            )));
        }
        if self.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS {
            return Err(GatewayError::Config(format!(
                "sweep_interval_secs must be at most {}, got {}",
                MAX_SWEEP_INTERVAL_SECS, self.sweep_interval_secs
            )));
        }
        self.socket_addr()?;
        parse_log_level(&self.log_level)?;
        if matches!(&self.hmac_secret, Some(secret) if secret.is_empty()) {
            return Err(GatewayError::Config("hmac_secret must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid bind_address {:?}: {}", self.bind_address, e)))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs.clamp(1, MAX_SESSION_TTL_SECS) as u64)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_session_ttl(self.session_ttl())
            .with_session_serialization(self.serialize_sessions)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_default_ttl(self.session_ttl())
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs.min(MAX_SWEEP_INTERVAL_SECS)))
    }
}
