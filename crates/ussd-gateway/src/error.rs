use thiserror::Error;

/// Errors raised while configuring or running the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        GatewayError::Config(err.to_string())
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
