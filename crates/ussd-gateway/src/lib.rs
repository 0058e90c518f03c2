//! # USSD Gateway
//!
//! HTTP front door for [`rvoip_ussd_core`]. Network aggregators call back
//! over HTTP with their own field names and response formats; the adapters
//! here normalize those callbacks into engine requests and render replies
//! the way each vendor expects:
//!
//! - [`FormAdapter`]: form-encoded callbacks (Africa's Talking, Infobip,
//!   generic alias-tolerant)
//! - [`JsonAdapter`]: JSON callbacks (Vodacom, configurable key mapping)
//! - [`GatewayBuilder`]: mounts adapters on paths into an axum router
//! - [`GatewayServer`]: listener lifecycle with graceful shutdown
//!
//! Configuration is loaded by [`GatewayConfig`] and logging is installed
//! with [`setup_logging`].

pub mod adapters;
pub mod codec;
pub mod config;
pub mod demo;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod server;

pub use adapters::{FormAdapter, FormFields, JsonAdapter, JsonFields, JsonReplyShape};
pub use codec::{decode, encode};
pub use crate::config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::GatewayBuilder;
pub use logging::{log_startup, parse_log_level, setup_logging, LogFormat, LoggingConfig};
pub use server::GatewayServer;
