//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Compile rewriters and build the upstream client
//! - Bind the listener last, once everything else is ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal

use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, ProxyConfig};

/// Anything that stops the proxy from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("cannot determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),
}

/// Load the config from `path` (or defaults) plus the environment.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, StartupError> {
    Ok(load_config(path)?)
}

/// Bind the configured listener.
pub async fn bind(config: &ProxyConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}
