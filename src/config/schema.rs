//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Origin the proxy forwards to.
    pub upstream: UpstreamConfig,

    /// Brand labels and names used by host and text rewriting.
    pub brand: BrandConfig,

    /// Feature-triggered request shaping.
    pub feature: FeatureConfig,

    /// Local static overrides.
    pub overrides: OverridesConfig,

    /// How the proxy presents itself to clients.
    pub public: PublicConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind. Overridden by the `PORT` environment variable.
    pub port: u16,
}

impl ListenerConfig {
    /// Bind address in `host:port` form.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 42222,
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme used for every upstream request.
    pub scheme: String,

    /// Canonical domain that replaces the recognized service label and extension.
    pub domain: String,

    /// Keep the client's port on the upstream host.
    pub preserve_port: bool,

    /// Deadline around the outbound call, in seconds. None waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Pinned DNS entries (host -> address), bypassing the system resolver.
    pub resolve: HashMap<String, SocketAddr>,

    /// Honor HTTP_PROXY/HTTPS_PROXY for upstream traffic.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            domain: "google.com".to_string(),
            preserve_port: true,
            timeout_secs: None,
            resolve: HashMap::new(),
            use_system_proxy: true,
        }
    }
}

/// Brand configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrandConfig {
    /// Origin's service label as it appears in hostnames.
    pub origin_label: String,

    /// Proxy's own service label.
    pub public_label: String,

    /// Display name substituted for the origin's brand in page text.
    pub public_name: String,

    /// Literal domain suffixes (after `<origin_label>.`) also treated as origin domains.
    pub origin_domain_suffixes: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            origin_label: "google".to_string(),
            public_label: "doogle".to_string(),
            public_name: "Doogle".to_string(),
            origin_domain_suffixes: vec!["off.ai".to_string()],
        }
    }
}

/// Request shaping triggered by one fixed path.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Enable the trigger.
    pub enabled: bool,

    /// Path that triggers the feature (compared case-insensitively).
    pub trigger_path: String,

    /// Query string that replaces the outbound query on trigger.
    pub query: String,

    /// Secondary term replaced with the public brand name on trigger.
    pub term: String,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_path: "/search".to_string(),
            query: "q=beagle&tbm=isch".to_string(),
            term: "beagle".to_string(),
        }
    }
}

/// Static override configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OverridesConfig {
    /// Consult overrides before proxying.
    pub enabled: bool,

    /// Override root, relative to the working directory unless absolute.
    pub directory: PathBuf,
}

impl Default for OverridesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("overrides"),
        }
    }
}

/// Outward-facing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublicConfig {
    /// Scheme forced onto rewritten redirect targets.
    pub scheme: String,

    /// Prefer an inbound `x-forwarded-proto` over `scheme`.
    pub trust_forwarded_proto: bool,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            trust_forwarded_proto: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
