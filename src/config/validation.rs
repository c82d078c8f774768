//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate brand labels, schemes and paths
//! - Check the metrics address when metrics are enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a config, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, label) in [
        ("brand.origin_label", &config.brand.origin_label),
        ("brand.public_label", &config.brand.public_label),
    ] {
        if !is_label(label) {
            errors.push(ValidationError::new(
                field,
                format!("{label:?} must be a non-empty lowercase label"),
            ));
        }
    }
    if config.brand.public_name.is_empty() {
        errors.push(ValidationError::new("brand.public_name", "must not be empty"));
    }

    for (field, scheme) in [
        ("upstream.scheme", &config.upstream.scheme),
        ("public.scheme", &config.public.scheme),
    ] {
        if scheme != "http" && scheme != "https" {
            errors.push(ValidationError::new(
                field,
                format!("{scheme:?} is not http or https"),
            ));
        }
    }

    if config.upstream.domain.is_empty() {
        errors.push(ValidationError::new("upstream.domain", "must not be empty"));
    }
    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be > 0"));
    }

    if config.feature.enabled {
        if !config.feature.trigger_path.starts_with('/') {
            errors.push(ValidationError::new(
                "feature.trigger_path",
                "must start with '/'",
            ));
        }
        if config.feature.term.is_empty() {
            errors.push(ValidationError::new("feature.term", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "{:?} is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
