//! Origin-identity rewriting.
//!
//! # Data Flow
//! ```text
//! inbound Host ──host.rs──▶ upstream Host        (request direction)
//! upstream Location ──host.rs──▶ public Location  (response direction)
//! header values, HTML ──text.rs──▶ rewritten text
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at startup, immutable at runtime
//! - Unparseable hosts pass through untouched
//! - Text rules are a plain ordered table, not an HTML rewriter

pub mod host;
pub mod text;

pub use host::{split_authority, HostParts, HostRewriter};
pub use text::{Scope, TextRewriter};

use crate::config::ProxyConfig;

/// Both rewriters, compiled from one config.
#[derive(Debug, Clone)]
pub struct Rewriter {
    pub hosts: HostRewriter,
    pub text: TextRewriter,
}

impl Rewriter {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            hosts: HostRewriter::new(&config.brand, &config.upstream)?,
            text: TextRewriter::new(&config.brand, &config.feature)?,
        })
    }
}
