//! Hostname decomposition and rewriting.
//!
//! A recognized hostname has the shape `[subdomain.]name[extension][:port]`
//! where `name` is the origin label, the public label, or `localhost`, and
//! `extension` may span several labels (`.co.uk`). Anything else is
//! unparseable and every rewrite below returns it unchanged.

use regex::Regex;

use crate::config::{BrandConfig, UpstreamConfig};

/// The four captured parts of a recognized hostname.
///
/// Absent parts are empty strings. `subdomain` keeps its trailing dot and
/// `port` its leading colon, so the parts concatenate back to the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostParts<'a> {
    pub subdomain: &'a str,
    pub name: &'a str,
    pub extension: &'a str,
    pub port: &'a str,
}

impl HostParts<'_> {
    /// `name` + `extension` + `port`.
    pub fn base(&self) -> String {
        format!("{}{}{}", self.name, self.extension, self.port)
    }
}

/// Compiled host pattern plus the upstream naming rules.
#[derive(Debug, Clone)]
pub struct HostRewriter {
    pattern: Regex,
    upstream_domain: String,
    preserve_port: bool,
}

impl HostRewriter {
    pub fn new(brand: &BrandConfig, upstream: &UpstreamConfig) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"^(?P<subdomain>.+?\.)?(?P<name>{}|{}|localhost)(?P<extension>(?:\.[a-z-]+)+)?(?P<port>:\d{{1,5}})?$",
            regex::escape(&brand.origin_label),
            regex::escape(&brand.public_label),
        ))?;

        Ok(Self {
            pattern,
            upstream_domain: upstream.domain.clone(),
            preserve_port: upstream.preserve_port,
        })
    }

    /// Decompose `host`. `None` means "leave the input alone".
    pub fn parse<'a>(&self, host: &'a str) -> Option<HostParts<'a>> {
        let caps = self.pattern.captures(host)?;
        let part = |name| caps.name(name).map_or("", |m| m.as_str());

        Some(HostParts {
            subdomain: part("subdomain"),
            name: part("name"),
            extension: part("extension"),
            port: part("port"),
        })
    }

    /// Map a public host to the upstream host: the subdomain is kept, name and
    /// extension become the upstream domain.
    pub fn to_upstream(&self, public_host: &str) -> String {
        match self.parse(public_host) {
            Some(parts) => {
                let port = if self.preserve_port { parts.port } else { "" };
                format!("{}{}{}", parts.subdomain, self.upstream_domain, port)
            }
            None => public_host.to_string(),
        }
    }

    /// Map an upstream host back to what the client sees: the upstream
    /// subdomain on top of `template`'s base host.
    pub fn to_public(&self, upstream_host: &str, template: &str) -> String {
        match self.parse(upstream_host) {
            Some(parts) => format!("{}{}", parts.subdomain, self.base_host(template)),
            None => upstream_host.to_string(),
        }
    }

    /// `host` without its subdomain.
    pub fn base_host(&self, host: &str) -> String {
        match self.parse(host) {
            Some(parts) => parts.base(),
            None => host.to_string(),
        }
    }

    /// Take the subdomain of `source` and put it on `target`'s name, extension
    /// and port. `None` when either side is unparseable.
    pub fn transplant_subdomain(&self, source: &str, target: &str) -> Option<String> {
        let source = self.parse(source)?;
        let target = self.parse(target)?;
        Some(format!("{}{}", source.subdomain, target.base()))
    }
}

/// Split `host[:port]` into its host and numeric port.
pub fn split_authority(authority: &str) -> (&str, Option<u16>) {
    match authority.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (authority, None),
        },
        _ => (authority, None),
    }
}
