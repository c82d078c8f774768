//! Upstream request shaping.
//!
//! # Responsibilities
//! - Derive the upstream URL from the inbound URI and public host
//! - Apply the feature trigger's fixed query
//! - Copy headers, dropping hop-by-hop ones, `host` and `accept-encoding`
//! - Rewrite `origin` and `referer` onto the upstream host
//!
//! # Design Decisions
//! - `origin`/`referer` get the upstream request's host with their own
//!   subdomain, as if they were always same-origin
//! - `accept-encoding` is left to the client so it can decompress

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Uri;
use url::Url;

use crate::config::{FeatureConfig, ProxyConfig};
use crate::http::error::ProxyError;
use crate::rewrite::{split_authority, HostRewriter};

/// Headers that describe one hop and never cross the proxy.
pub const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Host the client addressed, lower-cased. HTTP/2 carries it in the URI.
pub fn public_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .filter(|h| !h.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Whether `path` is the feature trigger.
pub fn is_feature_request(feature: &FeatureConfig, path: &str) -> bool {
    feature.enabled && path.eq_ignore_ascii_case(&feature.trigger_path)
}

/// Absolute upstream URL for an inbound request.
pub fn upstream_url(
    config: &ProxyConfig,
    hosts: &HostRewriter,
    uri: &Uri,
    public_host: &str,
) -> Result<Url, ProxyError> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let raw = format!(
        "{}://{}{}",
        config.upstream.scheme,
        hosts.to_upstream(public_host),
        path_and_query
    );

    let mut url = Url::parse(&raw).map_err(|source| ProxyError::UpstreamUrl {
        url: raw.clone(),
        source,
    })?;
    if is_feature_request(&config.feature, uri.path()) {
        url.set_query(Some(&config.feature.query));
    }
    Ok(url)
}

/// Headers for the upstream request.
pub fn upstream_headers(
    hosts: &HostRewriter,
    inbound: &HeaderMap,
    upstream: &Url,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || name == header::HOST || name == header::ACCEPT_ENCODING {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    for name in [header::ORIGIN, header::REFERER] {
        let Some(value) = inbound.get(&name) else {
            continue;
        };
        let value = value
            .to_str()
            .map_err(|e| ProxyError::UpstreamRequestBuild(format!("{name}: {e}")))?;
        let rewritten = transplant_url(hosts, value, upstream, name == header::ORIGIN)?;
        let rewritten = HeaderValue::from_str(&rewritten)
            .map_err(|e| ProxyError::UpstreamRequestBuild(format!("{name}: {e}")))?;
        headers.insert(name, rewritten);
    }

    Ok(headers)
}

/// Re-home `value` onto `base`: `base`'s scheme, name, extension and port
/// with `value`'s own subdomain. Values whose host is unrecognized keep it,
/// and values that are not absolute URLs (`Origin: null`) pass unchanged.
fn transplant_url(
    hosts: &HostRewriter,
    value: &str,
    base: &Url,
    origin_only: bool,
) -> Result<String, ProxyError> {
    let Ok(mut url) = Url::parse(value) else {
        return Ok(value.to_string());
    };

    // Scheme changes between special and non-special schemes are refused;
    // such values keep their own.
    let _ = url.set_scheme(base.scheme());

    if let (Some(source), Some(target)) = (authority(&url), authority(base)) {
        if let Some(host) = hosts.transplant_subdomain(&source, &target) {
            let (host, port) = split_authority(&host);
            url.set_host(Some(host))
                .map_err(|source| ProxyError::UpstreamUrl {
                    url: value.to_string(),
                    source,
                })?;
            let _ = url.set_port(port);
        }
    }

    Ok(if origin_only {
        url.origin().ascii_serialization()
    } else {
        url.to_string()
    })
}

/// `host[:port]` of a URL, the way it appears in a Host header.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
