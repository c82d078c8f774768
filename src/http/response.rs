//! Response handling and transformation.
//!
//! # Responsibilities
//! - Run the domain pass over every upstream header value
//! - Point absolute `location` targets back at the client's host
//! - Decide between rewriting (HTML) and streaming (everything else)
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically
//! - Header values are handled as bytes; no UTF-8 requirement

use axum::http::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::http::error::ProxyError;
use crate::http::request::{authority, is_hop_by_hop};
use crate::rewrite::{split_authority, Rewriter};

/// Copy upstream headers for the client, applying the domain pass.
pub fn rewrite_headers(rewriter: &Rewriter, upstream: &HeaderMap, base_host: &str) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name) {
            continue;
        }
        let rewritten = rewriter.text.rewrite_header(value.as_bytes(), base_host);
        // The domain pass only ever inserts host text, so this holds unless
        // the configured brand itself is not header-safe.
        let value = HeaderValue::from_bytes(&rewritten).unwrap_or_else(|_| value.clone());
        headers.append(name.clone(), value);
    }
    headers
}

/// Rewrite an upstream `location` for the client.
///
/// Relative targets come back unchanged. Absolute ones get `scheme` and the
/// upstream subdomain on top of the client's base host.
pub fn rewrite_location(
    rewriter: &Rewriter,
    location: &str,
    public_host: &str,
    scheme: &str,
) -> Result<Option<String>, ProxyError> {
    let mut url = match Url::parse(location) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => return Ok(None),
        Err(source) => {
            return Err(ProxyError::UpstreamUrl {
                url: location.to_string(),
                source,
            })
        }
    };

    let _ = url.set_scheme(scheme);

    if let Some(upstream_host) = authority(&url) {
        let host = rewriter.hosts.to_public(&upstream_host, public_host);
        let (host, port) = split_authority(&host);
        url.set_host(Some(host))
            .map_err(|source| ProxyError::UpstreamUrl {
                url: location.to_string(),
                source,
            })?;
        let _ = url.set_port(port);
    }

    Ok(Some(url.to_string()))
}

/// Whether the body gets the text passes.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    fn rewriter() -> Rewriter {
        Rewriter::from_config(&ProxyConfig::default()).unwrap()
    }

    #[test]
    fn test_headers_get_domain_pass() {
        let mut upstream = HeaderMap::new();
        upstream.append(
            header::SET_COOKIE,
            HeaderValue::from_static("a=1; Domain=.google.com"),
        );
        upstream.append(
            header::SET_COOKIE,
            HeaderValue::from_static("b=2; Domain=.google.co.uk"),
        );
        upstream.insert(header::SERVER, HeaderValue::from_static("Google Frontend"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let headers = rewrite_headers(&rewriter(), &upstream, "doogle.com");

        let cookies: Vec<_> = headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1; Domain=.doogle.com", "b=2; Domain=.doogle.com"]);
        assert_eq!(headers[header::SERVER], "Google Frontend");
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
    }

    #[test]
    fn test_location_host_and_scheme() {
        let location = rewrite_location(
            &rewriter(),
            "https://sub.google.com/x?y=1",
            "www.doogle.com:42222",
            "http",
        )
        .unwrap();
        assert_eq!(location.as_deref(), Some("http://sub.doogle.com:42222/x?y=1"));
    }

    #[test]
    fn test_location_without_subdomain() {
        let location =
            rewrite_location(&rewriter(), "https://google.com/", "doogle.co.uk", "https").unwrap();
        assert_eq!(location.as_deref(), Some("https://doogle.co.uk/"));
    }

    #[test]
    fn test_location_foreign_host_kept() {
        let location = rewrite_location(
            &rewriter(),
            "https://accounts.example.org/login",
            "doogle.com",
            "http",
        )
        .unwrap();
        assert_eq!(location.as_deref(), Some("http://accounts.example.org/login"));
    }

    #[test]
    fn test_relative_location_untouched() {
        assert_eq!(
            rewrite_location(&rewriter(), "/search?q=1", "doogle.com", "http").unwrap(),
            None
        );
    }

    #[test]
    fn test_is_html() {
        let mut headers = HeaderMap::new();
        assert!(!is_html(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Text/HTML; charset=UTF-8"),
        );
        assert!(is_html(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert!(!is_html(&headers));
    }
}
