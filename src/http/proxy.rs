//! The rewriting proxy pipeline.
//!
//! ```text
//! Client --[inbound]--> proxy --[upstream request]--> origin
//! Client <-[outward]--- proxy <-[upstream response]-- origin
//! ```
//!
//! One call runs build → send → rewrite headers → rewrite or stream body.
//! Redirects are never followed; the client sees the first response.

use axum::body::{Body, HttpBody};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::TryStreamExt;

use crate::config::PublicConfig;
use crate::http::error::ProxyError;
use crate::http::request::{is_feature_request, public_host, upstream_headers, upstream_url};
use crate::http::response::{is_html, rewrite_headers, rewrite_location};
use crate::http::server::AppState;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Forward `request` upstream and return the rewritten response.
pub async fn forward(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let hosts = &state.rewriter.hosts;

    let public_host = public_host(&parts.headers, &parts.uri)
        .ok_or_else(|| ProxyError::UpstreamRequestBuild("request has no host".into()))?;
    let feature = is_feature_request(&state.config.feature, parts.uri.path());
    let scheme = outward_scheme(&state.config.public, &parts.headers);

    // Build
    let url = upstream_url(&state.config, hosts, &parts.uri, &public_host)?;
    let headers = upstream_headers(hosts, &parts.headers, &url)?;

    tracing::debug!(
        public_host = %public_host,
        upstream = %url,
        feature,
        "Forwarding request"
    );

    let mut builder = state.client.request(parts.method, url).headers(headers);
    if body.size_hint().exact() != Some(0) {
        builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }
    let upstream_request = builder
        .build()
        .map_err(|e| ProxyError::UpstreamRequestBuild(e.to_string()))?;

    // Send
    let upstream = state
        .client
        .execute(upstream_request)
        .await
        .map_err(ProxyError::from_send)?;

    // Rewrite headers
    let status = upstream.status();
    let base_host = hosts.base_host(&public_host);
    let mut headers = rewrite_headers(&state.rewriter, upstream.headers(), &base_host);

    if let Some(location) = upstream
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(location) = rewrite_location(&state.rewriter, location, &public_host, scheme)? {
            let value = HeaderValue::from_str(&location)
                .map_err(|e| ProxyError::UpstreamRequestBuild(format!("location: {e}")))?;
            headers.insert(header::LOCATION, value);
        }
    }

    tracing::debug!(status = %status, "Upstream responded");

    // Body
    if is_html(upstream.headers()) {
        let raw = upstream.bytes().await.map_err(ProxyError::ResponseBody)?;
        let content = state
            .rewriter
            .text
            .rewrite_body(&raw, &base_host, feature)
            .into_owned();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content.len()));
        Ok(outward(status, headers, Body::from(content)))
    } else {
        let stream = upstream.bytes_stream().inspect_err(|e| {
            tracing::warn!(error = %e, "Upstream body stream aborted");
        });
        Ok(outward(status, headers, Body::from_stream(stream)))
    }
}

/// Scheme for rewritten redirect targets.
fn outward_scheme<'a>(public: &'a PublicConfig, headers: &'a HeaderMap) -> &'a str {
    if public.trust_forwarded_proto {
        let forwarded = headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim);
        if let Some(proto @ ("http" | "https")) = forwarded {
            return proto;
        }
    }
    &public.scheme
}

fn outward(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
