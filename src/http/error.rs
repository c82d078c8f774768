//! Per-request failures and their client-visible status codes.

use std::error::Error as _;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Everything that can end a request early.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Override path resolves outside the override root.
    #[error("override path escapes the override root: {0}")]
    PathTraversal(String),

    /// stat/open/read failed on an override.
    #[error("override I/O failed for {}: {source}", .path.display())]
    OverrideIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed URL {url:?}: {source}")]
    UpstreamUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build upstream request: {0}")]
    UpstreamRequestBuild(String),

    /// Upstream name did not resolve.
    #[error("upstream host not found: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("upstream transport error: {0}")]
    UpstreamTransport(#[source] reqwest::Error),

    #[error("upstream timed out: {0}")]
    UpstreamTimeout(#[source] reqwest::Error),

    #[error("failed to read upstream body: {0}")]
    ResponseBody(#[source] reqwest::Error),
}

impl ProxyError {
    /// Classify a failed `send`.
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout(err)
        } else if is_dns_failure(&err) {
            Self::UpstreamUnreachable(err)
        } else if err.is_builder() {
            Self::UpstreamRequestBuild(err.to_string())
        } else {
            Self::UpstreamTransport(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::PathTraversal(_) => StatusCode::FORBIDDEN,
            Self::UpstreamUnreachable(_) => StatusCode::NOT_FOUND,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::OverrideIo { .. }
            | Self::UpstreamUrl { .. }
            | Self::UpstreamRequestBuild(_)
            | Self::UpstreamTransport(_)
            | Self::ResponseBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::PathTraversal(_) | Self::UpstreamUnreachable(_) => {
                tracing::warn!(status = %status, error = %self, "Request rejected")
            }
            _ => tracing::error!(status = %status, error = %self, "Request failed"),
        }
        status.into_response()
    }
}

/// True when the connect failure came from name resolution.
fn is_dns_failure(err: &reqwest::Error) -> bool {
    if !err.is_connect() {
        return false;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if message.starts_with("dns error") || message.contains("failed to lookup address") {
            return true;
        }
        source = cause.source();
    }
    false
}
