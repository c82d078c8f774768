//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatcher as the only handler
//! - Wire up middleware (request ID, tracing)
//! - Build the shared upstream client once
//! - Dispatch: override first, proxy on miss
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::error::ProxyError;
use crate::http::proxy;
use crate::lifecycle::startup::StartupError;
use crate::observability::metrics::{self, Outcome};
use crate::overrides::OverrideResolver;
use crate::rewrite::Rewriter;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub rewriter: Arc<Rewriter>,
    pub client: reqwest::Client,
    pub overrides: Option<Arc<OverrideResolver>>,
}

impl AppState {
    /// Compile rewriters and build the upstream client from `config`.
    pub fn from_config(config: ProxyConfig) -> Result<Self, StartupError> {
        let rewriter = Rewriter::from_config(&config)?;
        let client = build_client(&config)?;
        let overrides = if config.overrides.enabled {
            Some(Arc::new(
                OverrideResolver::from_config(&config.overrides)
                    .map_err(StartupError::WorkingDirectory)?,
            ))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            rewriter: Arc::new(rewriter),
            client,
            overrides,
        })
    }

    /// Replace the override resolver, e.g. to point at a fixed root.
    pub fn with_overrides(mut self, resolver: Option<OverrideResolver>) -> Self {
        self.overrides = resolver.map(Arc::new);
        self
    }
}

/// Upstream client: no redirect following, transparent decompression.
fn build_client(config: &ProxyConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());

    if let Some(secs) = config.upstream.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if !config.upstream.use_system_proxy {
        builder = builder.no_proxy();
    }
    for (host, addr) in &config.upstream.resolve {
        builder = builder.resolve(host, *addr);
    }

    builder.build()
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        Ok(Self::from_state(AppState::from_config(config)?))
    }

    /// Create a server around prepared state.
    pub fn from_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        let request_id = req
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            request_id = %request_id,
                            method = %req.method(),
                            uri = %req.uri(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(x_request_id)),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream_scheme = %self.state.config.upstream.scheme,
            upstream_domain = %self.state.config.upstream.domain,
            overrides = ?self.state.overrides.as_ref().map(|o| o.root().display().to_string()),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.state.config
    }
}

/// Per-request entry point. Overrides always win over the proxy.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let (response, outcome) = match route(&state, request).await {
        Ok(routed) => routed,
        Err(e) => (e.into_response(), Outcome::Error),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start);
    response
}

async fn route(state: &AppState, request: Request<Body>) -> Result<(Response, Outcome), ProxyError> {
    if let Some(resolver) = &state.overrides {
        if let Some(file) = resolver.resolve(request.uri().path()).await? {
            return Ok((file.into_response().await?, Outcome::Override));
        }
    }

    let response = proxy::forward(state, request).await?;
    Ok((response, Outcome::Proxied))
}
