//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → dispatcher: overrides::resolve(path)
//!         hit  → stream local file
//!         miss → proxy.rs
//!                  → request.rs (upstream URL + headers)
//!                  → reqwest (no redirects)
//!                  → response.rs (header/location rewrite)
//!                  → text passes (HTML) or streamed body
//!     → Send to client
//! ```

pub mod error;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use server::{AppState, HttpServer, X_REQUEST_ID};
