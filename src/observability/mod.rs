//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Per-request spans come from tower-http's TraceLayer and carry the
//! x-request-id set at the edge.
//! ```

pub mod logging;
pub mod metrics;
