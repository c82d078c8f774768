//! Static override subsystem.
//!
//! # Data Flow
//! ```text
//! request path
//!     → resolver.rs (join with root, normalize, confine to root)
//!     → stat: missing/dir → fall through to proxy
//!             regular file → stream it
//! ```
//!
//! # Design Decisions
//! - Confinement is checked lexically before any filesystem access
//! - Request paths are used as received; percent-escapes are not decoded

pub mod resolver;

pub use resolver::{OverrideFile, OverrideResolver};
