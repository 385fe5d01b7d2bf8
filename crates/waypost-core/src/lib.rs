//! # waypost-core
//!
//! Core primitives for the Waypost moniker resolution service.
//!
//! This crate provides the foundational types used across all Waypost
//! components:
//!
//! - **Moniker grammar**: parse and render hierarchical moniker paths
//! - **Template expansion**: fill query templates from parsed monikers
//! - **Telemetry core**: non-blocking usage event emitter with sinks
//! - **Canonical JSON**: deterministic encoding for binding fingerprints
//! - **Error types**: shared error definitions and result aliases
//!
//! ## Crate boundary
//!
//! `waypost-core` is the only crate allowed to define shared primitives.
//! It knows nothing about the catalog, the resolver, or HTTP.
//!
//! ## Example
//!
//! ```rust
//! use waypost_core::moniker::MonikerPath;
//!
//! let path = MonikerPath::parse("prices.equity/AAPL@20260115").unwrap();
//! assert_eq!(path.registry_key(), "prices.equity/AAPL");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod canonical_json;
pub mod error;
pub mod moniker;
pub mod observability;
pub mod telemetry;
pub mod template;

pub use error::{Error, MonikerErrorKind, Result};
pub use moniker::{MonikerPath, MonikerVersion, canonicalize};
pub use observability::{LogFormat, init_logging};
pub use telemetry::{
    CallerIdentity, EventOutcome, MemorySink, Operation, TelemetryConfig, TelemetryEmitter,
    TelemetrySink, TelemetryStats, TracingSink, UsageEvent,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, MonikerErrorKind, Result};
    pub use crate::moniker::{MonikerPath, MonikerVersion};
    pub use crate::telemetry::{
        CallerIdentity, EventOutcome, Operation, TelemetryEmitter, UsageEvent,
    };
}
