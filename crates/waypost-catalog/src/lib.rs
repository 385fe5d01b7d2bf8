//! # waypost-catalog
//!
//! Catalog state for the Waypost moniker resolution service.
//!
//! This crate owns the authoritative mapping from catalog paths to
//! nodes, and everything that governs it:
//!
//! - **Data shapes**: [`types::CatalogNode`], [`types::SourceBinding`]
//!   (with contract fingerprints), [`types::Ownership`],
//!   [`types::NodeStatus`]
//! - **Registry**: immutable snapshots behind an atomic swap, with
//!   hierarchical ownership and binding inheritance
//! - **Validated reload**: fingerprint-based diffing with an optional
//!   breaking-change gate and a bounded audit trail
//! - **Requests**: the submit/approve queue for proposed monikers
//! - **Loader**: the YAML catalog definition format
//!
//! ## Consistency model
//!
//! Readers clone the current snapshot `Arc` once per request; writers
//! build a complete replacement snapshot and swap it. A reload is
//! therefore observed atomically: either all old nodes or all new ones,
//! never a mix.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod diff;
pub mod error;
pub mod loader;
pub mod registry;
pub mod requests;
pub mod types;

pub use audit::{AuditEntry, AuditKind, AuditLog};
pub use diff::CatalogDiff;
pub use error::{CatalogError, Result};
pub use loader::{load_catalog_file, parse_catalog_yaml};
pub use registry::{
    CatalogPage, CatalogRegistry, CatalogSnapshot, CatalogStats, MAX_SUCCESSOR_DEPTH, StatusUpdate,
};
pub use requests::{
    MonikerRequest, RequestRegistry, RequestStatus, RequestSubmission, RequesterInfo,
};
pub use types::{
    CatalogNode, Documentation, NodeStatus, Ownership, ResolvedOwnership, SourceBinding, SourceType,
};
