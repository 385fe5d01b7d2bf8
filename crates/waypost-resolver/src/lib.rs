//! # waypost-resolver
//!
//! Resolution engine and governance controller for the Waypost moniker
//! resolution service.
//!
//! The resolver orchestrates the full read path:
//!
//! ```text
//! raw string ─ parse ─▶ registry lookup ─▶ successor redirect
//!            ─▶ template expansion ─▶ ownership rollup ─▶ ResolveResult
//! ```
//!
//! and emits one usage event per operation. The governance controller
//! owns the write path: lifecycle transitions, validated hot-reloads
//! and the request/approval workflow, each invalidating the shared
//! result cache as needed.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod governance;
pub mod service;

pub use cache::{CacheConfig, ResolveCache};
pub use error::{ResolveError, Result};
pub use governance::{GovernanceController, GovernanceOptions, ReloadOutcome};
pub use service::{
    DescribeResult, LineageResult, ListResult, ResolveResult, ResolverOptions, ResolverService,
};
