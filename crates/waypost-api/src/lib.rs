//! # waypost-api
//!
//! HTTP surface for the Waypost moniker resolution service.
//!
//! Wires the resolver, catalog registry, governance controller and
//! telemetry emitter behind an axum router:
//!
//! - anonymous read surface (`/resolve`, `/describe`, `/list`,
//!   `/lineage`, `/tree`, `/catalog*`)
//! - submit lane (`POST /requests`, `GET /requests`)
//! - approve lane (`/requests/{id}/approve|reject`,
//!   `PUT /catalog/{path}/status`, `POST /catalog/reload`)
//! - operator surface (`/health`, `/metrics`, `/openapi.json`)

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

pub use auth::{AuthTokens, Role};
pub use config::Config;
pub use error::{ApiError, ApiErrorBody, ApiResult};
pub use server::{AppState, router, serve};
