//! HTTP route handlers.
//!
//! ## Routes
//!
//! - `GET  /resolve/{path}` — resolve a moniker to source connection info
//! - `POST /resolve/batch` — resolve many monikers in one call
//! - `GET  /describe/{path}` — node metadata without binding expansion
//! - `GET  /list/{path}` — immediate children
//! - `GET  /lineage/{path}` — ownership chain with provenance
//! - `GET  /tree[/{path}]` — depth-bounded hierarchy
//! - `GET  /catalog` — paginated path listing
//! - `GET  /catalog/search` — free-text search
//! - `GET  /catalog/stats` — counts by status and source type
//! - `GET  /catalog/{path}/audit` — audit entries for one path
//! - `PUT  /catalog/{path}/status` — lifecycle transition (approve lane)
//! - `POST /catalog/reload` — validated hot-reload (approve lane)
//! - `POST /requests` — submit a proposed moniker (submit lane)
//! - `GET  /requests` — list requests (submit lane)
//! - `POST /requests/{id}/approve` — approve (approve lane)
//! - `POST /requests/{id}/reject` — reject (approve lane)
//! - `POST /telemetry/access` — client-reported access event

pub mod catalog;
pub mod requests;
pub mod resolve;
pub mod telemetry;
