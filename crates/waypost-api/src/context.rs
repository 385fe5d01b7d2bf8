//! Per-request context extraction.
//!
//! Read operations are anonymous; callers may self-identify through
//! `X-App-Id` / `X-Team` headers for chargeback and lineage. The
//! bearer token, when present, resolves to a governance role.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use ulid::Ulid;

use waypost_core::CallerIdentity;

use crate::auth::Role;
use crate::error::ApiError;
use crate::server::AppState;

/// Header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context derived from headers for every request.
#[derive(Debug, Clone)]
pub struct CallerContext {
    /// Request ID for tracing/correlation.
    pub request_id: String,
    /// Caller identity for telemetry.
    pub caller: CallerIdentity,
    /// Governance role resolved from the bearer token.
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CallerContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            header_string(headers, REQUEST_ID_HEADER).unwrap_or_else(|| Ulid::new().to_string());
        let caller = CallerIdentity::new(
            header_string(headers, "X-App-Id"),
            header_string(headers, "X-Team"),
        );
        let role = state.tokens.role_for(bearer_token(headers).as_deref());

        let ctx = Self {
            request_id,
            caller,
            role,
        };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_string(headers, "Authorization")?;
    let token = raw.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value: &HeaderValue| value.to_str().ok())
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}
