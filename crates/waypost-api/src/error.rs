//! API error types and HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use waypost_catalog::CatalogError;
use waypost_core::Error as CoreError;
use waypost_resolver::ResolveError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
    /// Optional request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// HTTP API error with a stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl ApiError {
    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns an error response for a rejected moniker string.
    pub fn invalid_moniker(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_MONIKER", message)
    }

    /// Returns an error response for authorization failures.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response when a path has no inheritable binding.
    pub fn no_binding(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NO_BINDING", message)
    }

    /// Returns an error response for unresolved template placeholders.
    pub fn template_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "TEMPLATE_ERROR", message)
    }

    /// Returns an error response for conflicts (illegal transitions,
    /// duplicate approvals).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// Returns an error response for reloads refused due to breaking
    /// changes.
    pub fn breaking_reload(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "BREAKING_RELOAD_REJECTED", message)
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Attaches a request ID for correlation.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiErrorBody {
                code: self.code.to_string(),
                message: self.message,
                request_id: self.request_id,
            }),
        )
            .into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        match &value {
            CoreError::InvalidMoniker { .. } => Self::invalid_moniker(value.to_string()),
            CoreError::TemplateMissing { .. } => Self::template_error(value.to_string()),
            CoreError::Serialization { .. } | CoreError::Internal { .. } => {
                Self::internal(value.to_string())
            }
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(value: ResolveError) -> Self {
        match &value {
            ResolveError::Core(core) => match core {
                CoreError::InvalidMoniker { .. } => Self::invalid_moniker(value.to_string()),
                CoreError::TemplateMissing { .. } => Self::template_error(value.to_string()),
                _ => Self::internal(value.to_string()),
            },
            ResolveError::UnknownMoniker { .. } => Self::not_found(value.to_string()),
            ResolveError::NoBinding { .. } => Self::no_binding(value.to_string()),
            ResolveError::Internal { .. } => Self::internal(value.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        match &value {
            CatalogError::NotFound { .. } => Self::not_found(value.to_string()),
            CatalogError::IllegalTransition { .. } | CatalogError::RequestConflict { .. } => {
                Self::conflict(value.to_string())
            }
            CatalogError::BreakingChanges { .. } => Self::breaking_reload(value.to_string()),
            CatalogError::Definition { .. } => Self::bad_request(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypost_core::MonikerErrorKind;

    #[test]
    fn parse_errors_map_to_400() {
        let err: ApiError =
            CoreError::invalid_moniker(MonikerErrorKind::BadDomain, "nope").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_MONIKER");
    }

    #[test]
    fn resolver_errors_map_to_404_and_422() {
        let err: ApiError = ResolveError::UnknownMoniker { path: "a.b".into() }.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = ResolveError::NoBinding { path: "a.b".into() }.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NO_BINDING");

        let err: ApiError =
            ResolveError::Core(CoreError::template_missing("segments[4]")).into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn catalog_errors_map_to_409() {
        let err: ApiError = CatalogError::request_conflict("already decided").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
