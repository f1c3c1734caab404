//! Mapping of domain errors and policy denials onto HTTP responses.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use broadsheet_core::{Denial, Error as CoreError, ValidationError};
use serde_json::json;
use tracing::error;

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No or unknown bearer token.
    #[error("Authentication required")]
    Unauthorized,

    /// The access policy refused the request.
    #[error("{}", .0.message())]
    Denied(Denial),

    /// A domain operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        Self::Denied(denial)
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

/// Groups validation errors by field, keeping their order.
#[must_use]
pub fn field_errors(errors: &[ValidationError]) -> BTreeMap<&'static str, Vec<&'static str>> {
    let mut fields: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
    for e in errors {
        fields.entry(e.field()).or_default().push(e.message());
    }
    fields
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
            Self::Denied(Denial::Redirect(location)) => {
                (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
            }
            Self::Denied(Denial::Forbidden(message)) => {
                (StatusCode::FORBIDDEN, message).into_response()
            }
            Self::Core(CoreError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": field_errors(&errors) })),
            )
                .into_response(),
            Self::Core(e @ CoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))).into_response()
            }
            Self::Core(e @ CoreError::NewsletterBlocked(_)) => {
                (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response()
            }
            Self::Core(e) => {
                error!("Request failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
