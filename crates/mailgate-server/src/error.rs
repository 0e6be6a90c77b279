//! HTTP error envelope.
//!
//! Every failure leaving a handler is serialized as
//! `{"error": {"code", "message"}}` with a status derived from the
//! domain error taxonomy, so clients branch on `code` rather than on
//! message text.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use mailgate_core::CoreError;

/// Wrapper turning a [`CoreError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.0.code(),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

/// Handler result alias.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
