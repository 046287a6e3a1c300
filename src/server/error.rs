use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gifsmith_common::error::ENGINE_LOAD_REMEDIATION;
use gifsmith_common::Error;

/// JSON error response: `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.is_rejection() {
            tracing::debug!("Request rejected: {}", self.0);
        } else if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::warn!("Request failed: {}", self.0);
        }

        let mut body = serde_json::json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        if matches!(self.0, Error::EngineLoadFailed { .. }) {
            body["remediation"] = serde_json::json!(ENGINE_LOAD_REMEDIATION);
        }

        (status, Json(body)).into_response()
    }
}
