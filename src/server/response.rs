//! Error responses and response middleware

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::SpectraError;

/// `SpectraError` rendered as a JSON HTTP response
#[derive(Debug)]
pub struct ApiError(pub SpectraError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SpectraError::Validation { .. } => StatusCode::BAD_REQUEST,
            SpectraError::Decode { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SpectraError::NotFound { .. } => StatusCode::NOT_FOUND,
            SpectraError::SeparationUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SpectraError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SpectraError> for ApiError {
    fn from(err: SpectraError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let err = &self.0;

        // Polling for an unfinished artifact is routine
        match err {
            SpectraError::NotFound { .. } => debug!(error = %err, "not found"),
            _ if err.is_client_error() => warn!(error = %err, code = err.error_code(), "rejected request"),
            _ => error!(error = %err, code = err.error_code(), "request failed"),
        }

        let body = json!({
            "error": err.to_string(),
            "code": err.error_code(),
            "retryable": err.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

/// Permissive CORS for the browser client: any origin, answers preflights
pub async fn allow_any_origin(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}
