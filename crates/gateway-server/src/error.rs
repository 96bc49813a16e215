//! HTTP-facing error type: maps the Router's/Dispatcher's domain errors
//! onto status codes and a small JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayError;
use gateway_webhooks::DispatchError;
use serde::Serialize;

/// Error returned by any handler in this crate.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body failed to deserialize or validate.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No resource exists at the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The Provider Router itself errored (every provider, including
    /// Offline, failed — see spec.md §7).
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The Webhook Dispatcher's management API rejected the request.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A dependency required for this request is unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// Build a [`ApiError::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Build a [`ApiError::ServiceUnavailable`].
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gateway(err) => match err {
                GatewayError::Cancelled => StatusCode::REQUEST_TIMEOUT,
                GatewayError::Config(_) | GatewayError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Dispatch(err) => match err {
                DispatchError::SubscriptionNotFound(_) | DispatchError::DeliveryNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                DispatchError::InvalidUrl(_) | DispatchError::NoEventTypes => {
                    StatusCode::BAD_REQUEST
                }
                DispatchError::NotRetryable(_) => StatusCode::CONFLICT,
                DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = match &self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Gateway(_) => "gateway_error",
            Self::Dispatch(_) => "dispatch_error",
        };
        let body = ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
                kind,
            },
        };
        (status, Json(body)).into_response()
    }
}
