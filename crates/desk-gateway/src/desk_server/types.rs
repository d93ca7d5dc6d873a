//! Request/response bodies and the transport error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use desk_core::RequestRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug)]
pub(super) struct DeskApiError {
    pub(super) status: StatusCode,
    pub(super) code: &'static str,
    pub(super) message: String,
}

impl DeskApiError {
    pub(super) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub(super) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub(super) fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_signature",
            "missing or invalid webhook signature",
        )
    }

    pub(super) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for DeskApiError {
    fn into_response(self) -> Response {
        let error_type = if self.status.is_client_error() {
            "invalid_request_error"
        } else {
            "server_error"
        };
        (
            self.status,
            Json(json!({
                "error": {
                    "type": error_type,
                    "code": self.code,
                    "message": self.message,
                }
            })),
        )
            .into_response()
    }
}

/// Body accepted by `POST /requests`.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Success marker returned for every accepted webhook delivery; ignored and
/// no-op outcomes share the status code and differ only in the message.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public struct `RequestListResponse` used across Desk components.
pub struct RequestListResponse {
    pub requests: Vec<RequestRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public struct `ServiceStatusReport` used across Desk components.
pub struct ServiceStatusReport {
    pub status: String,
    pub uptime_ms: u64,
    pub request_count: usize,
    pub live_subscribers: usize,
    pub verification_mode: String,
    pub organization_id: String,
}
