//! Envelope response format for successful API responses.
//!
//! The payload's fields sit at the top level next to the success flag:
//! ```json
//! {
//!   "success": true,
//!   "step": { ... },
//!   "message": "Step added successfully",
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 }
//! }
//! ```
//!
//! Failures are rendered by [`crate::http::error::AppError`].

use std::time::Instant;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope response wrapping a payload struct.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    /// Flattened into the top-level object, so `T` must serialize as a map.
    #[serde(flatten)]
    pub data: T,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Request metadata.
    pub meta: ApiMeta,

    #[serde(skip)]
    pub status: StatusCode,
}

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique request identifier for tracing.
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
}

/// Payload for responses that carry nothing beyond the message.
#[derive(Debug, Serialize)]
pub struct Empty {}

/// Per-request timing and id, started when a handler begins.
pub struct RequestClock {
    start: Instant,
    request_id: String,
}

impl RequestClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            request_id: uuid::Uuid::now_v7().to_string(),
        }
    }

    /// Wrap `data` in a 200 envelope.
    pub fn ok<T: Serialize>(self, data: T) -> ApiResponse<T> {
        let elapsed = self.start.elapsed().as_millis() as u64;
        ApiResponse::success(data, self.request_id, elapsed)
    }

    /// Wrap `data` in a 201 envelope.
    pub fn created<T: Serialize>(self, data: T) -> ApiResponse<T> {
        let mut resp = self.ok(data);
        resp.status = StatusCode::CREATED;
        resp
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response with data.
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            success: true,
            data,
            message: None,
            meta: ApiMeta {
                request_id,
                timestamp: chrono::Utc::now().to_rfc3339(),
                response_time_ms,
            },
            status: StatusCode::OK,
        }
    }

    /// Attach a human-readable message.
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct StepCount {
        #[serde(rename = "stepsAdded")]
        steps_added: usize,
    }

    #[test]
    fn payload_fields_are_flattened() {
        let resp = ApiResponse::success(StepCount { steps_added: 4 }, "req-1".to_string(), 3)
            .with_message("Template applied successfully");
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["stepsAdded"], 4);
        assert_eq!(json["message"], "Template applied successfully");
        assert_eq!(json["meta"]["request_id"], "req-1");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn empty_payload_omits_message_when_unset() {
        let resp = RequestClock::start().ok(Empty {});
        let json = serde_json::to_value(&resp).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2, "only success and meta expected, got {keys:?}");
    }

    #[test]
    fn created_sets_status() {
        let resp = RequestClock::start().created(Empty {});
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.into_response().status(), StatusCode::CREATED);
    }
}
