//! Uniform response envelope for backend calls and bridge commands.
//!
//! Serializes as `{"status": "success", ...payload}` or
//! `{"status": "error", "message": "..."}` so the frontend can branch on
//! `status` without try/catch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of any backend or bridge call.
///
/// `T` must serialize as a JSON object: its fields are flattened next to
/// the `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success(T),
    Error { message: String },
}

/// Payload for calls that succeed without data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

impl<T> ApiResponse<T> {
    pub fn success(payload: T) -> Self {
        ApiResponse::Success(payload)
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            ApiResponse::Success(payload) => Some(payload),
            ApiResponse::Error { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiResponse::Success(_) => None,
            ApiResponse::Error { message } => Some(message),
        }
    }
}

impl ApiResponse<Empty> {
    pub fn ok() -> Self {
        ApiResponse::Success(Empty {})
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => ApiResponse::Success(payload),
            Err(e) => ApiResponse::error(e.to_string()),
        }
    }
}

impl ApiResponse<Value> {
    /// Interpret a 2xx backend JSON body.
    ///
    /// A body that already says `"status": "error"` stays an error; any other
    /// object passes through as the success payload. Non-object bodies are
    /// wrapped under `data` so the envelope can still flatten them.
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) => {
                if map.get("status").and_then(Value::as_str) == Some("error") {
                    let message = map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown error")
                        .to_string();
                    return ApiResponse::Error { message };
                }
                map.remove("status");
                ApiResponse::Success(Value::Object(map))
            }
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                ApiResponse::Success(Value::Object(map))
            }
        }
    }

    pub fn empty_success() -> Self {
        ApiResponse::Success(Value::Object(Map::new()))
    }
}
