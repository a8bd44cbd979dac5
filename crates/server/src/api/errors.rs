//! API error types mapped to HTTP status codes.
//!
//! Each [`ApiError`] variant maps to a specific HTTP status code and
//! produces a JSON response body `{"error": "message"}`; the invalid
//! tier variant carries the catalog's valid tier names so callers can
//! self-correct.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type that implements `IntoResponse`.
///
/// Rate-limited decisions are not errors; they are normal responses
/// with a 429 status carried by the decision body.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters (400).
    BadRequest(String),
    /// Unknown or missing tier on a tiered endpoint (400, with the
    /// enumerated valid tiers).
    InvalidTier {
        /// The tier the caller supplied, possibly empty.
        provided: String,
        /// All tier names the catalog accepts, sorted.
        valid_tiers: Vec<String>,
    },
    /// Store or engine failure; the decision is indeterminate (500).
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidTier {
                provided,
                valid_tiers,
            } => {
                let body = axum::Json(json!({
                    "error": "invalid user_tier",
                    "provided": provided,
                    "valid_tiers": valid_tiers,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::BadRequest(msg) => {
                let body = axum::Json(json!({ "error": msg }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(msg) => {
                let body = axum::Json(json!({ "error": msg }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
