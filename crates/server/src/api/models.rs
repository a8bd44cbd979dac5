//! Request and response envelopes for the decision API.
//!
//! All types derive `Serialize` and/or `Deserialize` for JSON
//! marshalling via Axum.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body for `POST /check`.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// Caller identity (API key, user id, ...).
    pub key: String,
    /// Endpoint path the caller wants to hit.
    pub endpoint: String,
    /// Caller tier; required by tiered endpoints.
    #[serde(default)]
    pub user_tier: Option<String>,
    /// Client IP; required by IP-scoped endpoints.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Free-form attributes, accepted and ignored.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Response body for `POST /check`, on both allow (200) and deny (429).
#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Remaining tokens in the caller/IP-scoped bucket. Omitted for
    /// endpoint-only policies, which consult no caller-scoped bucket.
    #[serde(rename = "userRemaining", skip_serializing_if = "Option::is_none")]
    pub user_remaining: Option<i64>,
    /// Remaining tokens in the endpoint's shared bucket.
    #[serde(rename = "globalRemaining")]
    pub global_remaining: i64,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"unhealthy"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since process start.
    pub uptime_seconds: u64,
    /// `"connected"` or `"disconnected"`.
    pub store: String,
}
