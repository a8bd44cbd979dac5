//! Compile-time defaults and limits for limitd.
//!
//! Runtime configuration is handled via CLI arguments in the server's
//! `main.rs`; the policy catalog is a separate YAML document.

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default path of the policy catalog document.
pub const DEFAULT_RULES_PATH: &str = "config/rules.yaml";

/// Idle expiry applied to every bucket write, in seconds.
///
/// Redis garbage-collects a bucket after this long without activity;
/// the next decision recreates it at full capacity.
pub const BUCKET_TTL_SECS: u64 = 3600;

/// Maximum HTTP request body size in bytes. Decision envelopes are
/// small; anything larger is malformed.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 512;

/// Interval in seconds between store health gauge updates.
pub const STORE_HEALTH_INTERVAL_SECS: u64 = 15;
