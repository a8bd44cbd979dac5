//! Bucket key composition.
//!
//! The dispatch layer composes logical bucket names from stable request
//! fields; the engine prepends [`STORE_PREFIX`] to form the final store
//! key. Keys are plain strings so two service instances composing from
//! the same fields always address the same bucket.

/// Namespace reserved for bucket values at the store.
pub const STORE_PREFIX: &str = "rate_limit:bucket:";

/// Per-caller bucket, scoped to an endpoint and tier.
pub fn user_key(caller_id: &str, endpoint: &str, tier: &str) -> String {
    format!("user:{}:{}:{}", caller_id, endpoint, tier)
}

/// Per-IP bucket, scoped to an endpoint.
pub fn ip_key(ip_address: &str, endpoint: &str) -> String {
    format!("ip:{}:{}", ip_address, endpoint)
}

/// Unscoped endpoint bucket, used by the endpoint-only strategy.
pub fn endpoint_key(endpoint: &str) -> String {
    format!("endpoint:{}", endpoint)
}

/// Global companion bucket shared by all callers of an endpoint.
pub fn global_key(endpoint: &str) -> String {
    format!("global:{}", endpoint)
}

/// Final key under which a composed bucket lives at the store.
pub fn store_key(composed: &str) -> String {
    format!("{}{}", STORE_PREFIX, composed)
}
