//! HTTP request handlers and shared application state.
//!
//! The check handler is the dispatch layer: it resolves the endpoint's
//! policy, picks the strategy, composes the bucket keys, invokes the
//! decision engine, and maps the outcome to a response status. All
//! input validation happens here; the engine only ever sees
//! well-formed decisions.

use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::{DecisionRequest, DecisionResponse, HealthResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use limitd_core::engine::{BucketSpec, DecisionEngine};
use limitd_core::error::StoreError;
use limitd_core::{config, keys, RuleCatalog, RuleKind};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state passed to every handler via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// Decision engine; all bucket state lives behind it.
    pub engine: Arc<dyn DecisionEngine>,
    /// Policy catalog, immutable after load.
    pub catalog: Arc<RuleCatalog>,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

/// `POST /check`
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<DecisionRequest>,
) -> Result<(StatusCode, Json<DecisionResponse>), ApiError> {
    let policy = state
        .catalog
        .endpoint(&req.endpoint)
        .ok_or_else(|| ApiError::BadRequest("unknown endpoint".to_string()))?;

    let ttl = Duration::from_secs(config::BUCKET_TTL_SECS);
    let strategy = policy.rule.label();
    let global_key = keys::global_key(&req.endpoint);
    let global = BucketSpec {
        key: &global_key,
        capacity: policy.global_capacity,
        refill_rate: policy.global_refill_rate,
    };

    let response = match policy.rule {
        RuleKind::TierEndpoint => {
            let tier_name = req.user_tier.clone().unwrap_or_default();
            let tier = state
                .catalog
                .tier(&tier_name)
                .ok_or_else(|| ApiError::InvalidTier {
                    provided: tier_name.clone(),
                    valid_tiers: state.catalog.tier_names(),
                })?;
            let user_key = keys::user_key(&req.key, &req.endpoint, &tier_name);
            let decision = state
                .engine
                .decide_dual(
                    BucketSpec {
                        key: &user_key,
                        capacity: tier.capacity,
                        refill_rate: tier.refill_rate,
                    },
                    global,
                    policy.cost,
                    ttl,
                )
                .await
                .map_err(|e| store_failure(e, &req.endpoint, strategy, &[&user_key, &global_key]))?;
            DecisionResponse {
                allowed: decision.allowed,
                user_remaining: Some(decision.primary_remaining),
                global_remaining: decision.global_remaining,
            }
        }
        RuleKind::IpEndpoint => {
            let ip = req
                .ip_address
                .as_deref()
                .filter(|ip| !ip.is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest("ip_address required for this endpoint".to_string())
                })?;
            let ip_key = keys::ip_key(ip, &req.endpoint);
            let ip_limits = state.catalog.ip();
            let decision = state
                .engine
                .decide_dual(
                    BucketSpec {
                        key: &ip_key,
                        capacity: ip_limits.capacity,
                        refill_rate: ip_limits.refill_rate,
                    },
                    global,
                    policy.cost,
                    ttl,
                )
                .await
                .map_err(|e| store_failure(e, &req.endpoint, strategy, &[&ip_key, &global_key]))?;
            DecisionResponse {
                allowed: decision.allowed,
                user_remaining: Some(decision.primary_remaining),
                global_remaining: decision.global_remaining,
            }
        }
        RuleKind::EndpointOnly => {
            let endpoint_key = keys::endpoint_key(&req.endpoint);
            let decision = state
                .engine
                .decide_single(
                    &endpoint_key,
                    policy.global_capacity,
                    policy.global_refill_rate,
                    policy.cost,
                    ttl,
                )
                .await
                .map_err(|e| store_failure(e, &req.endpoint, strategy, &[&endpoint_key]))?;
            DecisionResponse {
                allowed: decision.allowed,
                user_remaining: None,
                global_remaining: decision.remaining,
            }
        }
    };

    metrics::record_decision(&req.endpoint, strategy, response.allowed);
    if response.allowed {
        Ok((StatusCode::OK, Json(response)))
    } else {
        tracing::info!(
            caller = %req.key,
            endpoint = %req.endpoint,
            strategy = %strategy,
            "Rate limited"
        );
        Ok((StatusCode::TOO_MANY_REQUESTS, Json(response)))
    }
}

fn store_failure(
    err: StoreError,
    endpoint: &str,
    strategy: &str,
    bucket_keys: &[&str],
) -> ApiError {
    tracing::error!(
        endpoint = %endpoint,
        strategy = %strategy,
        bucket_keys = ?bucket_keys,
        error = %err,
        "Store decision failed"
    );
    metrics::record_store_error();
    ApiError::Internal("rate limiter unavailable".to_string())
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = state.engine.ping().await.is_ok();
    metrics::update_store_health(store_ok);

    let status_code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(HealthResponse {
            status: if store_ok { "ok" } else { "unhealthy" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            store: if store_ok { "connected" } else { "disconnected" }.to_string(),
        }),
    )
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}
