//! limitd-server — HTTP surface for the limitd decision service.
//!
//! Provides the Axum router, request dispatch, and metrics. The
//! bucket engine and policy catalog live in `limitd-core`.

/// REST API layer: Axum router, HTTP handlers, models, metrics.
pub mod api;
