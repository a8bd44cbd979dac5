//! limitd-core — the rate-limiting decision engine.
//!
//! Implements atomic single- and dual-bucket token-bucket decisions
//! against a shared Redis store, the policy catalog that drives them,
//! and a process-local engine with identical semantics for tests and
//! single-instance deployments. HTTP concerns live in `limitd-server`.

/// Policy catalog: tiers, endpoint rules, and IP defaults.
pub mod catalog;
/// Compile-time defaults and limits.
pub mod config;
/// Decision engine trait and the Redis-backed implementation.
pub mod engine;
/// Engine, store, and catalog error types.
pub mod error;
/// Bucket key composition.
pub mod keys;
/// Process-local decision engine with the same bucket semantics.
pub mod memory;
/// Lua sources for the atomic bucket scripts.
pub mod scripts;
/// Redis script store: registration, digest cache, atomic execution.
pub mod store;

pub use catalog::{EndpointPolicy, IpDefaults, RuleCatalog, RuleKind, TierLimit};
pub use engine::{BucketSpec, DecisionEngine, DualDecision, RedisEngine, SingleDecision};
pub use error::{CatalogError, StoreError};
pub use memory::MemoryEngine;
