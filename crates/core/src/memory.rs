//! Process-local decision engine.
//!
//! Holds buckets in a mutex-guarded map with the same semantics as the
//! store scripts: lazy refill clamped at capacity, no backwards clock
//! movement, debit-on-allow only, all-or-nothing dual debits, and idle
//! expiry. State is not shared across instances, so this engine is for
//! tests and single-instance deployments; fleet-wide enforcement needs
//! [`crate::engine::RedisEngine`].

use crate::engine::{now_ms, BucketSpec, DecisionEngine, DualDecision, SingleDecision};
use crate::error::StoreError;
use crate::keys;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: f64,
    last_refill_ms: i64,
    expires_at_ms: i64,
}

/// In-process engine with the same bucket semantics as the scripts.
#[derive(Default)]
pub struct MemoryEngine {
    buckets: Mutex<HashMap<String, BucketState>>,
}

impl MemoryEngine {
    /// Create an engine with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    fn single_at(
        &self,
        key: &str,
        capacity: i64,
        refill_rate: i64,
        cost: i64,
        ttl: Duration,
        now: i64,
    ) -> SingleDecision {
        let store_key = keys::store_key(key);
        let mut buckets = self.buckets.lock();
        let mut state = load(&buckets, &store_key, capacity, now);
        refill(&mut state, capacity, refill_rate, now);
        let allowed = debit(&mut state, cost);
        save(&mut buckets, store_key, state, ttl, now);
        SingleDecision {
            allowed,
            remaining: state.tokens.floor() as i64,
        }
    }

    fn dual_at(
        &self,
        primary: BucketSpec<'_>,
        global: BucketSpec<'_>,
        cost: i64,
        ttl: Duration,
        now: i64,
    ) -> DualDecision {
        let primary_key = keys::store_key(primary.key);
        let global_key = keys::store_key(global.key);
        let mut buckets = self.buckets.lock();

        let mut p = load(&buckets, &primary_key, primary.capacity, now);
        refill(&mut p, primary.capacity, primary.refill_rate, now);
        let mut g = load(&buckets, &global_key, global.capacity, now);
        refill(&mut g, global.capacity, global.refill_rate, now);

        // Joint rule: debit both or neither.
        let allowed = (cost as f64) <= p.tokens && (cost as f64) <= g.tokens;
        if allowed {
            p.tokens -= cost as f64;
            g.tokens -= cost as f64;
        }

        save(&mut buckets, primary_key, p, ttl, now);
        save(&mut buckets, global_key, g, ttl, now);
        DualDecision {
            allowed,
            primary_remaining: p.tokens.floor() as i64,
            global_remaining: g.tokens.floor() as i64,
        }
    }
}

fn load(
    buckets: &HashMap<String, BucketState>,
    store_key: &str,
    capacity: i64,
    now: i64,
) -> BucketState {
    match buckets.get(store_key) {
        Some(state) if now < state.expires_at_ms => *state,
        _ => BucketState {
            tokens: capacity as f64,
            last_refill_ms: now,
            expires_at_ms: now,
        },
    }
}

fn refill(state: &mut BucketState, capacity: i64, refill_rate: i64, now: i64) {
    if state.tokens < capacity as f64 {
        let elapsed = (now - state.last_refill_ms) as f64 / 1000.0;
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * refill_rate as f64).min(capacity as f64);
            state.last_refill_ms = now;
        }
    }
}

fn debit(state: &mut BucketState, cost: i64) -> bool {
    if (cost as f64) <= state.tokens {
        state.tokens -= cost as f64;
        true
    } else {
        false
    }
}

fn save(
    buckets: &mut HashMap<String, BucketState>,
    store_key: String,
    mut state: BucketState,
    ttl: Duration,
    now: i64,
) {
    state.expires_at_ms = now + ttl.as_millis() as i64;
    buckets.insert(store_key, state);
}

#[async_trait]
impl DecisionEngine for MemoryEngine {
    async fn decide_single(
        &self,
        key: &str,
        capacity: i64,
        refill_rate: i64,
        cost: i64,
        ttl: Duration,
    ) -> Result<SingleDecision, StoreError> {
        Ok(self.single_at(key, capacity, refill_rate, cost, ttl, now_ms()))
    }

    async fn decide_dual(
        &self,
        primary: BucketSpec<'_>,
        global: BucketSpec<'_>,
        cost: i64,
        ttl: Duration,
    ) -> Result<DualDecision, StoreError> {
        Ok(self.dual_at(primary, global, cost, ttl, now_ms()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
