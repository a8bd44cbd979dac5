//! Decision engine: typed single- and dual-bucket decisions.
//!
//! The engine composes the final store keys, stamps the wall-clock
//! time, invokes the atomic scripts through the store adapter, and
//! decodes the opaque replies into typed results. A misshaped reply is
//! a [`StoreError::BadReply`] and is propagated as-is; the engine
//! never converts an indeterminate call into a deny.

use crate::error::StoreError;
use crate::keys;
use crate::scripts;
use crate::store::ScriptStore;
use async_trait::async_trait;
use redis::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One bucket consulted by a dual-bucket decision.
#[derive(Debug, Clone, Copy)]
pub struct BucketSpec<'a> {
    /// Composed bucket name (without the store prefix).
    pub key: &'a str,
    /// Bucket capacity in tokens.
    pub capacity: i64,
    /// Refill rate in tokens per second.
    pub refill_rate: i64,
}

/// Outcome of a single-bucket decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Tokens left in the bucket after this decision, floored.
    pub remaining: i64,
}

/// Outcome of a dual-bucket decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualDecision {
    /// Whether the request may proceed. True only when both buckets
    /// held at least the cost.
    pub allowed: bool,
    /// Tokens left in the caller/IP-scoped bucket, floored.
    pub primary_remaining: i64,
    /// Tokens left in the endpoint's global bucket, floored.
    pub global_remaining: i64,
}

/// Atomic allow/deny decisions over named token buckets.
///
/// Implementations must apply the same semantics: lazy refill clamped
/// at capacity, no backwards clock movement, debit-on-allow only, and
/// for dual decisions debit both buckets or neither.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// Decide against one bucket.
    async fn decide_single(
        &self,
        key: &str,
        capacity: i64,
        refill_rate: i64,
        cost: i64,
        ttl: Duration,
    ) -> Result<SingleDecision, StoreError>;

    /// Decide against a primary bucket and a global bucket in one
    /// indivisible step.
    async fn decide_dual(
        &self,
        primary: BucketSpec<'_>,
        global: BucketSpec<'_>,
        cost: i64,
        ttl: Duration,
    ) -> Result<DualDecision, StoreError>;

    /// Liveness check against the backing store.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Decision engine backed by the shared Redis store.
///
/// All bucket state lives at the store; instances holding a
/// `RedisEngine` are stateless peers and may be scaled horizontally.
pub struct RedisEngine {
    store: ScriptStore,
}

impl RedisEngine {
    /// Connect to the store and register both bucket scripts.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let store = ScriptStore::connect(url).await?;
        store
            .load_script(scripts::SINGLE_BUCKET, scripts::SINGLE_BUCKET_SRC)
            .await?;
        store
            .load_script(scripts::DUAL_BUCKET, scripts::DUAL_BUCKET_SRC)
            .await?;
        Ok(Self { store })
    }
}

#[async_trait]
impl DecisionEngine for RedisEngine {
    async fn decide_single(
        &self,
        key: &str,
        capacity: i64,
        refill_rate: i64,
        cost: i64,
        ttl: Duration,
    ) -> Result<SingleDecision, StoreError> {
        let store_key = keys::store_key(key);
        let reply = self
            .store
            .eval(
                scripts::SINGLE_BUCKET,
                &[&store_key],
                &[capacity, refill_rate, cost, now_ms(), ttl.as_secs() as i64],
            )
            .await?;
        decode_single(&reply)
    }

    async fn decide_dual(
        &self,
        primary: BucketSpec<'_>,
        global: BucketSpec<'_>,
        cost: i64,
        ttl: Duration,
    ) -> Result<DualDecision, StoreError> {
        let primary_key = keys::store_key(primary.key);
        let global_key = keys::store_key(global.key);
        let reply = self
            .store
            .eval(
                scripts::DUAL_BUCKET,
                &[&primary_key, &global_key],
                &[
                    primary.capacity,
                    primary.refill_rate,
                    global.capacity,
                    global.refill_rate,
                    cost,
                    now_ms(),
                    ttl.as_secs() as i64,
                ],
            )
            .await?;
        decode_dual(&reply)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// Passed to the scripts as an argument rather than read at the store,
/// so deciders on different hosts may disagree slightly; the refill
/// math tolerates that by never moving `last_refill_ms` backwards.
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn decode_single(reply: &Value) -> Result<SingleDecision, StoreError> {
    let items = expect_array(reply, 2)?;
    Ok(SingleDecision {
        allowed: int_at(items, 0)? == 1,
        remaining: int_at(items, 1)?,
    })
}

fn decode_dual(reply: &Value) -> Result<DualDecision, StoreError> {
    let items = expect_array(reply, 3)?;
    Ok(DualDecision {
        allowed: int_at(items, 0)? == 1,
        primary_remaining: int_at(items, 1)?,
        global_remaining: int_at(items, 2)?,
    })
}

fn expect_array(reply: &Value, len: usize) -> Result<&[Value], StoreError> {
    match reply {
        Value::Array(items) if items.len() == len => Ok(items),
        other => Err(StoreError::BadReply(format!(
            "expected array of {} integers, got {:?}",
            len, other
        ))),
    }
}

fn int_at(items: &[Value], index: usize) -> Result<i64, StoreError> {
    match items.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        other => Err(StoreError::BadReply(format!(
            "expected integer at position {}, got {:?}",
            index, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_allowed() {
        let reply = Value::Array(vec![Value::Int(1), Value::Int(90)]);
        assert_eq!(
            decode_single(&reply).unwrap(),
            SingleDecision {
                allowed: true,
                remaining: 90
            }
        );
    }

    #[test]
    fn test_decode_single_denied() {
        let reply = Value::Array(vec![Value::Int(0), Value::Int(0)]);
        assert_eq!(
            decode_single(&reply).unwrap(),
            SingleDecision {
                allowed: false,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_decode_dual() {
        let reply = Value::Array(vec![Value::Int(1), Value::Int(90), Value::Int(9990)]);
        assert_eq!(
            decode_dual(&reply).unwrap(),
            DualDecision {
                allowed: true,
                primary_remaining: 90,
                global_remaining: 9990
            }
        );
    }

    #[test]
    fn test_decode_single_wrong_arity() {
        let reply = Value::Array(vec![Value::Int(1)]);
        assert!(matches!(
            decode_single(&reply),
            Err(StoreError::BadReply(_))
        ));
    }

    #[test]
    fn test_decode_dual_rejects_single_shape() {
        let reply = Value::Array(vec![Value::Int(1), Value::Int(90)]);
        assert!(matches!(decode_dual(&reply), Err(StoreError::BadReply(_))));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(matches!(
            decode_single(&Value::Nil),
            Err(StoreError::BadReply(_))
        ));
        assert!(matches!(
            decode_single(&Value::Int(1)),
            Err(StoreError::BadReply(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_integer_element() {
        let reply = Value::Array(vec![Value::Int(1), Value::BulkString(b"90".to_vec())]);
        assert!(matches!(
            decode_single(&reply),
            Err(StoreError::BadReply(_))
        ));
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000); // after Sep 2020, sanity only
    }
}
