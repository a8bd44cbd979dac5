//! Lua sources for the atomic bucket scripts.
//!
//! Both scripts execute indivisibly at the store: a script runs to
//! completion before any other script touches the same keys, which is
//! the only atomicity the engine relies on. Token counts are kept as
//! real numbers in the stored value to avoid rounding bias over many
//! small refills; only the returned counts are floored.
//!
//! The stored value is a JSON record `{tokens, last_refill_ms}` with
//! an idle expiry refreshed on every write. Capacity and refill rate
//! are call-time arguments, so policy changes take effect the next
//! time a bucket is touched.

/// Registered name of the single-bucket script.
pub const SINGLE_BUCKET: &str = "single_bucket";

/// Registered name of the dual-bucket script.
pub const DUAL_BUCKET: &str = "dual_bucket";

/// Single-bucket decision.
///
/// `KEYS = [key]`, `ARGV = [capacity, refill_rate, cost, now_ms, ttl_seconds]`.
/// Returns `[allowed (0|1), floor(tokens_after)]`.
pub const SINGLE_BUCKET_SRC: &str = r#"
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local cost = tonumber(ARGV[3])
local now_ms = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local tokens = capacity
local last_refill = now_ms
local raw = redis.call('GET', KEYS[1])
if raw then
  local state = cjson.decode(raw)
  tokens = tonumber(state.tokens)
  last_refill = tonumber(state.last_refill_ms)
end

-- Lazy refill. A negative elapsed means another decider's clock ran
-- ahead; add nothing and keep last_refill where it is.
if tokens < capacity then
  local elapsed = (now_ms - last_refill) / 1000
  if elapsed > 0 then
    tokens = math.min(capacity, tokens + elapsed * refill_rate)
    last_refill = now_ms
  end
end

local allowed = 0
if cost <= tokens then
  tokens = tokens - cost
  allowed = 1
end

redis.call('SET', KEYS[1],
  cjson.encode({tokens = tokens, last_refill_ms = last_refill}),
  'EX', ttl)
return {allowed, math.floor(tokens)}
"#;

/// Dual-bucket decision over a primary (caller or IP) bucket and the
/// endpoint's global bucket.
///
/// `KEYS = [primary, global]`,
/// `ARGV = [cap_p, rate_p, cap_g, rate_g, cost, now_ms, ttl_seconds]`.
/// Returns `[allowed, floor(primary_after), floor(global_after)]`.
///
/// Allowed iff BOTH buckets hold at least `cost` after refill; debits
/// both or neither. Refill is applied to both regardless of outcome.
pub const DUAL_BUCKET_SRC: &str = r#"
local cost = tonumber(ARGV[5])
local now_ms = tonumber(ARGV[6])
local ttl = tonumber(ARGV[7])

local function load_and_refill(key, capacity, rate)
  local tokens = capacity
  local last_refill = now_ms
  local raw = redis.call('GET', key)
  if raw then
    local state = cjson.decode(raw)
    tokens = tonumber(state.tokens)
    last_refill = tonumber(state.last_refill_ms)
  end
  if tokens < capacity then
    local elapsed = (now_ms - last_refill) / 1000
    if elapsed > 0 then
      tokens = math.min(capacity, tokens + elapsed * rate)
      last_refill = now_ms
    end
  end
  return tokens, last_refill
end

local tokens_p, last_p = load_and_refill(KEYS[1], tonumber(ARGV[1]), tonumber(ARGV[2]))
local tokens_g, last_g = load_and_refill(KEYS[2], tonumber(ARGV[3]), tonumber(ARGV[4]))

local allowed = 0
if cost <= tokens_p and cost <= tokens_g then
  tokens_p = tokens_p - cost
  tokens_g = tokens_g - cost
  allowed = 1
end

redis.call('SET', KEYS[1],
  cjson.encode({tokens = tokens_p, last_refill_ms = last_p}),
  'EX', ttl)
redis.call('SET', KEYS[2],
  cjson.encode({tokens = tokens_g, last_refill_ms = last_g}),
  'EX', ttl)
return {allowed, math.floor(tokens_p), math.floor(tokens_g)}
"#;
