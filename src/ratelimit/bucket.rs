//! Token bucket implementation.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::clock::Clock;
use crate::error::{Result, TollgateError};

/// Refill rate and capacity for a token bucket, validated at construction.
///
/// A non-positive rate would produce a bucket that never refills, and a zero
/// capacity one that never holds a token; both are configuration errors and
/// are refused here, before any bucket exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPolicy {
    rate: f64,
    capacity: u64,
}

impl BucketPolicy {
    /// Create a policy with `rate` tokens added per second and at most
    /// `capacity` tokens held.
    pub fn new(rate: f64, capacity: u64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(TollgateError::Config(format!(
                "refill rate must be a positive number of tokens per second, got {}",
                rate
            )));
        }
        if capacity == 0 {
            return Err(TollgateError::Config(
                "bucket capacity must be at least one token".to_string(),
            ));
        }
        Ok(Self { rate, capacity })
    }

    /// Tokens added per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum tokens the bucket can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

/// Mutable bucket state, guarded as one unit so refill and consume are a
/// single atomic step per bucket.
#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill_ms: u64,
}

/// A token bucket: a counter filled at a steady rate up to a fixed capacity,
/// drained by admitted requests.
///
/// Token counts are `f64` so that refill intervals smaller than one token's
/// worth of time accumulate instead of truncating to zero. An f64 holds
/// integer counts exactly up to 2^53, far beyond any realistic capacity, and
/// every mutation clamps into `[0, capacity]`, so drift cannot escape the
/// bucket's bounds.
pub struct TokenBucket {
    policy: BucketPolicy,
    state: Mutex<BucketState>,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Create a bucket, born full.
    pub fn new(policy: BucketPolicy, clock: Arc<dyn Clock>) -> Self {
        let state = BucketState {
            tokens: policy.capacity() as f64,
            last_refill_ms: clock.now_millis(),
        };
        Self {
            policy,
            state: Mutex::new(state),
            clock,
        }
    }

    /// Attempt to consume `demand` tokens.
    ///
    /// Refills from elapsed time, then tests and subtracts, all under the
    /// bucket's lock so concurrent callers see a linearizable sequence of
    /// decisions. Returns `true` on admission; refusal leaves the bucket
    /// unchanged and is a normal outcome, not an error.
    ///
    /// Callers must never request zero tokens.
    pub fn try_consume(&self, demand: u64) -> bool {
        debug_assert!(demand > 0, "token demand must be at least 1");

        let mut state = self.state.lock();
        self.refill(&mut state);

        let demand = demand as f64;
        if state.tokens >= demand {
            state.tokens -= demand;
            trace!(remaining = state.tokens, "tokens consumed");
            true
        } else {
            trace!(available = state.tokens, demand, "insufficient tokens");
            false
        }
    }

    /// Add tokens for the time elapsed since the last refill, capped at
    /// capacity. A negative elapsed reading (non-monotonic clock) clamps to
    /// zero tokens added; a zero reading adds zero and is not a fault.
    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now_millis();
        let elapsed_ms = now.saturating_sub(state.last_refill_ms);
        let added = elapsed_ms as f64 / 1_000.0 * self.policy.rate();
        state.tokens = (state.tokens + added).min(self.policy.capacity() as f64);
        state.last_refill_ms = now;
    }

    /// Tokens currently available, after refilling for elapsed time.
    ///
    /// This is primarily useful for testing and introspection; the value is
    /// stale the moment the lock is released.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// The policy this bucket was created with.
    pub fn policy(&self) -> BucketPolicy {
        self.policy
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
