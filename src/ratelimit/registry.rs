//! Per-route bucket registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::clock::Clock;

use super::bucket::{BucketPolicy, TokenBucket};

/// A concurrent mapping from route key to its token bucket.
///
/// Entries are created lazily on first access and live for the registry's
/// lifetime; there is no eviction. Route-key cardinality is assumed bounded
/// by the set of configured routes, so callers must normalize attacker-
/// controlled paths before using them as keys.
pub struct BucketRegistry {
    buckets: DashMap<String, Arc<TokenBucket>>,
    clock: Arc<dyn Clock>,
}

impl BucketRegistry {
    /// Create an empty registry whose buckets share the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Return the bucket for `key`, creating it with `policy` on first access.
    ///
    /// Concurrent first-access to the same key is resolved by the map's
    /// entry lock: exactly one bucket is created and every racer gets a
    /// handle to that winning instance. The policy only matters for the
    /// creation; later callers observe the stored bucket's original policy.
    pub fn get_or_create(&self, key: &str, policy: BucketPolicy) -> Arc<TokenBucket> {
        if let Some(bucket) = self.buckets.get(key) {
            return Arc::clone(&bucket);
        }

        let bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            debug!(
                key,
                rate = policy.rate(),
                capacity = policy.capacity(),
                "Creating new token bucket"
            );
            Arc::new(TokenBucket::new(policy, Arc::clone(&self.clock)))
        });
        Arc::clone(&bucket)
    }

    /// Return the bucket for `key` if one exists.
    pub fn get(&self, key: &str) -> Option<Arc<TokenBucket>> {
        self.buckets.get(key).map(|bucket| Arc::clone(&bucket))
    }

    /// Number of buckets currently held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the registry holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop all buckets.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.buckets.clear();
    }
}

impl std::fmt::Debug for BucketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketRegistry")
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}
