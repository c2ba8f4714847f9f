//! The rate-limit gate, the sole pipeline stage with admission authority.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::config::LimitsConfig;
use crate::error::Result;
use crate::ratelimit::{route_key, BucketPolicy, BucketRegistry};

use super::{Handler, Request, Response, STATUS_TOO_MANY_REQUESTS};

/// Response header reporting the route's configured advisory cost.
pub const COST_HEADER: &str = "X-Request-Cost";

/// Advisory cost reported for paths with no configured route.
const UNCONFIGURED_COST: i64 = -1;

/// Separator used when normalizing request paths into route keys.
const KEY_SEPARATOR: char = '/';

/// Per-route limit resolved at wiring time.
#[derive(Debug, Clone)]
struct RoutePolicy {
    policy: BucketPolicy,
    cost: i64,
}

/// Normalizes the route key, resolves the route's bucket through the shared
/// registry, and consumes one token per request. On admission the request is
/// forwarded; on refusal the stage short-circuits with a 429 and the inner
/// chain never runs.
pub struct RateLimitGate {
    next: Box<dyn Handler>,
    registry: Arc<BucketRegistry>,
    routes: HashMap<String, RoutePolicy>,
    default_policy: BucketPolicy,
    key_segments: usize,
}

impl RateLimitGate {
    /// Build the gate from route limits.
    ///
    /// Non-positive rates or capacities are refused here, at wiring time,
    /// before any bucket is created. Paths without a configured limit fall
    /// back to `limits.default`.
    pub fn new(
        next: Box<dyn Handler>,
        registry: Arc<BucketRegistry>,
        limits: &LimitsConfig,
    ) -> Result<Self> {
        let default_policy = BucketPolicy::new(limits.default.rate, limits.default.capacity)?;

        let mut routes = HashMap::with_capacity(limits.routes.len());
        for route in &limits.routes {
            let policy = BucketPolicy::new(route.rate, route.capacity)?;
            routes.insert(
                route.path.clone(),
                RoutePolicy {
                    policy,
                    cost: route.cost,
                },
            );
        }

        Ok(Self {
            next,
            registry,
            routes,
            default_policy,
            key_segments: limits.key_segments,
        })
    }
}

#[async_trait]
impl Handler for RateLimitGate {
    async fn handle(&self, request: &Request, response: &mut Response) {
        let key = route_key(&request.path, KEY_SEPARATOR, self.key_segments);
        let (policy, cost) = match self.routes.get(key) {
            Some(route) => (route.policy, route.cost),
            None => (self.default_policy, UNCONFIGURED_COST),
        };

        // Reported on every request this stage sees, refused ones included.
        response.set_header(COST_HEADER, &cost.to_string());

        trace!(key, path = %request.path, "Checking admission");
        let bucket = self.registry.get_or_create(key, policy);
        if bucket.try_consume(1) {
            self.next.handle(request, response).await;
        } else {
            debug!(key, "Admission refused");
            response.set_status(STATUS_TOO_MANY_REQUESTS);
            response.write(b"Too many requests!\n");
        }
    }
}
