//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, TollgateError};
use crate::ratelimit::BucketPolicy;

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

impl ServerConfig {
    /// Resolve the bind address: an explicit override wins, then the `ADDR`
    /// environment variable, then the configured address.
    pub fn resolve_addr(&self, override_addr: Option<SocketAddr>) -> Result<SocketAddr> {
        resolve_addr_with(self.addr, override_addr, std::env::var("ADDR").ok())
    }
}

fn resolve_addr_with(
    configured: SocketAddr,
    override_addr: Option<SocketAddr>,
    env_addr: Option<String>,
) -> Result<SocketAddr> {
    if let Some(addr) = override_addr {
        return Ok(addr);
    }
    if let Some(raw) = env_addr {
        return raw
            .parse()
            .map_err(|_| TollgateError::Config(format!("invalid ADDR value: {}", raw)));
    }
    Ok(configured)
}

/// Rate limiting configuration: the default policy for unconfigured routes,
/// route-key normalization depth, and per-route limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Bucket policy applied to paths with no configured route
    #[serde(default = "default_limit")]
    pub default: LimitConfig,

    /// How many separator occurrences of the path make up the route key
    #[serde(default = "default_key_segments")]
    pub key_segments: usize,

    /// Per-route limits
    #[serde(default)]
    pub routes: Vec<RouteLimitConfig>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default: default_limit(),
            key_segments: default_key_segments(),
            routes: Vec::new(),
        }
    }
}

/// A bucket policy in configuration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Tokens added per second
    pub rate: f64,
    /// Maximum tokens held
    pub capacity: u64,
}

fn default_limit() -> LimitConfig {
    // Conservative policy for routes nobody thought about: one request, one
    // token per second.
    LimitConfig {
        rate: 1.0,
        capacity: 1,
    }
}

fn default_key_segments() -> usize {
    3
}

/// Limit configuration for a single route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLimitConfig {
    /// Route key path, e.g. `/v1/hello`
    pub path: String,
    /// Tokens added per second
    pub rate: f64,
    /// Maximum tokens held
    pub capacity: u64,
    /// Advisory per-request cost reported in the `X-Request-Cost` header
    #[serde(default = "default_cost")]
    pub cost: i64,
}

fn default_cost() -> i64 {
    1
}

impl LimitsConfig {
    /// Reject impossible rate/capacity pairs before any bucket is created.
    pub fn validate(&self) -> Result<()> {
        BucketPolicy::new(self.default.rate, self.default.capacity).map_err(|_| {
            TollgateError::Config(
                "default limit: rate and capacity must be positive".to_string(),
            )
        })?;
        for route in &self.routes {
            BucketPolicy::new(route.rate, route.capacity).map_err(|_| {
                TollgateError::Config(format!(
                    "route {}: rate and capacity must be positive",
                    route.path
                ))
            })?;
        }
        Ok(())
    }
}

impl TollgateConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TollgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| TollgateError::Config(e.to_string()))?;
        config.limits.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TollgateConfig::default();
        assert_eq!(config.server.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.limits.default.rate, 1.0);
        assert_eq!(config.limits.default.capacity, 1);
        assert_eq!(config.limits.key_segments, 3);
        assert!(config.limits.routes.is_empty());
    }

    #[test]
    fn test_parse_yaml_with_routes() {
        let yaml = r#"
server:
  addr: "0.0.0.0:9000"
limits:
  default:
    rate: 2.5
    capacity: 4
  routes:
    - path: /v1/hello
      rate: 5
      capacity: 10
    - path: /v1/time
      rate: 1
      capacity: 2
      cost: 2
"#;
        let config: TollgateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.limits.default.capacity, 4);
        assert_eq!(config.limits.routes.len(), 2);
        assert_eq!(config.limits.routes[0].cost, 1);
        assert_eq!(config.limits.routes[1].cost, 2);
        assert!(config.limits.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_route_limits() {
        let mut config = TollgateConfig::default();
        config.limits.routes.push(RouteLimitConfig {
            path: "/v1/hello".to_string(),
            rate: 0.0,
            capacity: 1,
            cost: 1,
        });

        let err = config.limits.validate().unwrap_err();
        assert!(err.to_string().contains("/v1/hello"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity_default() {
        let mut config = TollgateConfig::default();
        config.limits.default.capacity = 0;
        assert!(config.limits.validate().is_err());
    }

    #[test]
    fn test_addr_resolution_order() {
        let configured: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let flag: SocketAddr = "127.0.0.1:7000".parse().unwrap();

        // Explicit override wins over everything.
        assert_eq!(
            resolve_addr_with(configured, Some(flag), Some("127.0.0.1:6000".to_string())).unwrap(),
            flag
        );
        // Environment value wins over the configured address.
        assert_eq!(
            resolve_addr_with(configured, None, Some("127.0.0.1:6000".to_string())).unwrap(),
            "127.0.0.1:6000".parse().unwrap()
        );
        // Nothing set: configured address.
        assert_eq!(resolve_addr_with(configured, None, None).unwrap(), configured);
    }

    #[test]
    fn test_unparseable_env_addr_is_a_config_error() {
        let configured: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert!(resolve_addr_with(configured, None, Some("not-an-addr".to_string())).is_err());
    }
}
