//! Tollgate - Admission-Control Middleware
//!
//! This crate implements an admission-control layer for request-serving
//! systems: a token-bucket rate limiter, a per-route bucket registry, and a
//! composable middleware pipeline that applies the limiter to inbound
//! requests before they reach business handlers.

pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod ratelimit;
pub mod server;
