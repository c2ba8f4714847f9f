//! Composable request-interception pipeline.
//!
//! Each stage wraps its successor and is free to run logic before and after
//! forwarding, or to short-circuit without forwarding at all. Chains are
//! built by explicit construction at wiring time, from the outermost stage
//! down to the business handler. Ordering matters for observability: stages
//! positioned outside the rate-limit gate observe rejected requests too,
//! stages positioned inside do not run when a request is rejected.

mod headers;
mod logging;
mod rate_limit;
mod router;

pub use headers::ResponseHeader;
pub use logging::Logger;
pub use rate_limit::{RateLimitGate, COST_HEADER};
pub use router::Router;

use async_trait::async_trait;

/// Status code for admitted requests that completed normally.
pub const STATUS_OK: u16 = 200;
/// Status code for paths with no registered handler.
pub const STATUS_NOT_FOUND: u16 = 404;
/// Status code for refused requests.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Inbound request descriptor: the narrow interface the pipeline consumes.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method, e.g. `GET`
    pub method: String,
    /// Request path, e.g. `/v1/hello/extra`
    pub path: String,
    /// Header name/value pairs in arrival order
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Create a request with no headers.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Outbound response writer: status, headers, and body, in that order of
/// authority. The narrow interface the pipeline produces into.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Create an empty response with status 200.
    pub fn new() -> Self {
        Self {
            status: STATUS_OK,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Current status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Set the status code.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Set a header, replacing any existing values for the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .retain(|(candidate, _)| !candidate.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Append a header without disturbing existing values.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Append bytes to the response body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// A pipeline stage: accept a request and a response sink, optionally
/// short-circuit, otherwise invoke the wrapped successor.
///
/// Business handlers implement the same trait and sit at the end of the
/// chain as the stage with no successor.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Request, response: &mut Response);
}

/// Adapts a plain function into a terminal pipeline stage.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F>
where
    F: Fn(&Request, &mut Response) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Request, &mut Response) + Send + Sync,
{
    async fn handle(&self, request: &Request, response: &mut Response) {
        (self.f)(request, response)
    }
}
