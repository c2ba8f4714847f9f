//! Response header injection stage.

use async_trait::async_trait;

use super::{Handler, Request, Response};

/// Adds one fixed header to the outgoing response before forwarding.
/// Always forwards.
pub struct ResponseHeader {
    next: Box<dyn Handler>,
    name: String,
    value: String,
}

impl ResponseHeader {
    pub fn new(next: Box<dyn Handler>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            next,
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl Handler for ResponseHeader {
    async fn handle(&self, request: &Request, response: &mut Response) {
        // Injected before forwarding, so inner stages see it and may still
        // override it.
        response.add_header(&self.name, &self.value);
        self.next.handle(request, response).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::HandlerFn;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_header_is_injected_and_request_forwarded() {
        let forwarded = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&forwarded);
        let terminal = HandlerFn::new(move |_: &Request, _: &mut Response| {
            probe.store(true, Ordering::SeqCst);
        });
        let stage = ResponseHeader::new(Box::new(terminal), "X-My-Header", "My header value");

        let request = Request::new("GET", "/v1/hello");
        let mut response = Response::new();
        stage.handle(&request, &mut response).await;

        assert!(forwarded.load(Ordering::SeqCst));
        assert_eq!(response.header("X-My-Header"), Some("My header value"));
    }

    #[tokio::test]
    async fn test_inner_stage_sees_the_injected_header() {
        let terminal = HandlerFn::new(|_: &Request, response: &mut Response| {
            let echoed = response.header("X-My-Header").unwrap_or("missing").to_string();
            response.write(echoed.as_bytes());
        });
        let stage = ResponseHeader::new(Box::new(terminal), "X-My-Header", "seen");

        let request = Request::new("GET", "/v1/hello");
        let mut response = Response::new();
        stage.handle(&request, &mut response).await;

        assert_eq!(response.body(), b"seen");
    }
}
