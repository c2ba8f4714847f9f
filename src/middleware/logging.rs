//! Request logging stage.

use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use super::{Handler, Request, Response};

/// Logs method, path, outcome, and elapsed wall time of the wrapped
/// invocation. Never alters the response and always forwards, so placing it
/// outermost makes it observe rejected requests too.
pub struct Logger {
    next: Box<dyn Handler>,
}

impl Logger {
    pub fn new(next: Box<dyn Handler>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Handler for Logger {
    async fn handle(&self, request: &Request, response: &mut Response) {
        let start = Instant::now();
        self.next.handle(request, response).await;
        info!(
            method = %request.method,
            path = %request.path,
            status = response.status(),
            elapsed = ?start.elapsed(),
            "Request handled"
        );
    }
}
