//! Terminal stage dispatching requests to registered business handlers.

use async_trait::async_trait;
use tracing::debug;

use super::{Handler, Request, Response, STATUS_NOT_FOUND};

/// Maps request paths to business handlers and terminates the pipeline.
///
/// A handler registered at `/v1/hello` also receives requests for sub-paths
/// beneath it; when several registrations match, the longest prefix wins.
/// Unmatched paths get a 404.
pub struct Router {
    routes: Vec<(String, Box<dyn Handler>)>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a handler for `path` and its sub-paths.
    pub fn route(mut self, path: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.routes.push((path.into(), handler));
        self
    }

    fn lookup(&self, path: &str) -> Option<&dyn Handler> {
        self.routes
            .iter()
            .filter(|(prefix, _)| {
                path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path.as_bytes().get(prefix.len()) == Some(&b'/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, handler)| handler.as_ref())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for Router {
    async fn handle(&self, request: &Request, response: &mut Response) {
        match self.lookup(&request.path) {
            Some(handler) => handler.handle(request, response).await,
            None => {
                debug!(path = %request.path, "No handler registered");
                response.set_status(STATUS_NOT_FOUND);
                response.write(b"Not found\n");
            }
        }
    }
}
