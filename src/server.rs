//! Minimal HTTP transport adapter.
//!
//! The pipeline core only speaks [`Request`] and [`Response`]; this module
//! is the boundary collaborator that translates a socket into those types.
//! It reads one request line plus headers, runs the pipeline, writes the
//! status, headers, and body back, and closes the connection. Anything
//! beyond that (keep-alive, bodies, TLS) is out of scope.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TollgateError};
use crate::middleware::{Handler, Request, Response};

/// Serves a middleware pipeline over TCP, one spawned task per connection.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Pipeline root
    handler: Arc<dyn Handler>,
}

impl HttpServer {
    /// Create a new server fronting the given pipeline root.
    pub fn new(addr: SocketAddr, handler: Arc<dyn Handler>) -> Self {
        Self { addr, handler }
    }

    /// Start the server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server with graceful shutdown.
    ///
    /// The accept loop stops when the provided signal resolves; connections
    /// already spawned run to completion on the runtime.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Server is listening");

        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown signal received, stopping accept loop");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let handler = Arc::clone(&self.handler);
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handler).await {
                            debug!(peer = %peer, error = %e, "Connection failed");
                        }
                    });
                }
            }
        }
    }
}

/// Handle one connection: read a request, run the pipeline, write the reply.
async fn serve_connection(stream: TcpStream, handler: Arc<dyn Handler>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = read_request(&mut reader).await?;
    let mut response = Response::new();
    handler.handle(&request, &mut response).await;

    write_response(&mut write_half, &response).await?;
    write_half.shutdown().await?;
    Ok(())
}

/// Parse the request line and headers; the body, if any, is ignored.
async fn read_request<R>(reader: &mut R) -> Result<Request>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| TollgateError::Http("empty request line".to_string()))?;
    let path = parts
        .next()
        .ok_or_else(|| TollgateError::Http("request line missing path".to_string()))?;
    let mut request = Request::new(method, path);

    loop {
        let mut header = String::new();
        let read = reader.read_line(&mut header).await?;
        let header = header.trim_end();
        if read == 0 || header.is_empty() {
            break;
        }
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| TollgateError::Http(format!("malformed header: {}", header)))?;
        request
            .headers
            .push((name.trim().to_string(), value.trim().to_string()));
    }

    Ok(request)
}

/// Write status line, headers, and body.
async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status(),
        reason_phrase(response.status())
    );
    for (name, value) in response.headers() {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body().len()
    ));

    writer.write_all(head.as_bytes()).await?;
    writer.write_all(response.body()).await?;
    Ok(())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::HandlerFn;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_read_request_parses_line_and_headers() {
        let raw = b"GET /v1/hello/extra HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);

        let request = read_request(&mut reader).await.unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/v1/hello/extra");
        assert_eq!(request.header("host"), Some("localhost"));
        assert_eq!(request.header("accept"), Some("*/*"));
    }

    #[tokio::test]
    async fn test_read_request_rejects_garbage() {
        let raw = b"\r\n";
        let mut reader = BufReader::new(&raw[..]);
        assert!(read_request(&mut reader).await.is_err());

        let raw = b"GET /p HTTP/1.1\r\nnot-a-header\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);
        assert!(read_request(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_write_response_emits_status_headers_and_body() {
        let mut response = Response::new();
        response.set_status(429);
        response.set_header("X-Request-Cost", "1");
        response.write(b"Too many requests!\n");

        let mut out = Vec::new();
        write_response(&mut out, &response).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 429 Too Many Requests\r\n"));
        assert!(text.contains("X-Request-Cost: 1\r\n"));
        assert!(text.contains("Content-Length: 19\r\n"));
        assert!(text.ends_with("\r\n\r\nToo many requests!\n"));
    }

    #[tokio::test]
    async fn test_server_round_trip() {
        let handler = HandlerFn::new(|request: &Request, response: &mut Response| {
            response.write(format!("echo {}", request.path).as_bytes());
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let server = HttpServer::new(addr, Arc::new(handler));
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            server
                .serve_with_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        // Give the accept loop a moment to bind.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /v1/hello HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();

        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.ends_with("echo /v1/hello"));

        let _ = shutdown_tx.send(());
        server_task.await.unwrap().unwrap();
    }
}
