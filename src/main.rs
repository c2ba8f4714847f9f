use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};

use tollgate::clock::MonotonicClock;
use tollgate::config::{RouteLimitConfig, TollgateConfig};
use tollgate::middleware::{
    HandlerFn, Logger, RateLimitGate, Request, Response, ResponseHeader, Router,
};
use tollgate::ratelimit::BucketRegistry;
use tollgate::server::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "tollgate", about = "Admission-control middleware service")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding configuration and the ADDR variable
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    info!("Starting Tollgate admission control");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => TollgateConfig::from_file(path)?,
        None => demo_config(),
    };
    let addr = config.server.resolve_addr(args.addr)?;
    info!(addr = %addr, routes = config.limits.routes.len(), "Configuration loaded");

    let registry = Arc::new(BucketRegistry::new(Arc::new(MonotonicClock::default())));
    info!("Bucket registry initialized");

    let router = Router::new()
        .route("/v1/hello", Box::new(HandlerFn::new(hello)))
        .route("/v1/time", Box::new(HandlerFn::new(current_time)));

    // Logging outermost so refused requests are logged too; the gate is the
    // only stage that may short-circuit.
    let gate = RateLimitGate::new(Box::new(router), Arc::clone(&registry), &config.limits)?;
    let with_header = ResponseHeader::new(Box::new(gate), "X-My-Header", "My header value");
    let pipeline = Logger::new(Box::new(with_header));

    let server = HttpServer::new(addr, Arc::new(pipeline));
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Tollgate stopped");
    Ok(())
}

/// Built-in route limits used when no configuration file is given, mirroring
/// the demo endpoints registered above.
fn demo_config() -> TollgateConfig {
    let mut config = TollgateConfig::default();
    config.limits.routes = vec![
        RouteLimitConfig {
            path: "/v1/hello".to_string(),
            rate: 5.0,
            capacity: 10,
            cost: 1,
        },
        RouteLimitConfig {
            path: "/v1/time".to_string(),
            rate: 1.0,
            capacity: 2,
            cost: 2,
        },
    ];
    config
}

fn hello(request: &Request, response: &mut Response) {
    response.write(format!("Hello, World!\nThis is the path: {}\n", request.path).as_bytes());
}

fn current_time(_request: &Request, response: &mut Response) {
    let now = chrono::Local::now().to_rfc3339();
    response.write(format!("The current time is {}\n", now).as_bytes());
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
