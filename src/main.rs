//! graceful-drain demo server.
//!
//! Serves a small axum app behind the shutdown gate.
//!
//! ```text
//!                ┌──────────────────────────────────────────────┐
//!   SIGTERM ───▶ │ lifecycle::signals → lifecycle::shutdown     │
//!   SIGINT       │        │ stop accepting      │ deadline timer │
//!                │        ▼                     ▼                │
//!   Request ───▶ │ net::listener → http::gate → app routes       │
//!                │                   │ draining: 502, close      │
//!                └──────────────────────────────────────────────┘
//!                                exit 0 (drained) / exit 1 (timed out)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use axum::{extract::Path, routing::get, Router};
use clap::Parser;

use graceful_drain::config::{load_config, validate_config, ConfigError, DrainConfig};
use graceful_drain::observability::{logging, metrics};
use graceful_drain::Startup;

#[derive(Parser)]
#[command(name = "graceful-drain")]
#[command(about = "HTTP server that drains in-flight requests on SIGTERM/SIGINT", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind (defaults to loopback).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Drain deadline in milliseconds.
    #[arg(short, long)]
    timeout_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<DrainConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => DrainConfig::default(),
        };
        if let Some(host) = self.host {
            config.listener.host = Some(host);
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.shutdown.timeout_ms = timeout_ms;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "Hello from graceful-drain" }))
        .route("/health", get(|| async { "ok" }))
        .route("/slow/{ms}", get(slow))
}

/// Responds after `ms` milliseconds, handy for watching a drain.
async fn slow(Path(ms): Path<u64>) -> String {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("Finished after {} ms", ms)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability);
    tracing::info!("graceful-drain v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = Startup::new(config)
        .on_shutdown(|signal| tracing::info!(signal, "Shutdown callback invoked"))
        .start(app())
        .await?;

    // The coordinator exits the process itself; this only returns if exit is deferred.
    let outcome = server.wait().await;
    Ok(ExitCode::from(outcome.exit_code() as u8))
}
