use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatrelay::config::{Config, Credentials};
use chatrelay::dispatch::{DispatchOptions, Dispatcher};
use chatrelay::llm::ProviderRegistry;
use chatrelay::server::{AppState, build_app};

#[derive(Parser)]
#[command(name = "chatrelay", version, about = "Multi-provider chat completion relay")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "chatrelay.yaml")]
    config: PathBuf,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let credentials = Credentials::from_env(&config.providers);
    let registry = ProviderRegistry::from_config(
        &config.providers,
        &credentials,
        Duration::from_secs(config.dispatch.connect_timeout_seconds),
    )
    .context("building HTTP client")?;

    let dispatcher = Dispatcher::new(
        registry,
        DispatchOptions {
            chunk_delay: Duration::from_millis(config.dispatch.chunk_delay_ms),
            error_excerpt_chars: config.dispatch.error_excerpt_chars,
            attempt_timeout: Duration::from_secs(config.dispatch.attempt_timeout_seconds),
        },
    );
    let app = build_app(
        AppState { dispatcher },
        config.server.request_timeout_seconds,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
