// crates/reqscan-daemon/src/main.rs
//!
//! This file is intentionally thin: it loads config, opens the storage
//! adapter and queue for one prefix, builds the shared session, spawns the
//! single dispatcher loop, and starts the status server. Route handlers
//! live in `routes.rs`; shared state lives in `state.rs`; the dispatch loop
//! lives in `worker.rs`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use reqscan_config::Config;
use reqscan_daemon::{routes, state::AppState, worker};
use reqscan_db::{RequestQueue, StorageAdapter};
use reqscan_http::ProbeSession;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "reqscan-daemon")]
#[command(about = "Request queue dispatcher and probe session for one scan table")]
struct Cli {
    /// Scan table prefix, e.g. "login_form".
    #[arg(long)]
    prefix: String,

    /// Layered JSON config paths (merged in order); falls back to env vars
    /// for any key not present in any file.
    #[arg(long = "config")]
    config_paths: Vec<String>,

    /// Address the status server binds to.
    #[arg(long, default_value = "127.0.0.1:8090")]
    bind_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let config = if cli.config_paths.is_empty() {
        Config::from_env()
    } else {
        let paths: Vec<&str> = cli.config_paths.iter().map(String::as_str).collect();
        Config::load(&paths)?
    };

    let database_url = config.database_url().context("storage.database_url")?;
    let max_connections = config.storage_max_connections();
    let adapter = Arc::new(StorageAdapter::connect(&database_url, max_connections).await?);
    let queue = Arc::new(RequestQueue::open(adapter, &cli.prefix).await?);

    let max_concurrent = config
        .max_concurrent_request()
        .context("scanner.max_concurrent_request")?;
    let timeout_secs = config
        .request_timeout_secs()
        .context("scanner.request_timeout")?;
    let retry_times = config.retry_times().context("scanner.retry_times")?;
    let session = Arc::new(ProbeSession::new(
        max_concurrent,
        Duration::from_secs_f64(timeout_secs),
        retry_times,
    )?);

    tokio::spawn(worker::run(Arc::clone(&queue), Arc::clone(&session)));

    let shared = Arc::new(AppState::new(queue, session, cli.prefix.clone()));
    let app = routes::build_router(shared).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    info!("reqscan-daemon listening on http://{}", cli.bind_addr);
    axum::serve(tokio::net::TcpListener::bind(cli.bind_addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
