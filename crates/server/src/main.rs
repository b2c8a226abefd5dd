//! Draftloop Server
//!
//! Axum server exposing the research/draft/review pipeline over HTTP, plus a
//! terminal mode that drives a single session interactively.

mod api;
mod cli;
mod config;

use clap::{Parser, Subcommand};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use draftloop_core::{Coordinator, CoordinatorConfig};

use crate::api::AppState;
use crate::config::PersistedConfig;

#[derive(Parser, Clone)]
#[command(author, version, about = "Draftloop - research, draft and review articles")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// Draft an article on a topic and review it in the terminal
    Run {
        /// Topic to research and write about
        topic: String,
    },
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Defaults, then `.draftloop/config.json`, then the environment
async fn load_config() -> CoordinatorConfig {
    let persisted = PersistedConfig::load(&config::default_path()).await;
    persisted
        .apply_to(CoordinatorConfig::default())
        .apply_env_overrides()
}

pub async fn run_server(coordinator: Arc<Coordinator>, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        coordinator,
        config_path: config::default_path(),
    });
    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Draftloop server running at http://{}", addr);
    tracing::info!("   Sessions: POST /start, GET /state/{{thread_id}}, POST /feedback, GET /sessions");
    tracing::info!("   Events:   GET /api/v1/events (SSE)");
    tracing::info!("   Config:   /api/v1/config (GET, PATCH)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before provider clients read their keys
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config().await;
    let coordinator = Arc::new(Coordinator::from_config(config)?);

    match args.command {
        Some(CliCommand::Run { topic }) => cli::run_review(&coordinator, &topic).await,
        Some(CliCommand::Serve { port }) => run_server(coordinator, port).await,
        None => run_server(coordinator, 8000).await,
    }
}
