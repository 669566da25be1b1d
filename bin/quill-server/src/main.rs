//! quill-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables and the command line.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Resolve the Gemini API key and build the backend client.
//! 4. Bind the persona to the client and build the completion adapter.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.
//!
//! `quill-server list-models` stops after step 3 and prints the models that
//! support `generateContent`.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;


use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use quill_core::credentials::resolve_api_key;
use quill_core::{CompletionAdapter, GeminiClient};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "quill-server", version, about = "Persona chat gateway for Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Override `QUILL_BIND`.
    #[arg(long, global = true)]
    bind: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the backend models that support content generation.
    ListModels,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    if let Some(bind) = cli.bind {
        cfg.bind_address = bind;
    }

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "quill-server starting");

    // ── 3. Backend client ──────────────────────────────────────────────────────
    let api_key = resolve_api_key(Some(cfg.secrets_file.as_path()))?;
    let client = GeminiClient::new(cfg.gemini_options(api_key))?;
    info!(model = %client.model(), base_url = %cfg.gemini_base_url, "gemini client ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::ListModels => list_models(&client).await,
        Command::Serve => serve(cfg, client).await,
    }
}

fn init_tracing(cfg: &Config) {
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: QUILL_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn list_models(client: &GeminiClient) -> anyhow::Result<()> {
    for model in client.list_models().await?.iter().filter(|m| m.supports_generation()) {
        println!("{}", model.name);
    }
    Ok(())
}

async fn serve(mut cfg: Config, client: GeminiClient) -> anyhow::Result<()> {
    // ── 4. Persona + adapter ───────────────────────────────────────────────────
    // Report the normalised model name (no `models/` prefix) everywhere.
    cfg.model = client.model().to_owned();
    let handle = cfg.persona_config()?.configure(Arc::new(client))?;
    info!(persona = %handle.persona().mode(), "persona configured");
    let adapter = CompletionAdapter::new(handle);

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::new(cfg, adapter)?);
    let sweeper = tokio::spawn(state::sweep_idle_sessions(Arc::clone(&state.sessions)));
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("quill-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
