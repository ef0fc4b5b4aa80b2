//! Relay server and CLI entry point.
//!
//! Binary name: `relayd`
//!
//! Parses CLI arguments, loads configuration, connects the message store,
//! then either serves the relay or runs a one-shot command.

mod cli;
mod http;
mod state;

use std::sync::Arc;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use relay_core::hub::Hub;
use relay_infra::config::{load_config, resolve_data_dir};
use relay_infra::store::DatabaseStore;
use relay_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need configuration or logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "relayd", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(verbosity_filter(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    let mut config = load_config(cli.config.as_deref(), &data_dir).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let (state, queue) = AppState::init(&config, &data_dir).await?;

            let server = &state.config.server;
            let addr = format!("{}:{}", server.host, server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            let shutdown = CancellationToken::new();
            let hub_task = {
                let hub = Arc::clone(&state.hub);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { hub.run(queue, shutdown).await })
            };

            tracing::info!(
                addr = %addr,
                backend = state.store.backend(),
                "relay listening"
            );
            if !cli.quiet && !cli.json {
                println!(
                    "  {} Relay listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("ws://{addr}/ws")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let hub = Arc::clone(&state.hub);
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(Arc::clone(&hub), shutdown.clone()))
                .await?;

            // Covers the server exiting for a reason other than a signal.
            shutdown.cancel();
            hub.shutdown();
            if let Err(e) = hub_task.await {
                tracing::warn!(error = %e, "broadcast loop panicked");
            }

            tracing::info!("relay stopped");
        }

        Commands::History => {
            let store = DatabaseStore::open(&config.database, &data_dir).await?;
            cli::history::history(&store, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then stop the broadcast loop and close every
/// live connection.
///
/// Open WebSocket connections keep graceful shutdown from completing, so
/// they are closed here rather than after `axum::serve` returns.
async fn shutdown_signal(hub: Arc<Hub<DatabaseStore>>, shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    shutdown.cancel();
    hub.shutdown();
}
