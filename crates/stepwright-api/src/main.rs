//! Stepwright CLI and REST API entry point.
//!
//! Binary name: `stepwright`
//!
//! Parses CLI arguments, loads configuration, initializes the database and
//! services, then dispatches to a command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use stepwright_infra::config::{load_global_config, resolve_data_dir};
use stepwright_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "stepwright", &mut std::io::stdout());
        return Ok(());
    }

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,stepwright=debug",
        _ => "trace",
    };

    let data_dir = resolve_data_dir();
    let config = load_global_config(&data_dir).await;

    init_tracing(filter, config.enable_otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init(data_dir, config).await?;

    let result = run(cli.command, &state, cli.json).await;
    shutdown_tracing();
    result
}

async fn run(command: Commands, state: &AppState, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Workflow { action } => {
            cli::workflow::handle_workflow_command(action, state, json).await?;
        }

        Commands::Template { action } => {
            cli::template::handle_template_command(action, state, json).await?;
        }

        Commands::Token { action } => {
            cli::token::handle_token_command(action, state, json).await?;
        }

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!();
            println!(
                "  {} Stepwright API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}/api/v1")).cyan()
            );
            println!(
                "  {} Mint a write token with: {}",
                console::style("🔑").bold(),
                console::style("stepwright token issue").yellow()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());
            println!();

            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
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
}
