//! Pulsefeed service entry point.
//!
//! Binary name: `pfeed`
//!
//! Parses CLI arguments, initializes the database and components, then
//! serves the REST API until interrupted.

mod dispatch;
mod http;
mod state;

use std::path::PathBuf;

use clap::Parser;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "pfeed", about = "Personalized content feed service", version)]
struct Cli {
    /// Data directory for the database and config file.
    #[arg(long, env = "PULSEFEED_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Address to bind the API server to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Export spans via OpenTelemetry (stdout exporter).
    #[arg(long)]
    otel: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,pulsefeed=debug",
        _ => "trace",
    };
    pulsefeed_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let state = AppState::init(cli.data_dir).await?;

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!(addr = %cli.bind, "pulsefeed API listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pulsefeed_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
