//! pollroom server binary.
//!
//! Parses the CLI, initializes logging, and runs the poll service until
//! interrupted.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pollroom::cli::{handle_version, Cli, Command, StartArgs};
use pollroom::events::LogSink;
use pollroom::service::PollService;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        Command::Start(args) => run_service(args).await,
        Command::Version => handle_version(),
    }
}

/// Run the poll service until interrupted.
async fn run_service(args: StartArgs) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .init();

    let config = args.service_config();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("POLLROOM_GIT_HASH"),
        data_path = %config.data_path.display(),
        "starting pollroom"
    );

    let service = PollService::start(config, Arc::new(LogSink)).await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    service.shutdown().await;
}
