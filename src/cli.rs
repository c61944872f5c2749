//! CLI definitions and handlers.
//!
//! Uses clap derive for the command hierarchy:
//! - `start` (default) -- run the poll service
//! - `version` -- print build/version info

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ServiceConfig;

/// Poll lifecycle and voting engine for chat groups.
#[derive(Parser, Debug)]
#[command(
    name = "pollroom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Poll lifecycle and voting engine for chat groups"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the poll service (default when no subcommand is given).
    Start(StartArgs),

    /// Print version, build date, and git commit information.
    Version,
}

impl Default for Command {
    fn default() -> Self {
        Command::Start(StartArgs::default())
    }
}

/// Arguments for the `start` subcommand.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Path of the poll archive file.
    #[arg(long, default_value = "polls_data.json")]
    pub data_path: PathBuf,

    /// Seconds between expiration sweeps.
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    /// Seconds between autosave passes.
    #[arg(long, default_value_t = 300)]
    pub save_interval: u64,

    /// Default poll duration in minutes for drafts that set none.
    #[arg(long, default_value_t = 60)]
    pub default_duration: u64,

    /// Log filter (tracing EnvFilter syntax).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for StartArgs {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("polls_data.json"),
            sweep_interval: 60,
            save_interval: 300,
            default_duration: 60,
            log_level: "info".to_string(),
        }
    }
}

impl StartArgs {
    /// Build the service configuration from the CLI arguments.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            data_path: self.data_path.clone(),
            sweep_interval_secs: self.sweep_interval,
            save_interval_secs: self.save_interval,
            default_duration_mins: self.default_duration,
        }
    }
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("pollroom {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("POLLROOM_BUILD_DATE"));
    println!("  Git commit: {}", env!("POLLROOM_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
