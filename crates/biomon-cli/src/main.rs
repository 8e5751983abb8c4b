use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod script;
mod sim;

use commands::config::check_config_command;
use commands::replay::{replay_command, OutputFormat};

#[derive(Parser)]
#[command(name = "biomon")]
#[command(about = "Replay biometric HAL sessions against the session monitor", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted event trace against one session
    Replay {
        /// Path to the replay script (TOML)
        script: PathBuf,

        /// Monitor configuration file (defaults to the user config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Treat this process as the session owner and watch it for death
        #[arg(long)]
        owner_pid: Option<u32>,
    },
    /// Print the effective monitor configuration
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    match cli.command {
        Commands::Replay {
            script,
            config,
            format,
            owner_pid,
        } => replay_command(&script, config.as_deref(), format, owner_pid),
        Commands::CheckConfig { config } => check_config_command(config.as_deref()),
    }
}
