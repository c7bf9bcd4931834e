//! StrataDesk CLI, the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config (at `--config` or `~/.stratadesk/`) and sample passages
//! - `chat`: Draft replies interactively, for a single message, or for the demo exchange
//! - `status`: Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stratadesk",
    about = "StrataDesk — draft client replies for strata managers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.stratadesk/config.toml)
    #[arg(long, global = true, env = "STRATADESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration (at --config if given) and a sample knowledge file
    Onboard,

    /// Draft replies to client messages
    Chat {
        /// Draft a reply to a single message instead of entering interactive mode
        #[arg(short, long, conflicts_with = "demo")]
        message: Option<String>,

        /// Run the built-in AGM demo conversation
        #[arg(long)]
        demo: bool,
    },

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run(cli.config.as_deref()).await?,
        Commands::Chat { message, demo } => {
            commands::chat::run(cli.config.as_deref(), message, demo).await?
        }
        Commands::Status => commands::status::run(cli.config.as_deref()).await?,
    }

    Ok(())
}
