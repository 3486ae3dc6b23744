//! Autoforge CLI — the main entry point.
//!
//! Commands:
//! - `onboard`   — Write the default config and create the workspace
//! - `construct` — Build one feature request through the pipeline
//! - `evolve`    — Run the evolution scheduler until Ctrl-C
//! - `cycle`     — Force a single evolution cycle
//! - `status`    — Show configuration and scheduler state
//! - `providers` — Show backend profiles and routing decisions
//! - `history`   — List recorded construction runs

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "autoforge",
    about = "Autoforge — autonomous feature construction",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace
    Onboard,

    /// Plan, implement, review, and deploy a feature
    Construct {
        /// Natural-language description of the feature
        request: String,
    },

    /// Run the evolution scheduler until interrupted
    Evolve,

    /// Run one evolution cycle now (still bound by the daily cap)
    Cycle,

    /// Show system status
    Status,

    /// Show configured backends and how requests would be routed
    Providers,

    /// List recorded construction runs, newest first
    History {
        /// Maximum number of records to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
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
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Construct { request } => commands::construct::run(&request).await?,
        Commands::Evolve => commands::evolve::run().await?,
        Commands::Cycle => commands::cycle::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Providers => commands::providers::run().await?,
        Commands::History { limit } => commands::history::run(limit).await?,
    }

    Ok(())
}
