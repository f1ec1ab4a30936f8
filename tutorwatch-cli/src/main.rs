use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "tutorwatch", about = "Live monitor for AI tutoring evaluation runs")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the agent service (overrides `server.base_url`)
    #[arg(long, global = true)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the agent's event stream and print the reconciled feed
    Watch(commands::watch::WatchArgs),
    /// Ask the agent to start a run
    Start(commands::control::StartArgs),
    /// Ask the agent to stop the current run
    Stop,
    /// Check that the agent service is reachable
    Health,
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = match cli.command {
        Commands::Config(args) => return commands::config::run(args),
        command => command,
    };

    let mut config = ConfigLoader::load()?;
    if let Some(url) = cli.url {
        config.server.base_url = url;
    }

    match command {
        Commands::Watch(args) => commands::watch::run(args, &config).await,
        Commands::Start(args) => commands::control::start(args, &config).await,
        Commands::Stop => commands::control::stop(&config).await,
        Commands::Health => commands::control::health(&config).await,
        Commands::Config(args) => commands::config::run(args),
    }
}
