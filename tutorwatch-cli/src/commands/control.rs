//! One-shot run control commands

use anyhow::{Context, Result};
use clap::Args;
use tutorwatch_client::ControlClient;

use crate::config::TutorwatchConfig;

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Problem set to run (defaults to `run.set_type`)
    #[arg(long)]
    pub set_type: Option<String>,
}

pub async fn start(args: StartArgs, config: &TutorwatchConfig) -> Result<()> {
    let set_type = args.set_type.as_deref().unwrap_or(&config.run.set_type);
    let client = ControlClient::new(config.client_config())?;
    client
        .start(set_type)
        .await
        .context("Failed to start run")?;
    println!("Agent started with set: {}", set_type);
    Ok(())
}

pub async fn stop(config: &TutorwatchConfig) -> Result<()> {
    let client = ControlClient::new(config.client_config())?;
    client.stop().await.context("Failed to stop run")?;
    println!("Stop requested");
    Ok(())
}

pub async fn health(config: &TutorwatchConfig) -> Result<()> {
    let client = ControlClient::new(config.client_config())?;
    let health = client
        .health()
        .await
        .with_context(|| format!("Agent service unreachable at {}", config.server.base_url))?;
    println!("Status:        {}", health.status);
    println!(
        "Agent running: {}",
        if health.agent_running { "yes" } else { "no" }
    );
    Ok(())
}
