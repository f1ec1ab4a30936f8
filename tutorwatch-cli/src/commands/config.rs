//! `tutorwatch config` subcommands

use std::path::Path;

use crate::config::{ConfigLoader, PROJECT_CONFIG_DIR_ENV, TutorwatchConfig};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration and the endpoints it resolves to
    Show,
    /// Show which configuration layers are read, in merge order
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", toml::to_string_pretty(&config)?);
    for line in endpoint_lines(&config) {
        println!("{line}");
    }
    Ok(())
}

fn show_paths() -> Result<()> {
    let user = ConfigLoader::user_config_path();
    let project = ConfigLoader::project_config_path();
    let env_override = std::env::var(PROJECT_CONFIG_DIR_ENV).ok();
    for line in layer_lines(user.as_deref(), &project, env_override.as_deref()) {
        println!("{line}");
    }
    Ok(())
}

/// Endpoints the monitor will talk to under `config`.
fn endpoint_lines(config: &TutorwatchConfig) -> Vec<String> {
    let client = config.client_config();
    vec![
        "# Effective endpoints".to_string(),
        format!("stream:  GET  {}", client.stream_url()),
        format!("start:   POST {}", client.endpoint("start")),
        format!("stop:    POST {}", client.endpoint("stop")),
        format!("health:  GET  {}", client.endpoint("health")),
    ]
}

/// One line per layer, lowest precedence first.
fn layer_lines(user: Option<&Path>, project: &Path, env_override: Option<&str>) -> Vec<String> {
    let mut lines = vec!["1. built-in defaults".to_string()];

    match user {
        Some(path) => lines.push(format!(
            "2. user config:    {} ({})",
            path.display(),
            layer_state(path)
        )),
        None => lines.push("2. user config:    unavailable (no home directory)".to_string()),
    }

    let source = match env_override {
        Some(dir) => format!("from {PROJECT_CONFIG_DIR_ENV}={dir}"),
        None => "relative to the working directory".to_string(),
    };
    lines.push(format!(
        "3. project config: {} ({}, {})",
        project.display(),
        layer_state(project),
        source
    ));
    lines.push("4. command-line flags (--url, --set-type)".to_string());
    lines
}

fn layer_state(path: &Path) -> &'static str {
    if path.exists() { "found" } else { "not present" }
}
