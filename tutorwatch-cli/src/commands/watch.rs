//! Live feed of the agent's event stream

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};
use tutorwatch_client::{Monitor, MonitorEvent};
use tutorwatch_core::Outcome;

use crate::config::TutorwatchConfig;
use crate::render;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Start a run once the stream is open
    #[arg(long)]
    pub start: bool,

    /// Problem set to run with --start (defaults to `run.set_type`)
    #[arg(long, requires = "start")]
    pub set_type: Option<String>,

    /// Exit once the backend reports every session complete
    #[arg(long)]
    pub exit_on_complete: bool,
}

pub async fn run(args: WatchArgs, config: &TutorwatchConfig) -> Result<()> {
    let client_config = config.client_config();
    let stream_url = client_config.stream_url();
    let mut monitor = Monitor::new(client_config, &config.engine)?;

    monitor
        .connect()
        .await
        .with_context(|| format!("Failed to open event stream at {}", stream_url))?;
    info!(url = %stream_url, "Watching agent stream");

    if args.start {
        let set_type = args.set_type.as_deref().unwrap_or(&config.run.set_type);
        monitor
            .start_run(set_type)
            .await
            .context("Failed to start run")?;
    }

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        let event = tokio::select! {
            _ = &mut interrupt => {
                info!("Interrupted");
                break;
            }
            event = monitor.next_event() => event,
        };

        match event {
            None => break,
            Some(MonitorEvent::Applied(outcome)) => {
                print_outcome(&monitor, &outcome);
                if outcome.run_completed && args.exit_on_complete {
                    break;
                }
            }
            Some(MonitorEvent::Discarded) => {}
            Some(MonitorEvent::StatusChanged(status)) => {
                info!(%status, "Run status changed");
            }
            Some(MonitorEvent::StreamClosed) => {
                warn!("Event stream closed by the server");
            }
        }
    }

    monitor.disconnect();
    println!();
    println!("{}", render::summary(monitor.reconciler(), monitor.status()));
    Ok(())
}

fn print_outcome(monitor: &Monitor, outcome: &Outcome) {
    if let Some(info) = &outcome.session_started {
        println!("{}", render::session_header(info));
    }
    if let Some(entry) = &outcome.logged {
        println!("{}", render::log_line(entry));
    }
    let scores = monitor.reconciler().store().scores();
    for kind in &outcome.scores {
        if let Some(value) = scores.get(*kind) {
            println!("{}", render::score_line(*kind, value));
        }
    }
}
