//! Single-threaded monitor loop.
//!
//! The monitor owns the reconciled state, the run status machine, the
//! stream connection and the control client. Frames are reconciled on the
//! task that drives [`Monitor::next_event`], one at a time and to
//! completion, so no state is ever written concurrently.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use tutorwatch_core::{AgentRunStatus, EngineConfig, Outcome, Reconciler, RunStatusMachine};

use crate::config::ClientConfig;
use crate::control::ControlClient;
use crate::error::{ClientError, Result};
use crate::stream::StreamConnection;

/// Something the monitor loop observed.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A frame was reconciled
    Applied(Outcome),
    /// A frame could not be decoded and was dropped
    Discarded,
    /// The run status changed outside a control call
    StatusChanged(AgentRunStatus),
    /// The stream ended; nothing reconnects it automatically
    StreamClosed,
}

/// Drives reconciliation for one monitoring client.
#[derive(Debug)]
pub struct Monitor {
    config: ClientConfig,
    reconciler: Reconciler,
    status: RunStatusMachine,
    control: ControlClient,
    stream: StreamConnection,
    settle_at: Option<Instant>,
}

impl Monitor {
    pub fn new(config: ClientConfig, engine: &EngineConfig) -> Result<Self> {
        engine.validate()?;
        Self::with_reconciler(config, Reconciler::new(engine))
    }

    pub fn with_reconciler(config: ClientConfig, reconciler: Reconciler) -> Result<Self> {
        let control = ControlClient::new(config.clone())?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                url: config.stream_url(),
                source,
            })?;
        let stream = StreamConnection::new(http, config.stream_url());

        Ok(Self {
            config,
            reconciler,
            status: RunStatusMachine::new(),
            control,
            stream,
            settle_at: None,
        })
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn status(&self) -> AgentRunStatus {
        self.status.status()
    }

    pub fn control(&self) -> &ControlClient {
        &self.control
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_active()
    }

    /// Opens a fresh stream connection.
    pub async fn connect(&mut self) -> Result<()> {
        self.stream.activate().await
    }

    /// Closes the stream. Reconciled state stays as it is.
    pub fn disconnect(&mut self) {
        self.stream.deactivate();
    }

    /// Starts a run: optimistically enters `running`, clears run-scoped
    /// state, then asks the backend. A failed request reverts to `idle`.
    pub async fn start_run(&mut self, set_type: &str) -> Result<()> {
        if !self.status.begin_start() {
            return Err(ClientError::InvalidStatus {
                action: "start",
                status: self.status.status(),
            });
        }

        self.reconciler.reset_for_run_start();
        self.settle_at = None;

        if let Err(e) = self.control.start(set_type).await {
            warn!(error = %e, "Start request failed");
            self.status.start_failed();
            return Err(e);
        }
        Ok(())
    }

    /// Stops a run: enters `stopping`, asks the backend, and arms the settle
    /// timer whether or not the request succeeded. Frames keep being
    /// reconciled until the timer returns the status to `idle`.
    pub async fn stop_run(&mut self) -> Result<()> {
        if !self.status.begin_stop() {
            return Err(ClientError::InvalidStatus {
                action: "stop",
                status: self.status.status(),
            });
        }

        let result = self.control.stop().await;
        if let Err(e) = &result {
            warn!(error = %e, "Stop request failed");
        }
        self.settle_at = Some(Instant::now() + self.config.settle_delay);
        result
    }

    /// Time left before a pending stop settles.
    pub fn settle_remaining(&self) -> Option<Duration> {
        self.settle_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Reconciles one raw frame.
    ///
    /// Undecodable frames are logged and dropped without touching state.
    pub fn handle_frame(&mut self, raw: &str) -> MonitorEvent {
        match self.reconciler.ingest_raw(raw) {
            Ok(outcome) => {
                if outcome.run_completed && self.status.run_completed() {
                    self.settle_at = None;
                }
                MonitorEvent::Applied(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Discarding stream frame");
                MonitorEvent::Discarded
            }
        }
    }

    /// Waits for the next frame or timer.
    ///
    /// Returns `None` when neither an open stream nor a pending settle timer
    /// is left to wait on.
    pub async fn next_event(&mut self) -> Option<MonitorEvent> {
        loop {
            let stream_open = self.stream.is_active();
            let settle_at = self.settle_at;
            if !stream_open && settle_at.is_none() {
                return None;
            }
            let deadline = settle_at.unwrap_or_else(Instant::now);

            tokio::select! {
                frame = self.stream.recv(), if stream_open => match frame {
                    Some(raw) => return Some(self.handle_frame(&raw)),
                    None => {
                        self.stream.deactivate();
                        info!("Stream closed by server");
                        return Some(MonitorEvent::StreamClosed);
                    }
                },
                _ = tokio::time::sleep_until(deadline), if settle_at.is_some() => {
                    self.settle_at = None;
                    if self.status.settle() {
                        return Some(MonitorEvent::StatusChanged(self.status.status()));
                    }
                    debug!("Settle timer fired with nothing to settle");
                }
            }
        }
    }
}
