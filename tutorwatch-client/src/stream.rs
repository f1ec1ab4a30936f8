//! Long-lived connection to the backend event stream.
//!
//! Each [`StreamConnection::activate`] opens a fresh connection and spawns a
//! reader task that decodes frames and forwards them over a channel. The
//! task only moves text; reconciliation happens wherever frames are received.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::frame::{self, FrameStream};

/// Buffered frames between the reader task and the consumer.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// One server-initiated message stream.
pub struct StreamConnection {
    http: reqwest::Client,
    url: String,
    rx: Option<mpsc::Receiver<String>>,
    shutdown: Option<CancellationToken>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("url", &self.url)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl StreamConnection {
    /// Creates an inactive connection to `url`.
    ///
    /// `http` must not carry a total request timeout, since the response
    /// body never ends on its own.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            rx: None,
            shutdown: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True between a successful `activate` and `deactivate`.
    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    /// True while the reader task still has an open body.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Opens the stream, tearing down any previous connection first.
    ///
    /// Nothing from an earlier connection is replayed.
    pub async fn activate(&mut self) -> Result<()> {
        self.deactivate();

        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Rejected {
                url: self.url.clone(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();
        let connected = Arc::new(AtomicBool::new(true));

        tokio::spawn(Self::reader_task(
            response,
            tx,
            shutdown.clone(),
            Arc::clone(&connected),
        ));

        info!(url = %self.url, "Stream connected");
        self.rx = Some(rx);
        self.shutdown = Some(shutdown);
        self.connected = connected;
        Ok(())
    }

    /// Closes the stream. Calling it again, or on an inactive connection,
    /// does nothing. Already-applied state is not touched.
    pub fn deactivate(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.cancel();
            self.rx = None;
            self.connected.store(false, Ordering::Relaxed);
            info!(url = %self.url, "Stream disconnected");
        }
    }

    /// Waits for the next frame.
    ///
    /// Returns `None` once the stream has closed or was never activated.
    pub async fn recv(&mut self) -> Option<String> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    async fn reader_task(
        response: reqwest::Response,
        tx: mpsc::Sender<String>,
        shutdown: CancellationToken,
        connected: Arc<AtomicBool>,
    ) {
        let mut frames = Self::frames(response);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Stream reader cancelled");
                    break;
                }
                frame = frames.next() => match frame {
                    Some(Ok(frame)) => {
                        if tx.send(frame).await.is_err() {
                            debug!("Frame receiver dropped, stopping reader");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Stream read failed");
                        break;
                    }
                    None => {
                        debug!("Stream body ended");
                        break;
                    }
                }
            }
        }

        connected.store(false, Ordering::Relaxed);
        info!("Stream closed");
    }

    /// Picks the framing from the response content type.
    fn frames(response: reqwest::Response) -> FrameStream {
        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));

        if is_event_stream {
            frame::sse_frames(response.bytes_stream())
        } else {
            debug!("Reading stream body as newline-delimited JSON");
            frame::ndjson_frames(response.bytes_stream())
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_connection_is_inactive() {
        let conn = StreamConnection::new(reqwest::Client::new(), "http://127.0.0.1:1/stream");
        assert!(!conn.is_active());
        assert!(!conn.is_connected());
        assert_eq!(conn.url(), "http://127.0.0.1:1/stream");
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut conn = StreamConnection::new(reqwest::Client::new(), "http://127.0.0.1:1/stream");
        conn.deactivate();
        conn.deactivate();
        assert!(!conn.is_active());
    }

    #[tokio::test]
    async fn recv_on_inactive_connection_returns_none() {
        let mut conn = StreamConnection::new(reqwest::Client::new(), "http://127.0.0.1:1/stream");
        assert!(conn.recv().await.is_none());
    }

    #[tokio::test]
    async fn activate_against_closed_port_is_transport_error() {
        let mut conn = StreamConnection::new(reqwest::Client::new(), "http://127.0.0.1:1/stream");
        let err = conn.activate().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(!conn.is_active());
    }
}
