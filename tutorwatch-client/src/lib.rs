//! tutorwatch-client: the I/O edge of the monitor
//!
//! - [`StreamConnection`] owns one long-lived `GET /stream` connection and
//!   forwards decoded frames over a channel
//! - [`sse_frames`] / [`ndjson_frames`] split a response body into frames
//! - [`ControlClient`] issues `start` / `stop` / `health` requests
//! - [`Monitor`] ties both to a [`tutorwatch_core::Reconciler`] and the run
//!   status machine, reconciling one frame at a time on the caller's task

mod config;
mod control;
mod error;
mod frame;
mod monitor;
mod stream;

pub use config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SETTLE_DELAY,
    DEFAULT_STREAM_PATH,
};
pub use control::{ControlClient, HealthStatus};
pub use error::{ClientError, Result};
pub use frame::{FrameStream, LineDecoder, ndjson_frames, sse_frames};
pub use monitor::{Monitor, MonitorEvent};
pub use stream::StreamConnection;
