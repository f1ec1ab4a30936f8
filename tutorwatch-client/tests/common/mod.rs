//! Shared test utilities for tutorwatch-client integration tests
//!
//! Spawns an in-process backend exposing the agent control surface:
//! `GET /api/stream` (SSE), `POST /api/start`, `POST /api/stop`,
//! `GET /api/health`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tutorwatch_client::ClientConfig;

/// Frames pushed by tests to connected stream clients.
#[derive(Debug, Clone)]
pub enum Frame {
    Json(Value),
    Raw(String),
    Comment(String),
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub running: bool,
    pub starts: Vec<String>,
    pub stops: usize,
}

/// Handle to the fake backend.
#[derive(Clone)]
pub struct TestBackend {
    frames: broadcast::Sender<Frame>,
    pub recorded: Arc<Mutex<Recorded>>,
    pub addr: SocketAddr,
}

impl TestBackend {
    /// Pushes a JSON message to every connected stream.
    #[allow(dead_code)]
    pub fn send(&self, value: Value) {
        let _ = self.frames.send(Frame::Json(value));
    }

    /// Pushes an arbitrary data payload, valid JSON or not.
    #[allow(dead_code)]
    pub fn send_raw(&self, data: &str) {
        let _ = self.frames.send(Frame::Raw(data.to_string()));
    }

    #[allow(dead_code)]
    pub fn send_comment(&self, text: &str) {
        let _ = self.frames.send(Frame::Comment(text.to_string()));
    }

    #[allow(dead_code)]
    pub fn log(&self, message: &str) {
        self.send(json!({
            "type": "log",
            "level": "info",
            "message": message,
            "timestamp": 1700000000.0,
        }));
    }

    /// Number of stream clients currently subscribed.
    pub fn subscribers(&self) -> usize {
        self.frames.receiver_count()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            settle_delay: Duration::from_millis(200),
            ..ClientConfig::with_base_url(format!("http://{}/api", self.addr))
        }
    }
}

#[derive(Clone)]
struct AppState {
    frames: broadcast::Sender<Frame>,
    recorded: Arc<Mutex<Recorded>>,
}

async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.frames.subscribe();
    let events = BroadcastStream::new(rx).filter_map(|frame| async move {
        let event = match frame.ok()? {
            Frame::Json(value) => Event::default().data(value.to_string()),
            Frame::Raw(data) => Event::default().data(data),
            Frame::Comment(text) => Event::default().comment(text),
        };
        Some(Ok(event))
    });
    Sse::new(events)
}

async fn start(State(state): State<AppState>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut recorded = state.recorded.lock().unwrap();
    if recorded.running {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Agent already running"})),
        );
    }
    let set_type = body
        .get("set_type")
        .and_then(Value::as_str)
        .unwrap_or("mini_dev")
        .to_string();
    recorded.running = true;
    recorded.starts.push(set_type.clone());
    (
        StatusCode::OK,
        Json(json!({"status": "started", "set": set_type})),
    )
}

async fn stop(State(state): State<AppState>) -> Json<Value> {
    let mut recorded = state.recorded.lock().unwrap();
    recorded.running = false;
    recorded.stops += 1;
    Json(json!({"status": "stopping"}))
}

/// Finite newline-delimited body, closed by the server after two messages.
async fn replay() -> impl IntoResponse {
    let body = [
        json!({"type": "log", "level": "system", "message": "Processing Ana - Fractions", "timestamp": 1.0}),
        json!({"type": "complete", "data": {"predictions": [2]}}),
    ]
    .iter()
    .map(|v| format!("{}\n", v))
    .collect::<String>();
    ([("content-type", "application/x-ndjson")], body)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let running = state.recorded.lock().unwrap().running;
    Json(json!({"status": "healthy", "agent_running": running}))
}

/// Starts the fake backend on an ephemeral port.
pub async fn spawn_backend() -> TestBackend {
    let (frames, _) = broadcast::channel(64);
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let state = AppState {
        frames: frames.clone(),
        recorded: Arc::clone(&recorded),
    };

    let app = Router::new()
        .route("/api/stream", get(stream))
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .route("/api/health", get(health))
        .route("/api/replay", get(replay))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    TestBackend {
        frames,
        recorded,
        addr,
    }
}
