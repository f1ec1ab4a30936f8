use std::time::Duration;

use serde::{Deserialize, Serialize};
use tutorwatch_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_STREAM_PATH};
use tutorwatch_core::EngineConfig;

/// Default problem set requested when starting a run
pub const DEFAULT_SET_TYPE: &str = "mini_dev";

/// Default control request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Default delay between a stop request and returning to idle
pub const DEFAULT_SETTLE_MS: u64 = 1000;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTutorwatchConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub run: RawRunConfig,

    #[serde(default)]
    pub engine: RawEngineConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub base_url: Option<String>,
    pub stream_path: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRunConfig {
    pub set_type: Option<String>,
    pub settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    pub log_capacity: Option<usize>,
    pub clamp_level_threshold: Option<f64>,
    pub clamp_confidence_threshold: Option<f64>,
    pub clamp_dampened_level: Option<f64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TutorwatchConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Base URL of the agent control service
    pub base_url: String,

    /// Event stream path, relative to `base_url`
    pub stream_path: String,

    /// Timeout for start/stop/health requests
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Problem set requested by `start`
    pub set_type: String,

    /// How long to keep reconciling after a stop before going idle
    pub settle_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            set_type: DEFAULT_SET_TYPE.to_string(),
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl TutorwatchConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.base_url.clone(),
            stream_path: self.server.stream_path.clone(),
            request_timeout: Duration::from_millis(self.server.request_timeout_ms),
            settle_delay: Duration::from_millis(self.run.settle_ms),
        }
    }
}
