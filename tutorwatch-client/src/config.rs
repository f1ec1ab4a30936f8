use std::time::Duration;

/// Default base URL of the agent control service
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Default path of the event stream, relative to the base URL
pub const DEFAULT_STREAM_PATH: &str = "/stream";

/// Default timeout for control requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between an acknowledged stop and returning to idle
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Where the backend lives and how long to wait on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub stream_path: String,
    pub request_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Joins `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn stream_url(&self) -> String {
        self.endpoint(&self.stream_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert_eq!(config.settle_delay, Duration::from_secs(1));
        assert_eq!(config.stream_url(), "http://localhost:5000/api/stream");
    }

    #[test]
    fn endpoint_handles_slashes() {
        let config = ClientConfig::with_base_url("http://127.0.0.1:9000/api/");
        assert_eq!(config.endpoint("/start"), "http://127.0.0.1:9000/api/start");
        assert_eq!(config.endpoint("stop"), "http://127.0.0.1:9000/api/stop");
    }
}
