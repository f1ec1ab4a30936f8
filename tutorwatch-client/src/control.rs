//! Start/stop commands for the agent control service

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    set_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Backend liveness as reported by `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub agent_running: bool,
}

/// Thin sender for run control commands.
///
/// Only success or failure of each request matters to the monitor; response
/// bodies beyond error messages are not consumed.
#[derive(Debug, Clone)]
pub struct ControlClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ControlClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                url: config.base_url.clone(),
                source,
            })?;
        Ok(Self { http, config })
    }

    /// `POST /start` with the given problem set.
    pub async fn start(&self, set_type: &str) -> Result<()> {
        let url = self.config.endpoint("start");
        info!(set_type, "Requesting run start");
        let response = self
            .http
            .post(&url)
            .json(&StartRequest { set_type })
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::check(url, response).await
    }

    /// `POST /stop`.
    pub async fn stop(&self) -> Result<()> {
        let url = self.config.endpoint("stop");
        info!("Requesting run stop");
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::check(url, response).await
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.config.endpoint("health");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::rejection(url, response).await);
        }
        response
            .json::<HealthStatus>()
            .await
            .map_err(|source| ClientError::Transport { url, source })
    }

    async fn check(url: String, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            debug!(url = %url, status = %response.status(), "Control request accepted");
            Ok(())
        } else {
            Err(Self::rejection(url, response).await)
        }
    }

    /// Builds a rejection, preferring the backend's `{"error": ...}` message.
    async fn rejection(url: String, response: reqwest::Response) -> ClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                } else {
                    text.trim().to_string()
                }
            });
        ClientError::Rejected {
            url,
            status: status.as_u16(),
            message,
        }
    }
}
