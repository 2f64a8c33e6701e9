use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::collaborators::{PublishRequest, PublishStatus, PublishTransport};
use crate::errors::TransportError;

/// Publish transport talking JSON to a publish task server
///
/// - `POST {server}/tasks/publish` with a `PublishRequest` body starts a job
/// - `GET {server}/tasks/publishState` returns a `PublishStatus`
#[derive(Debug, Clone)]
pub struct HttpPublishTransport {
    /// Base URL of the task server
    base_url: String,
    /// HTTP client for making requests
    client: Client,
}

/// Body the server answers a publish request with
#[derive(Debug, Deserialize)]
struct PublishAccepted {
    #[serde(default)]
    status: Option<String>,
}

impl HttpPublishTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn publish_url(&self) -> String {
        format!("{}/tasks/publish", self.base_url)
    }

    pub fn status_url(&self) -> String {
        format!("{}/tasks/publishState", self.base_url)
    }
}

#[async_trait]
impl PublishTransport for HttpPublishTransport {
    async fn request_publish(&self, request: &PublishRequest) -> Result<String, TransportError> {
        let url = self.publish_url();
        debug!("POST {} (target: {})", url, request.target.path);

        let response = self.client.post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        if !status.is_success() {
            let message = if body.trim().is_empty() { status.to_string() } else { body };
            return Err(TransportError::Rejected(message));
        }

        // an empty or non JSON body still means the job started
        let accepted = serde_json::from_str::<PublishAccepted>(&body).ok().and_then(|a| a.status);
        Ok(accepted.unwrap_or_else(|| "Publication started".to_string()))
    }

    async fn query_status(&self) -> Result<PublishStatus, TransportError> {
        let url = self.status_url();
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Connection(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str::<PublishStatus>(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("{} ({})", e, body)))
    }
}
