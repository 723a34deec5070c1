//! HTTP fallback client.
//!
//! Posts `{visitor_id, message}` to the fallback endpoint and returns the
//! complete reply. Also serves the `/health` probe used by `salesline status`.

use std::time::Duration;

use salesline_core::transport::FallbackClient;
use salesline_types::config::ClientConfig;
use salesline_types::error::TransportError;
use salesline_types::protocol::{FallbackRequest, FallbackResponse, HealthStatus};

pub struct HttpFallbackClient {
    client: reqwest::Client,
    chat_url: String,
    health_url: String,
}

impl HttpFallbackClient {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("salesline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Fallback(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            chat_url: config.fallback_endpoint(),
            health_url: config.health_endpoint(),
        })
    }

    /// Query the server health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl FallbackClient for HttpFallbackClient {
    async fn send(&self, request: &FallbackRequest) -> Result<FallbackResponse, TransportError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "fallback endpoint returned an error");
            return Err(TransportError::Status(status.as_u16()));
        }

        let reply = response
            .json::<FallbackResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        tracing::debug!(tools = reply.tools.len(), "fallback reply received");
        Ok(reply)
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Fallback("request timed out".to_string())
    } else {
        TransportError::Fallback(e.to_string())
    }
}
