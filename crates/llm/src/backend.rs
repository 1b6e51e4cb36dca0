//! HTTP backend for the answer service
//!
//! Endpoints:
//! - `POST /chat` with `{user_id, question, mode}` → `{response, user_id, mode}`
//! - `GET /health`
//! - `DELETE /chat/{user_id}` and `DELETE /chat/{user_id}/{mode}`
//!
//! Each call is a single attempt. Failures are reported to the caller,
//! which turns them into a visible message instead of retrying.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

use duet_config::ServiceConfig;
use duet_core::{AnswerRequest, AnswerResponse, AnswerService, Persona};

use crate::LlmError;

/// Answer client configuration
#[derive(Debug, Clone)]
pub struct AnswerClientConfig {
    /// Base URL, without trailing slash
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for AnswerClientConfig {
    fn default() -> Self {
        Self::from_settings(&ServiceConfig::default())
    }
}

impl AnswerClientConfig {
    pub fn from_settings(settings: &ServiceConfig) -> Self {
        Self {
            endpoint: settings.endpoint.trim().trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
        }
    }
}

/// reqwest-based [`AnswerService`]
#[derive(Clone)]
pub struct AnswerClient {
    client: Client,
    config: AnswerClientConfig,
}

impl AnswerClient {
    /// Create a new client
    pub fn new(config: AnswerClientConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint, path)
    }

    fn clear_path(user_id: &str, persona: Option<Persona>) -> String {
        match persona {
            Some(p) => format!("/chat/{}/{}", user_id, p.tag()),
            None => format!("/chat/{}", user_id),
        }
    }

    async fn check_status(response: Response) -> Result<Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Ask a question, returning the crate error type
    pub async fn ask_raw(&self, request: &AnswerRequest) -> Result<AnswerResponse, LlmError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body = response.text().await?;
        let answer: AnswerResponse = serde_json::from_str(&body)?;

        tracing::debug!(
            mode = %request.mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answer received"
        );
        Ok(answer)
    }
}

#[async_trait]
impl AnswerService for AnswerClient {
    async fn ask(&self, request: &AnswerRequest) -> duet_core::Result<AnswerResponse> {
        Ok(self.ask_raw(request).await?)
    }

    async fn health(&self) -> duet_core::Result<bool> {
        let healthy = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        Ok(healthy)
    }

    async fn clear_history(&self, user_id: &str, persona: Option<Persona>) -> duet_core::Result<()> {
        let response = self
            .client
            .delete(self.url(&Self::clear_path(user_id, persona)))
            .send()
            .await
            .map_err(LlmError::from)?;
        Self::check_status(response).await?;
        Ok(())
    }
}
