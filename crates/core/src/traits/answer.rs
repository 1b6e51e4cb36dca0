//! Answer service interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Persona, Result};

/// Request body for a single question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// Stable per-process user identifier
    pub user_id: String,
    pub question: String,
    /// Persona that will answer, serialized as its tag
    pub mode: Persona,
}

impl AnswerRequest {
    pub fn new(user_id: impl Into<String>, question: impl Into<String>, mode: Persona) -> Self {
        Self {
            user_id: user_id.into(),
            question: question.into(),
            mode,
        }
    }
}

/// Successful answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub response: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl AnswerResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            user_id: None,
            mode: None,
        }
    }
}

/// Remote answer-generation service
///
/// Any non-success status or transport failure is returned as
/// [`crate::Error::Transport`] or [`crate::Error::Api`]; callers recover
/// from both locally.
///
/// # Example
///
/// ```ignore
/// let service: Arc<dyn AnswerService> = Arc::new(AnswerClient::new(config)?);
/// let request = AnswerRequest::new("user-1a2b3c4d", "hello", Persona::Eva);
/// let answer = service.ask(&request).await?;
/// println!("{}", answer.response);
/// ```
#[async_trait]
pub trait AnswerService: Send + Sync + 'static {
    /// Ask a question on behalf of `request.mode`
    async fn ask(&self, request: &AnswerRequest) -> Result<AnswerResponse>;

    /// Check whether the service is reachable and healthy
    async fn health(&self) -> Result<bool>;

    /// Clear remote history for one persona, or both when `persona` is `None`
    async fn clear_history(&self, user_id: &str, persona: Option<Persona>) -> Result<()>;
}
