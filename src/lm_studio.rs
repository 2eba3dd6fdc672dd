// 🤖 LM Studio client - OpenAI-compatible local inference
//
// Endpoints used:
// - POST /v1/chat/completions - single-turn text generation
// - GET  /v1/models           - model listing (health check only)
//
// Every failure comes back as an `InferenceFailure` with a kind, so callers
// can decide between retry, fallback, and reporting without matching on
// reqwest internals.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default LM Studio endpoint
pub const LM_STUDIO_DEFAULT_URL: &str = "http://localhost:1234";

/// Default model requested for power estimation
pub const DEFAULT_MODEL: &str = "google/gemma-3n-e4b";

/// Timeout for a single inference call
pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the model listing used by health checks
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// FAILURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request did not finish within the timeout
    Timeout,
    /// Connection refused, DNS, TLS, broken body stream...
    Transport,
    /// Server answered with a non-2xx status
    Status(u16),
    /// 2xx answer whose envelope is not what the API documents
    MalformedBody,
    /// Generated text did not contain a usable power rating
    Parse,
}

impl FailureKind {
    /// Failures of the call itself. Bad output is deterministic, so retrying
    /// it would only produce the same result.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::Transport | FailureKind::Status(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl InferenceFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        InferenceFailure {
            kind,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if let Some(status) = err.status() {
            FailureKind::Status(status.as_u16())
        } else if err.is_decode() {
            FailureKind::MalformedBody
        } else {
            FailureKind::Transport
        };
        InferenceFailure::new(kind, err.to_string())
    }
}

impl fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Timeout => write!(f, "AI service timeout: {}", self.message),
            FailureKind::Transport => write!(f, "AI service unreachable: {}", self.message),
            FailureKind::Status(code) => write!(f, "AI service returned status {}: {}", code, self.message),
            FailureKind::MalformedBody => write!(f, "AI service sent a malformed body: {}", self.message),
            FailureKind::Parse => write!(f, "Failed to parse AI response: {}", self.message),
        }
    }
}

impl std::error::Error for InferenceFailure {}

// ============================================================================
// GENERATOR TRAIT
// ============================================================================

/// Remote text generation as seen by the power estimator
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt, get the generated text back
    async fn complete(&self, prompt: &str) -> Result<String, InferenceFailure>;

    /// Identifiers of the models the service can serve
    async fn list_models(&self) -> Result<Vec<String>, InferenceFailure>;
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct LmStudioClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    inference_timeout: Duration,
    health_timeout: Duration,
}

impl LmStudioClient {
    pub fn new(base_url: &str, model: &str) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().build()?;

        Ok(LmStudioClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            inference_timeout: INFERENCE_TIMEOUT,
            health_timeout: HEALTH_CHECK_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, inference: Duration, health: Duration) -> Self {
        self.inference_timeout = inference;
        self.health_timeout = health;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for LmStudioClient {
    async fn complete(&self, prompt: &str) -> Result<String, InferenceFailure> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.3,
            max_tokens: 200,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(self.inference_timeout)
            .json(&request)
            .send()
            .await
            .map_err(InferenceFailure::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceFailure::new(
                FailureKind::Status(status.as_u16()),
                body,
            ));
        }

        let chat: ChatResponse = response.json().await.map_err(InferenceFailure::from_reqwest)?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| InferenceFailure::new(FailureKind::MalformedBody, "response has no choices"))
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceFailure> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(InferenceFailure::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceFailure::new(
                FailureKind::Status(status.as_u16()),
                format!("Status {}", status.as_u16()),
            ));
        }

        let models: ModelList = response.json().await.map_err(InferenceFailure::from_reqwest)?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::Transport.is_transient());
        assert!(FailureKind::Status(503).is_transient());
        assert!(!FailureKind::MalformedBody.is_transient());
        assert!(!FailureKind::Parse.is_transient());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = LmStudioClient::new("http://localhost:1234/", DEFAULT_MODEL).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: 0.3,
            max_tokens: 200,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 200);
    }

    #[test]
    fn test_failure_display() {
        let failure = InferenceFailure::new(FailureKind::Status(500), "oops");
        assert_eq!(failure.to_string(), "AI service returned status 500: oops");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_failure() {
        // Nothing listens on port 1
        let client = LmStudioClient::new("http://127.0.0.1:1", DEFAULT_MODEL)
            .unwrap()
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));

        let failure = client.complete("hello").await.unwrap_err();
        assert!(failure.is_transient());
        assert!(matches!(failure.kind, FailureKind::Transport | FailureKind::Timeout));
    }
}
