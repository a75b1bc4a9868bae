//! Text-completion API client
//!
//! Talks to an OpenAI-compatible legacy `/completions` endpoint and returns
//! per-token log-probabilities. Requests are spaced by a minimum interval
//! to stay under the provider's rate limit.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const USER_AGENT: &str = concat!("nlmfb-analysis/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Completion client errors
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Organization and secret key for the completion API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCredentials {
    pub organization: Option<String>,
    pub api_key: String,
}

impl ApiCredentials {
    /// Read a key file: organization on the first line, key on the second
    pub fn from_key_file(path: &Path) -> Result<Self, CompletionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompletionError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse_key_file(&content)
    }

    pub fn parse_key_file(content: &str) -> Result<Self, CompletionError> {
        let mut lines = content.lines().map(str::trim);
        let organization = lines.next().filter(|l| !l.is_empty()).map(String::from);
        let api_key = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| CompletionError::Credentials("key file has no API key line".to_string()))?;

        Ok(Self {
            organization,
            api_key: api_key.to_string(),
        })
    }

    /// `OPENAI_API_KEY` and optional `OPENAI_ORGANIZATION`
    pub fn from_env() -> Result<Self, CompletionError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompletionError::Credentials("OPENAI_API_KEY is not set".to_string()))?;
        let organization = std::env::var("OPENAI_ORGANIZATION")
            .ok()
            .filter(|o| !o.trim().is_empty());

        Ok(Self {
            organization,
            api_key,
        })
    }
}

/// Parameters of one completion call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub n: u32,
    pub logprobs: u32,
    pub echo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
}

impl CompletionRequest {
    /// Score `prompt` itself: no new tokens, prompt tokens echoed back
    pub fn echo_scoring(model: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            max_tokens: 0,
            temperature: 0.0,
            n: 1,
            logprobs: 0,
            echo: true,
            stop: Some("\n".to_string()),
        }
    }

    /// Greedy continuation of `prompt` for `max_tokens` tokens
    pub fn greedy(model: &str, prompt: &str, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            max_tokens,
            temperature: 0.0,
            n: 1,
            logprobs: 1,
            echo: false,
            stop: None,
        }
    }
}

/// Token texts with their log-probabilities
///
/// The first echoed token has no log-probability (nothing precedes it).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Logprobs {
    pub tokens: Vec<String>,
    pub token_logprobs: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    logprobs: Option<Logprobs>,
}

/// Minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Completion API client
pub struct CompletionClient {
    http_client: reqwest::Client,
    api_base: String,
    credentials: ApiCredentials,
    rate_limiter: Arc<RateLimiter>,
}

impl CompletionClient {
    pub fn new(
        api_base: &str,
        credentials: ApiCredentials,
        min_interval_ms: u64,
    ) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CompletionError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
            rate_limiter: Arc::new(RateLimiter::new(min_interval_ms)),
        })
    }

    /// Run one completion and return the first choice's log-probabilities
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Logprobs, CompletionError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/completions", self.api_base);
        tracing::debug!(model = %request.model, echo = request.echo, "Requesting completion");

        let mut builder = self
            .http_client
            .post(&url)
            .bearer_auth(&self.credentials.api_key)
            .json(request);
        if let Some(org) = &self.credentials.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CompletionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::ApiError(status.as_u16(), error_text));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::ParseError(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.logprobs)
            .ok_or_else(|| CompletionError::ParseError("response has no logprobs".to_string()))
    }
}
