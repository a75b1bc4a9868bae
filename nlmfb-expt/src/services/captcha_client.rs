//! CAPTCHA verification client
//!
//! Posts the browser's token and our secret to the provider's `siteverify`
//! endpoint. The provider's JSON answer is passed back untouched; the
//! caller stores its `score`.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("nlmfb-expt/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// CAPTCHA client errors
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("CAPTCHA secret key is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// reCAPTCHA-style verification client
pub struct CaptchaClient {
    http_client: reqwest::Client,
    verify_url: String,
    secret_key: Option<String>,
}

impl CaptchaClient {
    pub fn new(verify_url: String, secret_key: Option<String>) -> Result<Self, CaptchaError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            verify_url,
            secret_key: secret_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Verify a token, returning the provider's response body
    pub async fn verify(&self, token: Option<&str>) -> Result<Value, CaptchaError> {
        let secret = self.secret_key.as_deref().ok_or(CaptchaError::NotConfigured)?;

        let mut params = vec![("secret", secret)];
        if let Some(token) = token {
            params.push(("response", token));
        }

        let response = self
            .http_client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CaptchaError::ApiError(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CaptchaError::ParseError(e.to_string()))?;

        tracing::debug!(
            success = body.get("success").and_then(serde_json::Value::as_bool).unwrap_or(false),
            score = body.get("score").and_then(serde_json::Value::as_f64),
            "CAPTCHA verification response"
        );

        Ok(body)
    }

    /// Bot-likelihood score from a verification response (1.0 = human)
    pub fn score(response: &Value) -> Option<f64> {
        response.get("score").and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_verify_posts_token_and_secret() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/siteverify"))
            .and(body_string_contains("secret=shh"))
            .and(body_string_contains("response=tok-123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "score": 0.9, "action": "submit"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client =
            CaptchaClient::new(format!("{}/siteverify", server.uri()), Some("shh".into())).unwrap();
        let body = client.verify(Some("tok-123")).await.unwrap();

        assert_eq!(body["action"], "submit");
        assert_eq!(CaptchaClient::score(&body), Some(0.9));
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_configured() {
        let client = CaptchaClient::new("http://127.0.0.1:9/siteverify".into(), Some("  ".into())).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(client.verify(Some("t")).await, Err(CaptchaError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_provider_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let client = CaptchaClient::new(server.uri(), Some("shh".into())).unwrap();
        let err = client.verify(None).await.unwrap_err();
        assert!(matches!(err, CaptchaError::ApiError(503, _)));
    }

    #[test]
    fn test_score_absent_when_failed() {
        let body = json!({"success": false, "error-codes": ["invalid-input-response"]});
        assert_eq!(CaptchaClient::score(&body), None);
    }
}
