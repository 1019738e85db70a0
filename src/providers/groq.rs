//! Groq chat-completions client (OpenAI-compatible wire format).

use super::{
    ProviderError, ProviderName, SummarizationProvider, SummaryLength, classify_transport_error,
    prepare_prompt, system_prompt, upstream_message,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.groq.com";
pub(crate) const CHAR_BUDGET: usize = 24_000;
const MODEL: &str = "llama-3.1-70b-versatile";

/// Client for the Groq chat-completion API.
pub struct GroqClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GroqClient {
    /// Build a client that authenticates every request with `api_key`.
    pub fn new(http: Client, base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/openai/v1/{path}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl SummarizationProvider for GroqClient {
    fn name(&self) -> ProviderName {
        ProviderName::Groq
    }

    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String, ProviderError> {
        let prompt = prepare_prompt(ProviderName::Groq, text, length)?;
        let payload = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.3,
            "max_tokens": length.max_output_tokens(),
        });

        tracing::debug!(model = MODEL, "Requesting Groq summary");
        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| classify_transport_error(ProviderName::Groq, self.timeout, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                provider: ProviderName::Groq,
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let completion: ChatCompletion =
            response
                .json()
                .await
                .map_err(|error| ProviderError::InvalidResponse {
                    provider: ProviderName::Groq,
                    message: format!("failed to decode response: {error}"),
                })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: ProviderName::Groq,
                message: "response contained no completion text".into(),
            })
    }

    async fn test_connection(&self) -> Result<bool, ProviderError> {
        let response = self
            .http
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| classify_transport_error(ProviderName::Groq, self.timeout, error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(false);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Upstream {
            provider: ProviderName::Groq,
            status: status.as_u16(),
            message: upstream_message(&body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    fn client_for(base_url: String, timeout: Duration) -> GroqClient {
        GroqClient::new(
            Client::builder()
                .user_agent("document-summarizer-test")
                .timeout(timeout)
                .build()
                .expect("client"),
            base_url,
            "gsk-test-key".into(),
            timeout,
        )
    }

    #[tokio::test]
    async fn summarize_sends_budgeted_chat_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/v1/chat/completions")
                    .header("authorization", "Bearer gsk-test-key")
                    .body_contains("llama-3.1-70b-versatile")
                    .body_contains("[Text truncated due to length...]");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  Key points.  " } }]
                }));
            })
            .await;

        let text = "x".repeat(CHAR_BUDGET + 500);
        let summary = client_for(server.base_url(), Duration::from_secs(5))
            .summarize(&text, SummaryLength::Standard)
            .await
            .expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Key points.");
    }

    #[tokio::test]
    async fn summarize_reports_upstream_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/openai/v1/chat/completions");
                then.status(500).body("boom");
            })
            .await;

        let error = client_for(server.base_url(), Duration::from_secs(5))
            .summarize(&"word ".repeat(40), SummaryLength::Standard)
            .await
            .expect_err("server error");

        assert!(matches!(
            error,
            ProviderError::Upstream { status: 500, ref message, .. } if message == "boom"
        ));
    }

    #[tokio::test]
    async fn summarize_times_out_distinctly() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/openai/v1/chat/completions");
                then.status(200)
                    .delay(Duration::from_millis(1500))
                    .json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client_for(server.base_url(), Duration::from_millis(200))
            .summarize(&"word ".repeat(40), SummaryLength::Standard)
            .await
            .expect_err("timeout");

        assert!(matches!(error, ProviderError::Timeout { provider: ProviderName::Groq, .. }));
    }

    #[tokio::test]
    async fn test_connection_maps_unauthorized_to_false() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/openai/v1/models");
                then.status(401).json_body(json!({
                    "error": { "message": "Invalid API Key", "type": "invalid_request_error" }
                }));
            })
            .await;

        let valid = client_for(server.base_url(), Duration::from_secs(5))
            .test_connection()
            .await
            .expect("verdict");
        assert!(!valid);
    }

    #[tokio::test]
    async fn test_connection_reports_unreachable_host_as_connectivity() {
        // Port 9 (discard) is not expected to accept HTTP connections locally.
        let error = client_for("http://127.0.0.1:9".into(), Duration::from_secs(5))
            .test_connection()
            .await
            .expect_err("unreachable");

        assert!(matches!(
            error,
            ProviderError::Connectivity { provider: ProviderName::Groq, .. }
        ));
    }
}
