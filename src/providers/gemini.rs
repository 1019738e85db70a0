//! Google Gemini `generateContent` client.

use super::{
    ProviderError, ProviderName, SummarizationProvider, SummaryLength, classify_transport_error,
    prepare_prompt, system_prompt, upstream_message,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub(crate) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub(crate) const CHAR_BUDGET: usize = 30_000;
const MODEL: &str = "gemini-2.5-pro";

/// Client for the Gemini generative-text API.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Build a client that authenticates every request with `api_key`.
    pub fn new(http: Client, base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout,
        }
    }

    fn generate_endpoint(&self) -> String {
        format!("{}/v1beta/models/{MODEL}:generateContent", self.base_url)
    }

    fn model_endpoint(&self) -> String {
        format!("{}/v1beta/models/{MODEL}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl SummarizationProvider for GeminiClient {
    fn name(&self) -> ProviderName {
        ProviderName::Gemini
    }

    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String, ProviderError> {
        let prompt = prepare_prompt(ProviderName::Gemini, text, length)?;
        let payload = json!({
            "systemInstruction": { "parts": [{ "text": system_prompt() }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.3,
                "maxOutputTokens": length.max_output_tokens(),
            }
        });

        tracing::debug!(model = MODEL, "Requesting Gemini summary");
        let response = self
            .http
            .post(self.generate_endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| classify_transport_error(ProviderName::Gemini, self.timeout, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                provider: ProviderName::Gemini,
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            ProviderError::InvalidResponse {
                provider: ProviderName::Gemini,
                message: format!("failed to decode response: {error}"),
            }
        })?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: ProviderName::Gemini,
                message: "response contained no candidates".into(),
            })?;
        let summary: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if summary.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: ProviderName::Gemini,
                message: format!(
                    "empty completion (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        Ok(summary.trim().to_string())
    }

    async fn test_connection(&self) -> Result<bool, ProviderError> {
        let response = self
            .http
            .get(self.model_endpoint())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|error| classify_transport_error(ProviderName::Gemini, self.timeout, error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(false);
        }

        let body = response.text().await.unwrap_or_default();
        // Gemini reports malformed or unknown keys as 400 INVALID_ARGUMENT.
        if status == StatusCode::BAD_REQUEST && body.contains("API_KEY_INVALID") {
            return Ok(false);
        }
        Err(ProviderError::Upstream {
            provider: ProviderName::Gemini,
            status: status.as_u16(),
            message: upstream_message(&body),
        })
    }
}
