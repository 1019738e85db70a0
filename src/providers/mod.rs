//! Hosted LLM providers used to summarize extracted text.
//!
//! Two providers are supported behind the [`SummarizationProvider`] capability: Google Gemini
//! and Groq. A [`ProviderFactory`] maps the stored provider name and key to a boxed client once
//! per request, so call sites never branch on the provider themselves. Clients never retry;
//! upstream failures, rate limits included, are surfaced as [`ProviderError`].

mod gemini;
mod groq;

pub use gemini::GeminiClient;
pub use groq::GroqClient;

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Minimum trimmed input length accepted for summarization.
pub const MIN_INPUT_CHARS: usize = 50;

/// Marker appended when input exceeds a provider's character budget.
pub const TRUNCATION_MARKER: &str = "\n\n[Text truncated due to length...]";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates clear, concise summaries of documents. Provide a well-structured summary with key points and main ideas.";

/// Errors surfaced by provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Input failed the local length precondition; no request was sent.
    #[error("Text is too short to summarize ({length} characters, minimum {minimum}). Please provide more content.")]
    InputTooShort {
        /// Trimmed character count of the rejected input.
        length: usize,
        /// Minimum accepted character count.
        minimum: usize,
    },
    /// Provider answered with a non-success status.
    #[error("{provider} API returned {status}: {message}")]
    Upstream {
        /// Provider that produced the response.
        provider: ProviderName,
        /// HTTP status code returned upstream.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },
    /// The request never reached the provider.
    #[error("Could not reach {provider}: {message}")]
    Connectivity {
        /// Provider that was being contacted.
        provider: ProviderName,
        /// Transport-level error description.
        message: String,
    },
    /// The provider did not answer within the configured timeout.
    #[error("{provider} did not respond within {secs} seconds", secs = .timeout.as_secs())]
    Timeout {
        /// Provider that timed out.
        provider: ProviderName,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// The provider answered successfully but the body could not be used.
    #[error("Malformed {provider} response: {message}")]
    InvalidResponse {
        /// Provider that produced the response.
        provider: ProviderName,
        /// Description of the decoding problem.
        message: String,
    },
}

/// Closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// Google Gemini generative-text API.
    Gemini,
    /// Groq chat-completion API.
    Groq,
}

impl ProviderName {
    /// All supported providers, in display order.
    pub const ALL: [ProviderName; 2] = [ProviderName::Gemini, ProviderName::Groq];

    /// Stable lowercase identifier used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }

    /// Maximum number of input characters sent to this provider.
    pub fn char_budget(&self) -> usize {
        match self {
            Self::Gemini => gemini::CHAR_BUDGET,
            Self::Groq => groq::CHAR_BUDGET,
        }
    }

    /// Environment variable that may seed a key for this provider at startup.
    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Gemini => "Gemini",
            Self::Groq => "Groq",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for ProviderName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            _ => Err(()),
        }
    }
}

/// Requested level of detail for a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    /// One short paragraph.
    Brief,
    /// Structured summary with key points.
    #[default]
    Standard,
    /// Section-by-section summary.
    Detailed,
}

impl SummaryLength {
    fn instruction(&self) -> &'static str {
        match self {
            Self::Brief => "Please provide a brief summary of at most five sentences of the following text:",
            Self::Standard => "Please provide a comprehensive summary of the following text:",
            Self::Detailed => "Please provide a detailed, section-by-section summary with headings and bullet points of the following text:",
        }
    }

    /// Output token ceiling requested from the provider.
    pub fn max_output_tokens(&self) -> u32 {
        match self {
            Self::Brief => 512,
            Self::Standard => 2000,
            Self::Detailed => 4000,
        }
    }
}

impl std::str::FromStr for SummaryLength {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brief" | "short" => Ok(Self::Brief),
            "standard" | "medium" | "" => Ok(Self::Standard),
            "detailed" | "long" => Ok(Self::Detailed),
            _ => Err(()),
        }
    }
}

/// Capability implemented by every hosted summarization provider.
#[async_trait]
pub trait SummarizationProvider: Send + Sync {
    /// Provider this client talks to.
    fn name(&self) -> ProviderName;

    /// Summarize `text`, truncating it to the provider's character budget first.
    async fn summarize(&self, text: &str, length: SummaryLength) -> Result<String, ProviderError>;

    /// Perform a minimal authenticated round trip.
    ///
    /// Returns `Ok(false)` when the provider rejects the key and an error for anything else
    /// that prevents a verdict.
    async fn test_connection(&self) -> Result<bool, ProviderError>;
}

/// Builds provider clients for a stored credential.
pub trait ProviderFactory: Send + Sync {
    /// Construct a client for `provider` authenticated with `api_key`.
    fn build(&self, provider: ProviderName, api_key: &str) -> Box<dyn SummarizationProvider>;
}

/// Check whether `api_key` is accepted by `provider`.
pub async fn test_connection(
    factory: &dyn ProviderFactory,
    provider: ProviderName,
    api_key: &str,
) -> Result<bool, ProviderError> {
    let client = factory.build(provider, api_key);
    let valid = client.test_connection().await?;
    tracing::info!(provider = %provider, valid, "Provider connection tested");
    Ok(valid)
}

/// Default factory producing HTTP clients that share one connection pool.
#[derive(Clone)]
pub struct HttpProviderFactory {
    http: Client,
    timeout: Duration,
    gemini_base_url: String,
    groq_base_url: String,
}

impl HttpProviderFactory {
    /// Build a factory from runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.provider_timeout,
            config.gemini_base_url.clone(),
            config.groq_base_url.clone(),
        )
    }

    /// Build a factory with an explicit timeout and optional base URL overrides.
    pub fn new(
        timeout: Duration,
        gemini_base_url: Option<String>,
        groq_base_url: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent("document-summarizer/0.2")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            timeout,
            gemini_base_url: normalize_base_url(
                gemini_base_url.as_deref().unwrap_or(gemini::DEFAULT_BASE_URL),
            ),
            groq_base_url: normalize_base_url(
                groq_base_url.as_deref().unwrap_or(groq::DEFAULT_BASE_URL),
            ),
        })
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, provider: ProviderName, api_key: &str) -> Box<dyn SummarizationProvider> {
        match provider {
            ProviderName::Gemini => Box::new(GeminiClient::new(
                self.http.clone(),
                self.gemini_base_url.clone(),
                api_key.to_string(),
                self.timeout,
            )),
            ProviderName::Groq => Box::new(GroqClient::new(
                self.http.clone(),
                self.groq_base_url.clone(),
                api_key.to_string(),
                self.timeout,
            )),
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Reject input whose trimmed length is below [`MIN_INPUT_CHARS`].
pub fn ensure_min_length(text: &str) -> Result<(), ProviderError> {
    let length = text.trim().chars().count();
    if length < MIN_INPUT_CHARS {
        return Err(ProviderError::InputTooShort {
            length,
            minimum: MIN_INPUT_CHARS,
        });
    }
    Ok(())
}

/// Cut `text` to at most `budget` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text.to_string(),
    }
}

/// Validate and budget the input, then build the user prompt.
pub(crate) fn prepare_prompt(
    provider: ProviderName,
    text: &str,
    length: SummaryLength,
) -> Result<String, ProviderError> {
    ensure_min_length(text)?;
    let budgeted = truncate_to_budget(text, provider.char_budget());
    if budgeted.len() != text.len() {
        tracing::debug!(
            provider = %provider,
            budget = provider.char_budget(),
            "Input truncated to provider budget"
        );
    }
    Ok(format!("{}\n\n{}", length.instruction(), budgeted))
}

pub(crate) fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Map a transport failure into a timeout or connectivity error.
pub(crate) fn classify_transport_error(
    provider: ProviderName,
    timeout: Duration,
    error: reqwest::Error,
) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout { provider, timeout }
    } else {
        ProviderError::Connectivity {
            provider,
            message: error.to_string(),
        }
    }
}

/// Pull a readable message out of an upstream error body.
pub(crate) fn upstream_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .get("error")
            .and_then(|error| error.get("message").or(Some(error)))
            .and_then(Value::as_str)
    });
    match message {
        Some(message) => message.to_string(),
        None => {
            let trimmed = body.trim();
            trimmed.chars().take(500).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!("Gemini".parse::<ProviderName>(), Ok(ProviderName::Gemini));
        assert_eq!(" groq ".parse::<ProviderName>(), Ok(ProviderName::Groq));
        assert!("openai".parse::<ProviderName>().is_err());
    }

    #[test]
    fn budgets_differ_per_provider() {
        assert_eq!(ProviderName::Gemini.char_budget(), 30_000);
        assert_eq!(ProviderName::Groq.char_budget(), 24_000);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "ééééé";
        let truncated = truncate_to_budget(text, 3);
        assert_eq!(truncated, format!("ééé{TRUNCATION_MARKER}"));
        assert_eq!(truncate_to_budget(text, 5), text);
        assert_eq!(truncate_to_budget(text, 10), text);
    }

    #[test]
    fn short_input_rejected_locally() {
        let error = ensure_min_length("   too short   ").expect_err("short input");
        assert!(matches!(
            error,
            ProviderError::InputTooShort {
                length: 9,
                minimum: MIN_INPUT_CHARS
            }
        ));
        assert!(ensure_min_length(&"a".repeat(MIN_INPUT_CHARS)).is_ok());
    }

    #[test]
    fn prompt_embeds_length_instruction_and_budgeted_text() {
        let text = "word ".repeat(20_000);
        let prompt = prepare_prompt(ProviderName::Groq, &text, SummaryLength::Brief)
            .expect("prompt");
        assert!(prompt.starts_with("Please provide a brief summary"));
        assert!(prompt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn upstream_message_prefers_json_error_message() {
        assert_eq!(
            upstream_message(r#"{"error":{"message":"Rate limit reached","type":"tokens"}}"#),
            "Rate limit reached"
        );
        assert_eq!(upstream_message(r#"{"error":"bad key"}"#), "bad key");
        assert_eq!(upstream_message("  plain failure "), "plain failure");
    }

    #[test]
    fn summary_length_parses_aliases() {
        assert_eq!("short".parse::<SummaryLength>(), Ok(SummaryLength::Brief));
        assert_eq!("".parse::<SummaryLength>(), Ok(SummaryLength::Standard));
        assert_eq!("Detailed".parse::<SummaryLength>(), Ok(SummaryLength::Detailed));
    }
}
