//! Request, outcome, and error types for the summarization pipeline.

use crate::{
    credentials::CredentialError,
    extraction::ExtractionError,
    providers::{ProviderError, ProviderName, SummaryLength},
    rendering::{OutputFormat, RenderError},
};
use serde::Serialize;
use thiserror::Error;

/// Largest upload accepted for extraction (16 MiB).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Which input wins when a request carries both an uploaded file and pasted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPrecedence {
    /// Use the uploaded file and ignore the pasted text.
    PreferFile,
    /// Use the pasted text and ignore the uploaded file.
    PreferText,
}

/// Precedence applied when both inputs are present.
pub const INPUT_PRECEDENCE: InputPrecedence = InputPrecedence::PreferFile;

/// File received from the client, held in memory until it is staged for extraction.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Client-supplied file name; only its extension and sanitized stem are used.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// One summarization request.
#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    /// Uploaded document, if any.
    pub upload: Option<UploadedDocument>,
    /// Pasted text, if any.
    pub text: Option<String>,
    /// Format of the rendered download.
    pub output_format: OutputFormat,
    /// Requested level of detail.
    pub length: SummaryLength,
    /// Explicit provider override; the stored default is used when absent.
    pub provider: Option<ProviderName>,
}

/// Successful pipeline result.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Summary text returned by the provider.
    pub summary: String,
    /// File name of the rendered document inside the output directory.
    pub download_filename: String,
    /// Format of the rendered document.
    pub output_format: OutputFormat,
    /// Provider that produced the summary.
    pub provider: ProviderName,
}

/// Rendered document loaded for download.
#[derive(Debug, Clone)]
pub struct RenderedFile {
    /// File name as stored in the output directory.
    pub file_name: String,
    /// Format inferred from the file extension.
    pub format: OutputFormat,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Configuration readiness reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Whether any provider credential is stored.
    pub providers_configured: bool,
    /// Provider used when requests do not name one.
    pub default_provider: Option<ProviderName>,
}

/// Credential submitted through the settings surface.
#[derive(Debug, Clone)]
pub struct AddProviderRequest {
    /// Provider the key belongs to.
    pub provider: ProviderName,
    /// Raw API key.
    pub api_key: String,
    /// Make this provider the default after storing it.
    pub set_default: bool,
    /// Verify the key against the provider before storing it.
    pub validate: bool,
}

/// Errors surfaced by the summarization pipeline and settings operations.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Missing or malformed input.
    #[error("{0}")]
    BadRequest(String),
    /// Input text is below the minimum length.
    #[error("Text is too short to summarize ({length} characters, minimum {minimum}). Please provide more content.")]
    InputTooShort {
        /// Trimmed character count of the input.
        length: usize,
        /// Minimum accepted character count.
        minimum: usize,
    },
    /// Uploaded file extension is not supported.
    #[error("Unsupported file type '{0}'. Please upload a PDF, Word, or text file.")]
    UnsupportedFormat(String),
    /// Uploaded file exceeds [`MAX_UPLOAD_BYTES`].
    #[error("File is too large. The maximum upload size is {mb} MB.", mb = .limit / (1024 * 1024))]
    PayloadTooLarge {
        /// Maximum accepted size in bytes.
        limit: usize,
    },
    /// Text could not be extracted from the upload.
    #[error("{0}")]
    Extraction(String),
    /// No provider credential is configured.
    #[error("No AI provider is configured. Add an API key in the settings first.")]
    NotConfigured,
    /// The provider reported a failure.
    #[error("{message}")]
    Provider {
        /// Provider that failed.
        provider: ProviderName,
        /// Upstream HTTP status, when the provider answered.
        status: Option<u16>,
        /// Human-readable description.
        message: String,
    },
    /// The provider could not be reached.
    #[error("{0}")]
    Connectivity(String),
    /// The provider did not answer in time.
    #[error("{0}")]
    Timeout(String),
    /// A named resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The summary could not be rendered.
    #[error("{0}")]
    Render(#[from] RenderError),
    /// Local file storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stable, machine-readable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, conflicting, or too-short input.
    BadRequest,
    /// Unsupported upload extension.
    UnsupportedFormat,
    /// Upload exceeds the size limit.
    PayloadTooLarge,
    /// Text extraction failed.
    Extraction,
    /// No provider configured.
    NotConfigured,
    /// Upstream provider failure.
    Provider,
    /// Network failure reaching the provider.
    Connectivity,
    /// Provider timeout.
    Timeout,
    /// Unknown provider credential or download.
    NotFound,
    /// Document generation failure.
    Render,
    /// Local storage failure.
    Storage,
}

impl SummarizeError {
    /// Category used in structured error results.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) | Self::InputTooShort { .. } => ErrorKind::BadRequest,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::NotConfigured => ErrorKind::NotConfigured,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Render(_) => ErrorKind::Render,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Structured result returned to callers instead of the raw error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            success: false,
            error_kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// `{success: false, error_kind, message}` body sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Always `false`.
    pub success: bool,
    /// Error category.
    pub error_kind: ErrorKind,
    /// Human-readable message without internal details.
    pub message: String,
}

impl From<ProviderError> for SummarizeError {
    fn from(error: ProviderError) -> Self {
        let message = error.to_string();
        match error {
            ProviderError::InputTooShort { length, minimum } => {
                Self::InputTooShort { length, minimum }
            }
            ProviderError::Upstream {
                provider, status, ..
            } => Self::Provider {
                provider,
                status: Some(status),
                message,
            },
            ProviderError::InvalidResponse { provider, .. } => Self::Provider {
                provider,
                status: None,
                message,
            },
            ProviderError::Connectivity { .. } => Self::Connectivity(message),
            ProviderError::Timeout { .. } => Self::Timeout(message),
        }
    }
}

impl From<ExtractionError> for SummarizeError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::UnsupportedFormat(extension) => Self::UnsupportedFormat(extension),
            other => Self::Extraction(other.to_string()),
        }
    }
}

impl From<CredentialError> for SummarizeError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::NotFound(_) => Self::NotFound(error.to_string()),
            CredentialError::InvalidKey => Self::BadRequest(error.to_string()),
            CredentialError::Io(_) | CredentialError::Corrupt(_) => {
                Self::Storage(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_keep_distinct_kinds() {
        let timeout: SummarizeError = ProviderError::Timeout {
            provider: ProviderName::Groq,
            timeout: std::time::Duration::from_secs(60),
        }
        .into();
        assert_eq!(timeout.kind(), ErrorKind::Timeout);

        let upstream: SummarizeError = ProviderError::Upstream {
            provider: ProviderName::Gemini,
            status: 429,
            message: "quota".into(),
        }
        .into();
        assert_eq!(upstream.kind(), ErrorKind::Provider);
        assert!(upstream.to_string().contains("429"));

        let offline: SummarizeError = ProviderError::Connectivity {
            provider: ProviderName::Groq,
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(offline.kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn short_input_reports_as_bad_request() {
        let report = SummarizeError::InputTooShort {
            length: 10,
            minimum: 50,
        }
        .report();
        assert!(!report.success);
        assert_eq!(report.error_kind, ErrorKind::BadRequest);
        assert!(report.message.contains("too short"));
    }

    #[test]
    fn error_kinds_serialize_as_snake_case() {
        let json = serde_json::to_value(SummarizeError::NotConfigured.report()).expect("json");
        assert_eq!(json["error_kind"], "not_configured");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn precedence_prefers_uploaded_files() {
        assert_eq!(INPUT_PRECEDENCE, InputPrecedence::PreferFile);
    }
}
