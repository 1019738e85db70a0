//! Summarization service coordinating extraction, provider dispatch, and rendering.

use crate::{
    credentials::{CredentialStore, CredentialSummary, ResolvedCredential},
    extraction::{self, ExtractedDocument, SourceFormat},
    metrics::{MetricsSnapshot, SummaryMetrics},
    providers::{self, ProviderFactory, ProviderName},
    rendering::{self, OutputFormat, RenderError},
    summarize::{
        types::{
            AddProviderRequest, HealthSnapshot, INPUT_PRECEDENCE, InputPrecedence,
            MAX_UPLOAD_BYTES, RenderedFile, SummarizeError, SummarizeRequest, SummaryOutcome,
            UploadedDocument,
        },
        workspace::Workspace,
    },
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Name used for pasted text in titles and output file names.
const MANUAL_INPUT_NAME: &str = "manual_input.txt";

/// Abstraction over the summarizer used by the HTTP surface.
#[async_trait]
pub trait SummarizeApi: Send + Sync {
    /// Run one request through extraction, summarization, and rendering.
    async fn summarize(&self, request: SummarizeRequest) -> Result<SummaryOutcome, SummarizeError>;

    /// Load a previously rendered summary by file name.
    async fn download(&self, file_name: &str) -> Result<RenderedFile, SummarizeError>;

    /// List stored credentials with masked keys.
    async fn list_providers(&self) -> Result<Vec<CredentialSummary>, SummarizeError>;

    /// Store (or replace) a provider credential.
    async fn add_provider(&self, request: AddProviderRequest) -> Result<(), SummarizeError>;

    /// Delete a provider credential.
    async fn remove_provider(&self, provider: ProviderName) -> Result<(), SummarizeError>;

    /// Make `provider` the default.
    async fn set_default_provider(&self, provider: ProviderName) -> Result<(), SummarizeError>;

    /// Check a key against the provider; the stored key is used when `api_key` is `None`.
    async fn test_provider(
        &self,
        provider: ProviderName,
        api_key: Option<String>,
    ) -> Result<bool, SummarizeError>;

    /// Report whether the service can accept summarization requests.
    async fn health(&self) -> Result<HealthSnapshot, SummarizeError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Runs the summarization pipeline against the shared credential store and workspace.
///
/// Construct once at startup and share through an `Arc`; every request gets its own staged
/// upload and provider client, so requests never share mutable state besides the store.
pub struct SummarizeService {
    credentials: Arc<CredentialStore>,
    providers: Arc<dyn ProviderFactory>,
    workspace: Workspace,
    metrics: SummaryMetrics,
}

/// Input chosen for a request after applying [`INPUT_PRECEDENCE`].
enum Input {
    Upload(UploadedDocument),
    Text(String),
}

impl SummarizeService {
    /// Assemble a service from its collaborators.
    pub fn new(
        credentials: Arc<CredentialStore>,
        providers: Arc<dyn ProviderFactory>,
        workspace: Workspace,
    ) -> Self {
        Self {
            credentials,
            providers,
            workspace,
            metrics: SummaryMetrics::new(),
        }
    }

    async fn run(&self, request: SummarizeRequest) -> Result<SummaryOutcome, SummarizeError> {
        let SummarizeRequest {
            upload,
            text,
            output_format,
            length,
            provider,
        } = request;

        let (source_name, text) = match select_input(upload, text)? {
            Input::Upload(upload) => {
                let document = self.extract_upload(&upload).await?;
                tracing::info!(
                    file = %upload.file_name,
                    format = %document.source_format,
                    chars = document.raw_text.chars().count(),
                    "Extracted uploaded document"
                );
                (upload.file_name, document.raw_text)
            }
            Input::Text(text) => (MANUAL_INPUT_NAME.to_string(), text),
        };

        providers::ensure_min_length(&text)?;

        let credential = self.select_credential(provider).await?;
        let client = self
            .providers
            .build(credential.provider, &credential.api_key);
        tracing::info!(provider = %credential.provider, length = ?length, "Requesting summary");
        let summary = client.summarize(&text, length).await?;

        let title = format!("Summary of {source_name}");
        let bytes = render_blocking(summary.clone(), output_format, title).await?;
        let download_filename = self
            .workspace
            .write_output(&source_name, output_format, &bytes)
            .await
            .map_err(|error| SummarizeError::Storage(error.to_string()))?;

        self.metrics
            .record_success(text.trim().chars().count() as u64);
        tracing::info!(
            provider = %credential.provider,
            output = %download_filename,
            bytes = bytes.len(),
            "Summary rendered"
        );

        Ok(SummaryOutcome {
            summary,
            download_filename,
            output_format,
            provider: credential.provider,
        })
    }

    /// Validate, stage, and extract an upload. The staged file is gone when this returns.
    async fn extract_upload(
        &self,
        upload: &UploadedDocument,
    ) -> Result<ExtractedDocument, SummarizeError> {
        let extension = Path::new(&upload.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if SourceFormat::from_extension(&extension).is_none() {
            let shown = if extension.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{extension}")
            };
            return Err(SummarizeError::UnsupportedFormat(shown));
        }
        if upload.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(SummarizeError::PayloadTooLarge {
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let staged = self
            .workspace
            .stage_upload(&extension, &upload.bytes)
            .await
            .map_err(|error| SummarizeError::Storage(error.to_string()))?;
        let path = staged.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || extraction::extract(&path, &extension))
            .await
            .map_err(|error| SummarizeError::Extraction(format!("Extraction task failed: {error}")));
        drop(staged);
        Ok(result??)
    }

    async fn select_credential(
        &self,
        provider: Option<ProviderName>,
    ) -> Result<ResolvedCredential, SummarizeError> {
        match provider {
            Some(provider) => Ok(self.credentials.credential_for(provider).await?),
            None => self
                .credentials
                .default_credential()
                .await?
                .ok_or(SummarizeError::NotConfigured),
        }
    }
}

/// Apply [`INPUT_PRECEDENCE`]; an upload without a file name counts as absent.
fn select_input(
    upload: Option<UploadedDocument>,
    text: Option<String>,
) -> Result<Input, SummarizeError> {
    let upload = upload.filter(|upload| !upload.file_name.trim().is_empty());
    let text = text.filter(|text| !text.trim().is_empty());
    match (upload, text) {
        (None, None) => Err(SummarizeError::BadRequest(
            "Please upload a file or paste some text to summarize.".into(),
        )),
        (Some(upload), None) => Ok(Input::Upload(upload)),
        (None, Some(text)) => Ok(Input::Text(text)),
        (Some(upload), Some(text)) => {
            tracing::warn!(
                precedence = ?INPUT_PRECEDENCE,
                file = %upload.file_name,
                "Request carried both a file and pasted text"
            );
            Ok(match INPUT_PRECEDENCE {
                InputPrecedence::PreferFile => Input::Upload(upload),
                InputPrecedence::PreferText => Input::Text(text),
            })
        }
    }
}

async fn render_blocking(
    summary: String,
    format: OutputFormat,
    title: String,
) -> Result<Vec<u8>, SummarizeError> {
    let rendered = tokio::task::spawn_blocking(move || rendering::render(&summary, format, &title))
        .await
        .map_err(|error| {
            let reason = format!("render task failed: {error}");
            match format {
                OutputFormat::Pdf => RenderError::Pdf(reason),
                OutputFormat::Docx => RenderError::Docx(reason),
            }
        })?;
    Ok(rendered?)
}

#[async_trait]
impl SummarizeApi for SummarizeService {
    async fn summarize(&self, request: SummarizeRequest) -> Result<SummaryOutcome, SummarizeError> {
        let result = self.run(request).await;
        if let Err(error) = &result {
            self.metrics.record_failure();
            tracing::warn!(kind = ?error.kind(), %error, "Summarization request failed");
        }
        result
    }

    async fn download(&self, file_name: &str) -> Result<RenderedFile, SummarizeError> {
        let not_found = || SummarizeError::NotFound(format!("File '{file_name}' was not found"));
        let path = self
            .workspace
            .resolve_download(file_name)
            .ok_or_else(not_found)?;
        let format = OutputFormat::from_file_name(file_name).ok_or_else(not_found)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found());
            }
            Err(error) => return Err(SummarizeError::Storage(error.to_string())),
        };
        Ok(RenderedFile {
            file_name: file_name.to_string(),
            format,
            bytes,
        })
    }

    async fn list_providers(&self) -> Result<Vec<CredentialSummary>, SummarizeError> {
        Ok(self.credentials.list().await?)
    }

    async fn add_provider(&self, request: AddProviderRequest) -> Result<(), SummarizeError> {
        let AddProviderRequest {
            provider,
            api_key,
            set_default,
            validate,
        } = request;
        if api_key.trim().is_empty() {
            return Err(SummarizeError::BadRequest("API key must not be empty".into()));
        }
        if validate
            && !providers::test_connection(self.providers.as_ref(), provider, api_key.trim())
                .await?
        {
            return Err(SummarizeError::BadRequest(format!(
                "The {provider} API key was rejected. Please check the key and try again."
            )));
        }
        self.credentials.add(provider, &api_key).await?;
        if set_default {
            self.credentials.set_default(provider).await?;
        }
        Ok(())
    }

    async fn remove_provider(&self, provider: ProviderName) -> Result<(), SummarizeError> {
        Ok(self.credentials.remove(provider).await?)
    }

    async fn set_default_provider(&self, provider: ProviderName) -> Result<(), SummarizeError> {
        Ok(self.credentials.set_default(provider).await?)
    }

    async fn test_provider(
        &self,
        provider: ProviderName,
        api_key: Option<String>,
    ) -> Result<bool, SummarizeError> {
        let api_key = match api_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => key.trim().to_string(),
            None => self.credentials.credential_for(provider).await?.api_key,
        };
        Ok(providers::test_connection(self.providers.as_ref(), provider, &api_key).await?)
    }

    async fn health(&self) -> Result<HealthSnapshot, SummarizeError> {
        let default_provider = self
            .credentials
            .default_credential()
            .await?
            .map(|credential| credential.provider);
        Ok(HealthSnapshot {
            providers_configured: default_provider.is_some(),
            default_provider,
        })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
