//! HTTP surface for the document summarizer.
//!
//! - `POST /summarize` – Multipart form with an optional `file`, optional pasted `text`
//!   (`manual_text` is accepted as an alias), `output_format` (`pdf` | `docx` | `word`),
//!   `summary_length` (`brief` | `standard` | `detailed`) and an optional `provider`.
//!   Returns `{ success, summary, download_filename, output_format, provider }`.
//! - `GET /download/:filename` – Serve a rendered summary from the output directory.
//! - `GET /providers`, `POST /providers` – List masked credentials / store a new key.
//! - `DELETE /providers/:provider` – Remove a stored key.
//! - `POST /providers/:provider/default` – Change the default provider.
//! - `POST /providers/test` – Check a key against the provider.
//! - `GET /health` – Liveness plus provider configuration state.
//! - `GET /metrics` – Request counters.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! Failures are returned as `{ success: false, error_kind, message }` with a status code
//! derived from the error kind.

use crate::credentials::CredentialSummary;
use crate::providers::{ProviderName, SummaryLength};
use crate::rendering::OutputFormat;
use crate::summarize::{
    AddProviderRequest, ErrorKind, MAX_UPLOAD_BYTES, SummarizeApi, SummarizeError,
    SummarizeRequest, SummaryOutcome, UploadedDocument,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Room for multipart boundaries and the small text fields sent next to the file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the HTTP router exposing the summarizer API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummarizeApi + 'static,
{
    Router::new()
        .route(
            "/summarize",
            post(summarize::<S>)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/download/:filename", get(download::<S>))
        .route(
            "/providers",
            get(list_providers::<S>).post(add_provider::<S>),
        )
        .route("/providers/test", post(test_provider::<S>))
        .route("/providers/:provider", delete(remove_provider::<S>))
        .route("/providers/:provider/default", post(set_default_provider::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Success response for `POST /summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    success: bool,
    #[serde(flatten)]
    outcome: SummaryOutcome,
}

/// Summarize an uploaded document or pasted text and render the result for download.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: SummarizeApi,
{
    let request = read_summarize_form(multipart).await?;
    let outcome = service.summarize(request).await?;
    tracing::info!(
        provider = %outcome.provider,
        file = %outcome.download_filename,
        "Summarize request completed"
    );
    Ok(Json(SummarizeResponse {
        success: true,
        outcome,
    }))
}

async fn read_summarize_form(mut multipart: Multipart) -> Result<SummarizeRequest, AppError> {
    let mut request = SummarizeRequest::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                request.upload = Some(UploadedDocument {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "text" | "manual_text" => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    request.text = Some(text);
                }
            }
            "output_format" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    request.output_format = value.parse::<OutputFormat>().map_err(|()| {
                        bad_request(format!("Unsupported output format '{}'", value.trim()))
                    })?;
                }
            }
            "summary_length" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    request.length = value.parse::<SummaryLength>().map_err(|()| {
                        bad_request(format!("Unknown summary length '{}'", value.trim()))
                    })?;
                }
            }
            "provider" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    request.provider = Some(parse_provider(&value)?);
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(request)
}

/// Serve a rendered summary as an attachment.
async fn download<S>(
    State(service): State<Arc<S>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError>
where
    S: SummarizeApi,
{
    let file = service.download(&filename).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// Response body for `GET /providers`.
#[derive(Serialize)]
struct ProvidersResponse {
    configured: bool,
    providers: Vec<CredentialSummary>,
}

/// List stored provider credentials with masked keys.
async fn list_providers<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<ProvidersResponse>, AppError>
where
    S: SummarizeApi,
{
    let providers = service.list_providers().await?;
    Ok(Json(ProvidersResponse {
        configured: !providers.is_empty(),
        providers,
    }))
}

/// Request body for `POST /providers`.
#[derive(Deserialize)]
struct AddProviderBody {
    provider: String,
    api_key: String,
    #[serde(default)]
    set_default: bool,
    #[serde(default)]
    validate: bool,
}

/// Store a provider credential, optionally validating it first.
async fn add_provider<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<AddProviderBody>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: SummarizeApi,
{
    let provider = parse_provider(&body.provider)?;
    service
        .add_provider(AddProviderRequest {
            provider,
            api_key: body.api_key,
            set_default: body.set_default,
            validate: body.validate,
        })
        .await?;
    tracing::info!(provider = %provider, "Provider credential stored");
    Ok(Json(json!({ "success": true })))
}

/// Remove a provider credential.
async fn remove_provider<S>(
    State(service): State<Arc<S>>,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: SummarizeApi,
{
    service.remove_provider(parse_provider(&provider)?).await?;
    Ok(Json(json!({ "success": true })))
}

/// Make a stored provider the default.
async fn set_default_provider<S>(
    State(service): State<Arc<S>>,
    Path(provider): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: SummarizeApi,
{
    service
        .set_default_provider(parse_provider(&provider)?)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// Request body for `POST /providers/test`.
#[derive(Deserialize)]
struct TestProviderBody {
    provider: String,
    #[serde(default)]
    api_key: Option<String>,
}

/// Check a key against its provider without storing it.
async fn test_provider<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<TestProviderBody>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: SummarizeApi,
{
    let provider = parse_provider(&body.provider)?;
    let valid = service.test_provider(provider, body.api_key).await?;
    Ok(Json(json!({ "success": true, "valid": valid })))
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    providers_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_provider: Option<ProviderName>,
}

/// Report liveness and whether a provider is configured.
async fn health<S>(State(service): State<Arc<S>>) -> Result<Json<HealthResponse>, AppError>
where
    S: SummarizeApi,
{
    let snapshot = service.health().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        providers_configured: snapshot.providers_configured,
        default_provider: snapshot.default_provider,
    }))
}

/// Return summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: SummarizeApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize an uploaded PDF, Word, or text file (multipart field `file`) or pasted text (`text`) and render the summary as PDF or Word.",
                request_example: Some(json!({
                    "text": "Pasted document contents",
                    "output_format": "pdf",
                    "summary_length": "standard",
                    "provider": "gemini"
                })),
            },
            CommandDescriptor {
                name: "download",
                method: "GET",
                path: "/download/:filename",
                description: "Download a rendered summary by the `download_filename` returned from /summarize.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_providers",
                method: "GET",
                path: "/providers",
                description: "List configured AI providers with masked API keys.",
                request_example: None,
            },
            CommandDescriptor {
                name: "add_provider",
                method: "POST",
                path: "/providers",
                description: "Store an API key for a provider, optionally validating it and making it the default.",
                request_example: Some(json!({
                    "provider": "groq",
                    "api_key": "gsk_...",
                    "set_default": true,
                    "validate": true
                })),
            },
            CommandDescriptor {
                name: "remove_provider",
                method: "DELETE",
                path: "/providers/:provider",
                description: "Delete a stored provider key; the earliest remaining provider becomes the default.",
                request_example: None,
            },
            CommandDescriptor {
                name: "set_default_provider",
                method: "POST",
                path: "/providers/:provider/default",
                description: "Use this provider when a request does not name one.",
                request_example: None,
            },
            CommandDescriptor {
                name: "test_provider",
                method: "POST",
                path: "/providers/test",
                description: "Check an API key (or the stored key when omitted) against the provider.",
                request_example: Some(json!({
                    "provider": "gemini",
                    "api_key": "AIza..."
                })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness check reporting whether a provider is configured.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters.",
                request_example: None,
            },
        ],
    })
}

fn parse_provider(raw: &str) -> Result<ProviderName, AppError> {
    raw.parse::<ProviderName>()
        .map_err(|()| bad_request(format!("Unknown provider '{}'", raw.trim())))
}

fn bad_request(message: String) -> AppError {
    AppError(SummarizeError::BadRequest(message))
}

fn multipart_error(error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError(SummarizeError::PayloadTooLarge {
            limit: MAX_UPLOAD_BYTES,
        });
    }
    bad_request(format!("Malformed form data: {}", error.body_text()))
}

struct AppError(SummarizeError);

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotConfigured => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Provider => StatusCode::BAD_GATEWAY,
        ErrorKind::Connectivity => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Render | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = self.0.report();
        (status_for(report.error_kind), Json(report)).into_response()
    }
}

impl From<SummarizeError> for AppError {
    fn from(inner: SummarizeError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::credentials::CredentialSummary;
    use crate::metrics::MetricsSnapshot;
    use crate::providers::{ProviderName, SummaryLength};
    use crate::rendering::OutputFormat;
    use crate::summarize::{
        AddProviderRequest, HealthSnapshot, RenderedFile, SummarizeApi, SummarizeError,
        SummarizeRequest, SummaryOutcome,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docsum-test-boundary";

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/summarize");
        assert!(commands.iter().any(|cmd| cmd.path == "/download/:filename"));
    }

    #[tokio::test]
    async fn summarize_route_parses_multipart_form() {
        let service = Arc::new(StubService::default());
        let app = create_router(service.clone());

        let body = multipart_body(&[
            Part::File("file", "report.pdf", b"%PDF-1.4 fake"),
            Part::Text("manual_text", "ignored when a file is present"),
            Part::Text("output_format", "word"),
            Part::Text("summary_length", "detailed"),
            Part::Text("provider", "groq"),
        ]);
        let response = app
            .oneshot(multipart_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["download_filename"], "summary_report_0123abcd.docx");
        assert_eq!(json["output_format"], "docx");

        let calls = service.summarize_calls.lock().await;
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        let upload = call.upload.as_ref().expect("upload forwarded");
        assert_eq!(upload.file_name, "report.pdf");
        assert_eq!(upload.bytes, b"%PDF-1.4 fake");
        assert_eq!(call.text.as_deref(), Some("ignored when a file is present"));
        assert_eq!(call.output_format, OutputFormat::Docx);
        assert_eq!(call.length, SummaryLength::Detailed);
        assert_eq!(call.provider, Some(ProviderName::Groq));
    }

    #[tokio::test]
    async fn summarize_route_rejects_unknown_output_format() {
        let service = Arc::new(StubService::default());
        let app = create_router(service.clone());
        let body = multipart_body(&[
            Part::Text("text", "Some pasted text"),
            Part::Text("output_format", "html"),
        ]);

        let response = app
            .oneshot(multipart_request(body))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "bad_request");
        assert!(service.summarize_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn pipeline_errors_map_to_status_codes() {
        let cases = [
            (SummarizeError::UnsupportedFormat(".exe".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format"),
            (SummarizeError::NotConfigured, StatusCode::CONFLICT, "not_configured"),
            (SummarizeError::Timeout("slow".into()), StatusCode::GATEWAY_TIMEOUT, "timeout"),
            (SummarizeError::Connectivity("offline".into()), StatusCode::SERVICE_UNAVAILABLE, "connectivity"),
            (SummarizeError::Extraction("scanned".into()), StatusCode::UNPROCESSABLE_ENTITY, "extraction"),
            (
                SummarizeError::Provider {
                    provider: ProviderName::Gemini,
                    status: Some(500),
                    message: "upstream".into(),
                },
                StatusCode::BAD_GATEWAY,
                "provider",
            ),
        ];

        for (error, status, kind) in cases {
            let service = Arc::new(StubService::failing(error));
            let app = create_router(service);
            let body = multipart_body(&[Part::Text("text", "Some pasted text")]);
            let response = app
                .oneshot(multipart_request(body))
                .await
                .expect("router response");
            assert_eq!(response.status(), status);
            let json = body_json(response).await;
            assert_eq!(json["error_kind"], kind);
        }
    }

    #[tokio::test]
    async fn download_route_sets_attachment_headers() {
        let app = create_router(Arc::new(StubService::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download/summary_report_0123abcd.pdf")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"summary_report_0123abcd.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&bytes[..], b"%PDF-stub");
    }

    #[tokio::test]
    async fn add_provider_route_forwards_flags() {
        let service = Arc::new(StubService::default());
        let app = create_router(service.clone());
        let payload = json!({
            "provider": "Gemini",
            "api_key": "AIza-test",
            "set_default": true
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/providers")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let added = service.added.lock().await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].provider, ProviderName::Gemini);
        assert!(added[0].set_default);
        assert!(!added[0].validate);
    }

    #[tokio::test]
    async fn unknown_provider_in_path_is_bad_request() {
        let app = create_router(Arc::new(StubService::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/providers/openai")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_default_provider() {
        let app = create_router(Arc::new(StubService::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["providers_configured"], true);
        assert_eq!(json["default_provider"], "gemini");
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/summarize")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[derive(Default)]
    struct StubService {
        summarize_calls: Mutex<Vec<SummarizeRequest>>,
        added: Mutex<Vec<AddProviderRequest>>,
        failure: Mutex<Option<SummarizeError>>,
    }

    impl StubService {
        fn failing(error: SummarizeError) -> Self {
            Self {
                failure: Mutex::new(Some(error)),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl SummarizeApi for StubService {
        async fn summarize(
            &self,
            request: SummarizeRequest,
        ) -> Result<SummaryOutcome, SummarizeError> {
            if let Some(error) = self.failure.lock().await.take() {
                return Err(error);
            }
            let output_format = request.output_format;
            self.summarize_calls.lock().await.push(request);
            Ok(SummaryOutcome {
                summary: "A short summary.".into(),
                download_filename: format!("summary_report_0123abcd.{}", output_format.extension()),
                output_format,
                provider: ProviderName::Groq,
            })
        }

        async fn download(&self, file_name: &str) -> Result<RenderedFile, SummarizeError> {
            Ok(RenderedFile {
                file_name: file_name.to_string(),
                format: OutputFormat::Pdf,
                bytes: b"%PDF-stub".to_vec(),
            })
        }

        async fn list_providers(&self) -> Result<Vec<CredentialSummary>, SummarizeError> {
            Ok(Vec::new())
        }

        async fn add_provider(&self, request: AddProviderRequest) -> Result<(), SummarizeError> {
            self.added.lock().await.push(request);
            Ok(())
        }

        async fn remove_provider(&self, _provider: ProviderName) -> Result<(), SummarizeError> {
            Ok(())
        }

        async fn set_default_provider(
            &self,
            _provider: ProviderName,
        ) -> Result<(), SummarizeError> {
            Ok(())
        }

        async fn test_provider(
            &self,
            _provider: ProviderName,
            _api_key: Option<String>,
        ) -> Result<bool, SummarizeError> {
            Ok(true)
        }

        async fn health(&self) -> Result<HealthSnapshot, SummarizeError> {
            Ok(HealthSnapshot {
                providers_configured: true,
                default_provider: Some(ProviderName::Gemini),
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                summaries_completed: 0,
                summaries_failed: 0,
                characters_summarized: 0,
            }
        }
    }
}
