use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Default timeout applied to every outbound provider request.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// No home directory could be resolved for the default credential location.
    #[error("Unable to resolve a home directory; set DOCSUM_CREDENTIALS_PATH")]
    MissingHomeDirectory,
}

/// Runtime configuration for the Document Summarizer server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// JSON file holding provider credentials.
    pub credentials_path: PathBuf,
    /// Scratch directory for uploaded files awaiting extraction.
    pub upload_dir: PathBuf,
    /// Directory that receives rendered summaries.
    pub output_dir: PathBuf,
    /// Timeout applied to outbound provider requests.
    pub provider_timeout: Duration,
    /// Optional base URL override for the Gemini API.
    pub gemini_base_url: Option<String>,
    /// Optional base URL override for the Groq API.
    pub groq_base_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials_path = match load_env_optional("DOCSUM_CREDENTIALS_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_credentials_path()?,
        };

        Ok(Self {
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            credentials_path,
            upload_dir: load_env_optional("DOCSUM_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            output_dir: load_env_optional("DOCSUM_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("outputs")),
            provider_timeout: load_env_optional("PROVIDER_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse::<u64>()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("PROVIDER_TIMEOUT_SECS".into()))
                })
                .transpose()?
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS)),
            gemini_base_url: load_env_optional("GEMINI_BASE_URL"),
            groq_base_url: load_env_optional("GROQ_BASE_URL"),
        })
    }
}

/// Credentials live in a per-user directory so packaged installs can write to them.
fn default_credentials_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDirectory)?;
    Ok(home.join(".document_summarizer").join("config.json"))
}

/// Read an optional environment variable, treating blank values as absent.
pub fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        server_port = ?config.server_port,
        credentials = %config.credentials_path.display(),
        upload_dir = %config.upload_dir.display(),
        output_dir = %config.output_dir.display(),
        provider_timeout_secs = config.provider_timeout.as_secs(),
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
