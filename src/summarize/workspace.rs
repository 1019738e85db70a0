//! Scratch and output directories used by the pipeline.
//!
//! Uploads are staged under unique names and removed by [`StagedUpload`]'s `Drop`, so every
//! exit path of a request cleans up after itself. Rendered summaries stay in the output
//! directory until the next startup sweep.

use crate::rendering::OutputFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAX_STEM_CHARS: usize = 60;
const UPLOAD_PREFIX: &str = "upload_";
const OUTPUT_PREFIX: &str = "summary_";

/// Upload and output directories for one server process.
#[derive(Debug, Clone)]
pub struct Workspace {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    /// Describe a workspace; directories are created by [`Workspace::prepare`].
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Directory holding rendered summaries.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if they are missing.
    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Delete files a previous run left behind, creating the directories if needed.
    ///
    /// Only names this workspace generates are removed; anything else in the directories is
    /// left alone.
    pub async fn sweep(&self) -> std::io::Result<()> {
        self.prepare().await?;
        let uploads = sweep_dir(&self.upload_dir, is_staged_upload).await?;
        let outputs = sweep_dir(&self.output_dir, is_rendered_output).await?;
        if uploads + outputs > 0 {
            tracing::info!(uploads, outputs, "Cleared leftover files");
        }
        Ok(())
    }

    /// Write `bytes` to a uniquely named file in the upload directory.
    pub async fn stage_upload(&self, extension: &str, bytes: &[u8]) -> std::io::Result<StagedUpload> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self
            .upload_dir
            .join(format!("{UPLOAD_PREFIX}{}.{extension}", Uuid::new_v4().simple()));
        let staged = StagedUpload { path };
        tokio::fs::write(&staged.path, bytes).await?;
        Ok(staged)
    }

    /// Persist a rendered summary and return its unique file name.
    ///
    /// A partially written file is removed when the write fails.
    pub async fn write_output(
        &self,
        source_name: &str,
        format: OutputFormat,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = output_file_name(source_name, format);
        let path = self.output_dir.join(&file_name);
        if let Err(error) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(error);
        }
        Ok(file_name)
    }

    /// Resolve a download name to a path inside the output directory.
    ///
    /// Names containing path separators or parent references are rejected.
    pub fn resolve_download(&self, file_name: &str) -> Option<PathBuf> {
        let candidate = Path::new(file_name);
        let is_plain = !file_name.is_empty()
            && !file_name.contains("..")
            && !file_name.contains(['/', '\\'])
            && candidate.file_name().is_some_and(|name| name == file_name);
        is_plain.then(|| self.output_dir.join(file_name))
    }
}

/// Uploaded bytes on disk; the file is deleted when this guard is dropped.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged upload"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "Failed to remove staged upload");
            }
        }
    }
}

async fn sweep_dir(dir: &Path, owned: fn(&str) -> bool) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !owned(name) || !entry.file_type().await?.is_file() {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error),
        }
    }
    Ok(removed)
}

fn is_staged_upload(name: &str) -> bool {
    name.starts_with(UPLOAD_PREFIX)
}

fn is_rendered_output(name: &str) -> bool {
    name.starts_with(OUTPUT_PREFIX)
        && [OutputFormat::Pdf, OutputFormat::Docx]
            .iter()
            .any(|format| name.ends_with(&format!(".{}", format.extension())))
}

/// `summary_<stem>_<8 hex chars>.<ext>`
pub(crate) fn output_file_name(source_name: &str, format: OutputFormat) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{OUTPUT_PREFIX}{}_{}.{}",
        sanitize_stem(source_name),
        &suffix[..8],
        format.extension()
    )
}

/// Reduce a client file name to a safe stem of ASCII letters, digits, `-` and `_`.
pub(crate) fn sanitize_stem(source_name: &str) -> String {
    let base = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let cleaned: String = stem
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}
