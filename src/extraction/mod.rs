//! Plain-text extraction for uploaded documents.
//!
//! Dispatch happens on the declared file extension: PDF goes through a layout-aware primary
//! extractor with a page-by-page fallback, Word documents are read paragraph by paragraph, and
//! text files are decoded as strict UTF-8. Extraction never deletes the source file; the
//! caller owns that cleanup.

mod docx;
mod pdf;

use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Extensions accepted by the upload surface.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "doc", "txt"];

/// Errors raised while turning a document into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared extension is not one of [`SUPPORTED_EXTENSIONS`].
    #[error("Unsupported file type '{0}'. Please upload a PDF, Word, or text file.")]
    UnsupportedFormat(String),
    /// The source file could not be read.
    #[error("Failed to read uploaded file: {0}")]
    Io(#[from] std::io::Error),
    /// The file was read but no text could be recovered.
    #[error("Could not extract text from {format} document: {reason}")]
    Failed {
        /// Format the extractor attempted to parse.
        format: SourceFormat,
        /// Human-readable description of the failure.
        reason: String,
    },
}

/// Document formats understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Portable Document Format.
    Pdf,
    /// Word document (`.docx`, also attempted for `.doc`).
    Docx,
    /// UTF-8 plain text.
    Txt,
}

impl SourceFormat {
    /// Resolve a declared extension (with or without a leading dot, any case).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word",
            Self::Txt => "text",
        };
        f.write_str(label)
    }
}

/// Text recovered from a single uploaded document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Format the text was extracted from.
    pub source_format: SourceFormat,
    /// Extracted text with trailing whitespace normalized.
    pub raw_text: String,
}

/// Extract plain text from `path`, dispatching on `declared_extension`.
pub fn extract(path: &Path, declared_extension: &str) -> Result<ExtractedDocument, ExtractionError> {
    let source_format = SourceFormat::from_extension(declared_extension)
        .ok_or_else(|| ExtractionError::UnsupportedFormat(declared_extension.to_string()))?;
    let bytes = std::fs::read(path)?;
    tracing::debug!(
        format = %source_format,
        bytes = bytes.len(),
        path = %path.display(),
        "Extracting document text"
    );

    let raw_text = match source_format {
        SourceFormat::Pdf => pdf::extract_pdf_text(&bytes),
        SourceFormat::Docx => docx::extract_docx_text(&bytes),
        SourceFormat::Txt => decode_text(&bytes),
    }
    .map_err(|reason| ExtractionError::Failed {
        format: source_format,
        reason,
    })?;

    Ok(ExtractedDocument {
        source_format,
        raw_text: normalize_whitespace(&raw_text),
    })
}

fn decode_text(bytes: &[u8]) -> Result<String, String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|error| format!("file is not valid UTF-8 ({error})"))
}

/// Trim trailing whitespace per line and collapse runs of blank lines into one.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || output.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        output.push_str(line);
        output.push('\n');
    }
    output.trim_end().to_string()
}
