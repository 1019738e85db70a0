//! Rendering of summary text into downloadable documents.

mod docx;
mod pdf;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while generating an output document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// PDF layout or serialization failed.
    #[error("Failed to generate PDF: {0}")]
    Pdf(String),
    /// Word document packaging failed.
    #[error("Failed to generate Word document: {0}")]
    Docx(String),
}

/// Output document formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Paginated PDF.
    #[default]
    Pdf,
    /// Word (`.docx`) document.
    Docx,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// MIME type used when serving the file.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// Resolve a format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        extension.parse().ok()
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" | "word" => Ok(Self::Docx),
            _ => Err(()),
        }
    }
}

/// Render `summary` under a `title` heading in the requested format.
pub fn render(summary: &str, format: OutputFormat, title: &str) -> Result<Vec<u8>, RenderError> {
    let bytes = match format {
        OutputFormat::Pdf => pdf::render_pdf(summary, title)?,
        OutputFormat::Docx => docx::render_docx(summary, title)?,
    };
    tracing::debug!(format = format.extension(), bytes = bytes.len(), "Rendered summary");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_accepts_word_alias() {
        assert_eq!("word".parse::<OutputFormat>(), Ok(OutputFormat::Docx));
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_from_file_name() {
        assert_eq!(
            OutputFormat::from_file_name("summary_report_ab12cd34.docx"),
            Some(OutputFormat::Docx)
        );
        assert_eq!(OutputFormat::from_file_name("noextension"), None);
    }

    #[test]
    fn renders_both_formats() {
        let summary = "Revenue grew twelve percent.\n\nCosts were flat.";
        let pdf = render(summary, OutputFormat::Pdf, "Summary of report.pdf").expect("pdf");
        assert!(pdf.starts_with(b"%PDF-"));

        let docx = render(summary, OutputFormat::Docx, "Summary of report.pdf").expect("docx");
        assert!(docx.starts_with(b"PK"));
    }
}
