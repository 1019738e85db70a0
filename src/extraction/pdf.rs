//! PDF text extraction with a two-stage strategy.

use std::panic::{AssertUnwindSafe, catch_unwind};

/// Minimum non-whitespace characters for an extraction pass to count as usable.
pub(crate) const MIN_PDF_TEXT_CHARS: usize = 20;

/// Extract text using `pdf-extract`, falling back to per-page `lopdf` extraction when the
/// primary pass errors, panics, or returns too little text.
pub(crate) fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    extract_with_fallback(bytes, extract_with_layout)
}

fn extract_with_fallback(
    bytes: &[u8],
    primary: fn(&[u8]) -> Result<String, String>,
) -> Result<String, String> {
    let primary_failure = match primary(bytes) {
        Ok(text) if is_usable(&text) => {
            tracing::debug!(chars = text.len(), "Primary PDF extraction succeeded");
            return Ok(text);
        }
        Ok(text) => format!(
            "layout extraction returned only {} characters",
            non_whitespace_len(&text)
        ),
        Err(reason) => reason,
    };

    tracing::warn!(reason = %primary_failure, "Primary PDF extraction unusable; trying fallback");
    match extract_per_page(bytes) {
        Ok(text) if is_usable(&text) => Ok(text),
        Ok(_) => Err(format!(
            "{primary_failure}; fallback found no text (the PDF may be scanned or image-based)"
        )),
        Err(fallback_failure) => Err(format!("{primary_failure}; {fallback_failure}")),
    }
}

fn extract_with_layout(bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed font tables.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(format!("layout extraction failed: {error}")),
        Err(_) => Err("layout extraction panicked".to_string()),
    }
}

fn extract_per_page(bytes: &[u8]) -> Result<String, String> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|error| format!("fallback could not load PDF: {error}"))?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push_str(page_text.trim_end());
                text.push('\n');
            }
            Err(error) => {
                tracing::debug!(page = page_number, %error, "Skipping unreadable PDF page");
            }
        }
    }
    Ok(text)
}

fn is_usable(text: &str) -> bool {
    non_whitespace_len(text) >= MIN_PDF_TEXT_CHARS
}

fn non_whitespace_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usability_ignores_whitespace() {
        assert!(!is_usable("   \n\n  short \n"));
        assert!(is_usable("This sentence has plenty of characters."));
    }

    const SENTENCE: &str = "The board approved the warehouse budget today.";

    fn rendered_pdf() -> Vec<u8> {
        crate::rendering::render(SENTENCE, crate::rendering::OutputFormat::Pdf, "Title here")
            .expect("render pdf")
    }

    #[test]
    fn per_page_pass_reads_rendered_pdf() {
        let text = extract_per_page(&rendered_pdf()).expect("per-page text");
        assert!(text.contains("Title here"));
        assert!(text.contains(SENTENCE));
    }

    #[test]
    fn short_primary_text_triggers_fallback() {
        let text = extract_with_fallback(&rendered_pdf(), |_| Ok("  a  b ".to_string()))
            .expect("fallback text");
        assert!(text.contains(SENTENCE));
    }

    #[test]
    fn primary_failure_triggers_fallback() {
        let text = extract_with_fallback(&rendered_pdf(), |_| Err("broken fonts".to_string()))
            .expect("fallback text");
        assert!(text.contains(SENTENCE));
    }

    #[test]
    fn usable_primary_text_skips_fallback() {
        let text = extract_with_fallback(&[], |_| Ok(SENTENCE.to_string())).expect("primary");
        assert_eq!(text, SENTENCE);
    }

    #[test]
    fn empty_input_reports_both_stages() {
        let error = extract_pdf_text(&[]).expect_err("empty input");
        assert!(error.contains("layout extraction"));
        assert!(error.contains("fallback"));
    }
}
