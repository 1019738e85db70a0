use std::io::Write;

use docsum::{
    extraction,
    rendering::{self, OutputFormat},
};

const SUMMARY: &str = "Revenue grew twelve percent year over year.\n\n\
Operating costs stayed flat.\n\n\
The board approved a new warehouse in Denver.";

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_rendered(format: OutputFormat) -> String {
    let bytes = rendering::render(SUMMARY, format, "Summary of report.pdf").expect("render");
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", format.extension()))
        .tempfile()
        .expect("temp file");
    file.write_all(&bytes).expect("write rendered file");
    let document = extraction::extract(file.path(), format.extension()).expect("extract");
    collapse(&document.raw_text)
}

#[test]
fn rendered_pdf_extracts_back_to_summary_sentences() {
    let text = extract_rendered(OutputFormat::Pdf);
    assert!(text.contains("Summary of report.pdf"), "title missing: {text}");
    for sentence in SUMMARY.split("\n\n") {
        assert!(text.contains(sentence), "missing '{sentence}' in: {text}");
    }
}

#[test]
fn rendered_docx_extracts_back_to_summary_sentences() {
    let text = extract_rendered(OutputFormat::Docx);
    assert!(text.starts_with("Summary of report.pdf"));
    for sentence in SUMMARY.split("\n\n") {
        assert!(text.contains(sentence), "missing '{sentence}' in: {text}");
    }
}
