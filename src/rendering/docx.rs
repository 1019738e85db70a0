//! Word document writer for rendered summaries.

use super::RenderError;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::io::Cursor;

/// Title size in half-points.
const TITLE_SIZE: usize = 32;

/// Build a single-section document: a bold title followed by one paragraph per blank-line
/// separated block. Single line breaks inside a block are kept as soft breaks.
pub(crate) fn render_docx(summary: &str, title: &str) -> Result<Vec<u8>, RenderError> {
    let mut docx = Docx::new().add_paragraph(
        Paragraph::new().add_run(Run::new().add_text(title).bold().size(TITLE_SIZE)),
    );

    for block in paragraphs(summary) {
        let mut run = Run::new();
        for (index, line) in block.iter().enumerate() {
            if index > 0 {
                run = run.add_break(BreakType::TextWrapping);
            }
            run = run.add_text(*line);
        }
        docx = docx.add_paragraph(Paragraph::new().add_run(run));
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|error| RenderError::Docx(error.to_string()))?;
    Ok(buffer.into_inner())
}

/// Group consecutive non-blank lines; blank lines separate paragraphs.
fn paragraphs(summary: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in summary.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let blocks = paragraphs("Intro line\nsecond line\n\n\nNext block\n   \nLast");
        assert_eq!(
            blocks,
            vec![
                vec!["Intro line", "second line"],
                vec!["Next block"],
                vec!["Last"]
            ]
        );
    }

    #[test]
    fn rendered_docx_reads_back_title_and_body() {
        let bytes = render_docx("First block.\n\nSecond block.", "Summary of notes.txt")
            .expect("docx");
        let document = docx_rs::read_docx(&bytes).expect("read back");
        let paragraphs = document
            .document
            .children
            .iter()
            .filter(|child| matches!(child, docx_rs::DocumentChild::Paragraph(_)))
            .count();
        assert_eq!(paragraphs, 3);
    }
}
