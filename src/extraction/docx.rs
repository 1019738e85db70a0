//! Word document text extraction.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

/// Compound-file signature used by legacy binary `.doc` files.
const OLE_SIGNATURE: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Concatenate paragraph text in document order, one paragraph per line. Tables are skipped.
pub(crate) fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    if bytes.starts_with(&OLE_SIGNATURE) {
        return Err(
            "legacy binary .doc files are not supported; save the document as .docx".to_string(),
        );
    }

    let document = docx_rs::read_docx(bytes).map_err(|error| error.to_string())?;
    let mut lines = Vec::new();
    for child in &document.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for paragraph_child in &paragraph.children {
                if let ParagraphChild::Run(run) = paragraph_child {
                    for run_child in &run.children {
                        match run_child {
                            RunChild::Text(text) => line.push_str(&text.text),
                            RunChild::Tab(_) => line.push('\t'),
                            RunChild::Break(_) => line.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            lines.push(line);
        }
    }

    Ok(lines.join("\n"))
}
