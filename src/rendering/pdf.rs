//! Paginated PDF layout on top of `lopdf`.
//!
//! Text is set in the standard Helvetica faces so no font program needs embedding. Line
//! breaking is greedy and uses approximate Helvetica advance widths; a page break happens
//! whenever the next line would cross the bottom margin.

use super::RenderError;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 18.0;
const TITLE_LEADING: f32 = 24.0;
const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = 15.0;
const PARAGRAPH_GAP: f32 = 8.0;

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource_name(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

/// Accumulates content-stream operations page by page.
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    cursor: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn line(&mut self, text: &str, face: Face, size: f32, leading: f32) {
        if self.cursor - leading < MARGIN {
            self.pages.push(Vec::new());
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
        self.cursor -= leading;
        let Some(operations) = self.pages.last_mut() else {
            return;
        };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![face.resource_name().into(), size.into()],
        ));
        operations.push(Operation::new("Td", vec![MARGIN.into(), self.cursor.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(text),
                StringFormat::Hexadecimal,
            )],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    fn gap(&mut self, amount: f32) {
        self.cursor -= amount;
    }
}

pub(crate) fn render_pdf(summary: &str, title: &str) -> Result<Vec<u8>, RenderError> {
    let mut writer = PageWriter::new();

    for line in wrap(title, TITLE_SIZE, 1.08) {
        writer.line(&line, Face::Bold, TITLE_SIZE, TITLE_LEADING);
    }
    writer.gap(PARAGRAPH_GAP * 2.0);

    for paragraph in summary.lines() {
        if paragraph.trim().is_empty() {
            continue;
        }
        for line in wrap(paragraph.trim(), BODY_SIZE, 1.0) {
            writer.line(&line, Face::Regular, BODY_SIZE, BODY_LEADING);
        }
        writer.gap(PARAGRAPH_GAP);
    }

    assemble(writer.pages, title)
}

fn assemble(pages: Vec<Vec<Operation>>, title: &str) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|error| RenderError::Pdf(error.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal("Document Summarizer"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|error| RenderError::Pdf(error.to_string()))?;
    Ok(bytes)
}

/// Greedy word wrap against [`TEXT_WIDTH`]; words wider than a line are split by character.
fn wrap(text: &str, size: f32, weight: f32) -> Vec<String> {
    let space = char_width(' ') * size * weight;
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_width = text_width(word, size, weight);
        if word_width > TEXT_WIDTH {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            for piece in split_long_word(word, size, weight) {
                lines.push(piece);
            }
            if let Some(last) = lines.pop() {
                current_width = text_width(&last, size, weight);
                current = last;
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + space + word_width
        };
        if needed > TEXT_WIDTH {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_long_word(word: &str, size: f32, weight: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0_f32;
    for ch in word.chars() {
        let advance = char_width(ch) * size * weight;
        if width + advance > TEXT_WIDTH && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(ch);
        width += advance;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

fn text_width(text: &str, size: f32, weight: f32) -> f32 {
    text.chars().map(char_width).sum::<f32>() * size * weight
}

/// Approximate Helvetica advance width as a fraction of the font size.
fn char_width(ch: char) -> f32 {
    match ch {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' | 'I' => 0.28,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.89,
        'A'..='Z' => 0.70,
        _ => 0.56,
    }
}

/// Encode text for a WinAnsi simple font, approximating characters outside the code page.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' => bytes.push(b'\''),
            '\u{201C}' | '\u{201D}' => bytes.push(b'"'),
            '\u{2013}' | '\u{2014}' => bytes.push(b'-'),
            '\u{2022}' => bytes.push(0x95),
            '\u{2026}' => bytes.extend_from_slice(b"..."),
            '\t' => bytes.push(b' '),
            c if (c as u32) >= 0x20 && (c as u32) < 0x7F => bytes.push(c as u8),
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => bytes.push(c as u32 as u8),
            _ => bytes.push(b'?'),
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_lines_within_text_width() {
        let text = "The board discussed quarterly revenue, hiring plans, and the roadmap. ".repeat(12);
        let lines = wrap(&text, BODY_SIZE, 1.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, BODY_SIZE, 1.0) <= TEXT_WIDTH + 0.01);
        }
        let rejoined = lines.join(" ");
        assert_eq!(
            rejoined.split_whitespace().collect::<Vec<_>>(),
            text.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn wrap_splits_words_longer_than_a_line() {
        let word = "x".repeat(400);
        let lines = wrap(&word, BODY_SIZE, 1.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn long_summaries_span_multiple_pages() {
        let summary = (0..120)
            .map(|i| format!("Point {i}: the committee approved the revised budget for next year."))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = render_pdf(&summary, "Summary of minutes.txt").expect("pdf");
        let document = Document::load_mem(&bytes).expect("parse rendered pdf");
        assert!(document.get_pages().len() > 1);
    }

    #[test]
    fn win_ansi_encoding_substitutes_unsupported_characters() {
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("“ok”—fine…"), b"\"ok\"-fine...".to_vec());
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
