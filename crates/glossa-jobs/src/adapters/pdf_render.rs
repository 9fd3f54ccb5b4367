//! PDF rendering with `lopdf`: plain single-column text documents.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

use glossa_core::defaults::{
    PDF_FONT_SIZE, PDF_LINE_HEIGHT, PDF_MARGIN, PDF_MAX_CHARS_PER_LINE, PDF_PAGE_HEIGHT,
    PDF_PAGE_WIDTH,
};
use glossa_core::{DocumentRenderer, Error, ParagraphChunker, Result};

/// Renders paragraph-structured text into a single-column A4 PDF.
///
/// Layout is deliberately plain: Helvetica body text, word wrap at a fixed
/// character budget with hard breaks for overlong words, one blank line
/// between paragraphs, and automatic page breaks. The artifact exists to
/// carry the translated text, not to reproduce the source layout.
pub struct PdfRenderer;

/// Wrap one line of text at `max_chars`, breaking words longer than a line.
fn wrap_line(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            // Hard-break a word that cannot fit on any line.
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let mut piece = String::new();
            let mut piece_len = 0;
            for ch in word.chars() {
                if piece_len == max_chars {
                    lines.push(std::mem::take(&mut piece));
                    piece_len = 0;
                }
                piece.push(ch);
                piece_len += 1;
            }
            current = piece;
            current_len = piece_len;
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            word_len + 1
        };
        if current_len + needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Flatten paragraphs into rendered lines, with a blank line between
/// paragraphs.
fn layout_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, para) in ParagraphChunker::split_paragraphs(text).iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        // A paragraph may carry hard line breaks of its own.
        for raw_line in para.lines() {
            lines.extend(wrap_line(raw_line, PDF_MAX_CHARS_PER_LINE));
        }
    }
    lines
}

/// Build the content stream for one page of lines.
fn encode_page(lines: &[String]) -> Result<Vec<u8>> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), PDF_FONT_SIZE.into()]),
        Operation::new(
            "Td",
            vec![
                PDF_MARGIN.into(),
                (PDF_PAGE_HEIGHT - PDF_MARGIN - PDF_LINE_HEIGHT).into(),
            ],
        ),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new(
                "Td",
                vec![0.into(), (-PDF_LINE_HEIGHT).into()],
            ));
        }
        if !line.is_empty() {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| Error::Render(format!("content stream encode failed: {}", e)))
}

impl PdfRenderer {
    fn render_document(text: &str) -> Result<Vec<u8>> {
        let lines = layout_lines(text);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let usable_height = PDF_PAGE_HEIGHT - 2.0 * PDF_MARGIN;
        let lines_per_page = ((usable_height / PDF_LINE_HEIGHT) as usize).max(1);

        let mut pages: Vec<&[String]> = lines.chunks(lines_per_page).collect();
        if pages.is_empty() {
            // An empty document still gets one blank page.
            pages.push(&[]);
        }

        let mut page_ids = Vec::with_capacity(pages.len());
        for page_lines in pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, encode_page(page_lines)?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_ids.len() as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    PDF_PAGE_WIDTH.into(),
                    PDF_PAGE_HEIGHT.into(),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Error::Render(format!("document serialization failed: {}", e)))?;
        Ok(bytes)
    }
}

#[async_trait]
impl DocumentRenderer for PdfRenderer {
    async fn render_text(&self, text: &str) -> Result<Vec<u8>> {
        let bytes = Self::render_document(text)?;
        debug!(
            subsystem = "jobs",
            chars = text.chars().count(),
            bytes = bytes.len(),
            "pdf rendered"
        );
        Ok(bytes)
    }
}
