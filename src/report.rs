//! PDF report rendering for generated summaries.
//!
//! The summary text is parsed line by line: a line wrapped in `**` markers
//! becomes a section heading, inline `**bold**` and `*italic*` markers become
//! styled spans, and everything else is a body paragraph. Unmatched markers
//! are kept as literal text; the parser never fails.

use crate::summary::Summary;
use printpdf::{
    BuiltinFont, CustomPdfConformance, IndirectFontRef, Mm, PdfConformance, PdfDocument,
    PdfDocumentReference, PdfLayerReference,
};
use thiserror::Error;
use time::OffsetDateTime;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 25.4;
const BOTTOM_MARGIN_MM: f32 = 20.0;

/// Points to millimetres
const PT_TO_MM: f32 = 0.352_778;

/// Average Helvetica glyph advance as a fraction of the font size. Used for
/// word wrapping; an estimate is enough for a text report.
const AVG_GLYPH_EM: f32 = 0.5;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const METADATA_SIZE: f32 = 9.0;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to build PDF document: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Inline emphasis of a text span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Regular,
    Bold,
    Italic,
}

/// A run of text with one emphasis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub emphasis: Emphasis,
}

impl Span {
    fn new(text: impl Into<String>, emphasis: Emphasis) -> Self {
        Span {
            text: text.into(),
            emphasis,
        }
    }
}

/// One parsed block of the summary text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(Vec<Span>),
}

/// Parse structured summary text into heading and paragraph blocks.
/// Blank lines are skipped; malformed markup degrades to literal text.
pub fn parse_markup(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.len() >= 4 && line.starts_with("**") && line.ends_with("**") {
            let heading = line.trim_matches('*').trim();
            blocks.push(Block::Heading(heading.to_string()));
        } else {
            blocks.push(Block::Paragraph(parse_inline(line)));
        }
    }

    blocks
}

/// Split a line into styled spans. `**…**` pairs become bold, `*…*` pairs
/// italic; a marker with no closing partner is literal text.
fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut literal = String::new();
    let mut rest = line;

    let mut flush = |literal: &mut String, spans: &mut Vec<Span>| {
        if !literal.is_empty() {
            spans.push(Span::new(std::mem::take(literal), Emphasis::Regular));
        }
    };

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                flush(&mut literal, &mut spans);
                if end > 0 {
                    spans.push(Span::new(&after[..end], Emphasis::Bold));
                }
                rest = &after[end + 2..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix('*') {
            if let Some(end) = after.find('*') {
                flush(&mut literal, &mut spans);
                if end > 0 {
                    spans.push(Span::new(&after[..end], Emphasis::Italic));
                }
                rest = &after[end + 1..];
                continue;
            }
        }

        let ch = rest.chars().next().expect("rest is non-empty");
        literal.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    flush(&mut literal, &mut spans);
    spans
}

/// Replace every character outside `[A-Za-z0-9_]` in the trimmed title
/// with an underscore, for use as a download filename.
pub fn clean_filename(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn text_width_mm(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVG_GLYPH_EM * PT_TO_MM
}

fn line_height_mm(font_size: f32) -> f32 {
    font_size * 1.4 * PT_TO_MM
}

/// Greedy word wrap of styled spans into visual lines that fit the usable
/// page width. Words keep their emphasis; an overlong word gets its own line.
fn wrap_spans(spans: &[Span], font_size: f32, max_width_mm: f32) -> Vec<Vec<Span>> {
    let words: Vec<(&str, Emphasis)> = spans
        .iter()
        .flat_map(|span| {
            span.text
                .split_whitespace()
                .map(move |word| (word, span.emphasis))
        })
        .collect();

    let space_mm = text_width_mm(" ", font_size);
    let mut lines: Vec<Vec<(String, Emphasis)>> = Vec::new();
    let mut current: Vec<(String, Emphasis)> = Vec::new();
    let mut current_width = 0.0_f32;

    for (word, emphasis) in words {
        let word_width = text_width_mm(word, font_size);
        let extra = if current.is_empty() {
            word_width
        } else {
            space_mm + word_width
        };

        if !current.is_empty() && current_width + extra > max_width_mm {
            lines.push(std::mem::take(&mut current));
            current_width = word_width;
        } else {
            current_width += extra;
        }
        current.push((word.to_string(), emphasis));
    }
    if !current.is_empty() {
        lines.push(current);
    }

    // Merge adjacent words of equal emphasis back into spans
    lines
        .into_iter()
        .map(|line| {
            let mut merged: Vec<Span> = Vec::new();
            for (word, emphasis) in line {
                match merged.last_mut() {
                    Some(span) if span.emphasis == emphasis => {
                        span.text.push(' ');
                        span.text.push_str(&word);
                    }
                    _ => merged.push(Span::new(word, emphasis)),
                }
            }
            merged
        })
        .collect()
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn for_emphasis(&self, emphasis: Emphasis) -> &IndirectFontRef {
        match emphasis {
            Emphasis::Regular => &self.regular,
            Emphasis::Bold => &self.bold,
            Emphasis::Italic => &self.italic,
        }
    }
}

/// Cursor over the current page; adds pages as content runs past the
/// bottom margin.
struct Layout<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl<'a> Layout<'a> {
    fn ensure_room(&mut self, needed_mm: f32) {
        if self.y - needed_mm < BOTTOM_MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Write one visual line of spans starting at the left margin
    fn write_line(&mut self, spans: &[Span], font_size: f32, fonts: &Fonts) {
        self.ensure_room(line_height_mm(font_size));
        let mut x = MARGIN_MM;
        for (index, span) in spans.iter().enumerate() {
            let text = if index + 1 < spans.len() {
                format!("{} ", span.text)
            } else {
                span.text.clone()
            };
            self.layer.use_text(
                text.clone(),
                font_size,
                Mm(x),
                Mm(self.y),
                fonts.for_emphasis(span.emphasis),
            );
            x += text_width_mm(&text, font_size);
        }
        self.advance(line_height_mm(font_size));
    }

    /// Write a paragraph, word-wrapped to the usable width
    fn write_paragraph(&mut self, spans: &[Span], font_size: f32, fonts: &Fonts) {
        let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
        for line in wrap_spans(spans, font_size, usable) {
            self.write_line(&line, font_size, fonts);
        }
    }

    /// Write a horizontally centered line
    fn write_centered(&mut self, text: &str, font_size: f32, font: &IndirectFontRef) {
        self.ensure_room(line_height_mm(font_size));
        let width = text_width_mm(text, font_size);
        let x = ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_MM);
        self.layer
            .use_text(text, font_size, Mm(x), Mm(self.y), font);
        self.advance(line_height_mm(font_size));
    }
}

/// Render the summary as a paginated PDF report.
///
/// Output is deterministic: the document dates are pinned to the summary's
/// generation timestamp, so identical inputs give byte-identical PDFs.
pub fn render(summary: &Summary) -> Result<Vec<u8>, RenderError> {
    let (doc, page, layer) = PdfDocument::new(
        "Research Summary Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let stamp = OffsetDateTime::from_unix_timestamp(summary.generated_at.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }))
        .with_creation_date(stamp)
        .with_mod_date(stamp);

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
    };

    let mut layout = Layout {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        y: PAGE_HEIGHT_MM - MARGIN_MM,
    };

    // Title block
    layout.write_centered("Research Summary Report", TITLE_SIZE, &fonts.bold);
    layout.advance(7.0);

    // Metadata block
    let generated = summary
        .generated_at
        .format("%B %d, %Y at %H:%M UTC")
        .to_string();
    for line in [
        format!("Generated: {}", generated),
        format!("Search Query: {}", summary.query),
        format!("Source URL: {}", summary.source_link),
        format!("Document Title: {}", summary.title),
    ] {
        let spans = [Span::new(line, Emphasis::Regular)];
        layout.write_paragraph(&spans, METADATA_SIZE, &fonts);
    }
    layout.advance(7.0);

    // Parsed body
    for block in parse_markup(&summary.text) {
        match block {
            Block::Heading(heading) => {
                layout.ensure_room(line_height_mm(HEADING_SIZE) + 4.0);
                layout.advance(4.0);
                let spans = [Span::new(heading, Emphasis::Bold)];
                layout.write_line(&spans, HEADING_SIZE, &fonts);
                layout.advance(1.5);
            }
            Block::Paragraph(spans) => {
                layout.write_paragraph(&spans, BODY_SIZE, &fonts);
                layout.advance(3.0);
            }
        }
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_summary(text: &str) -> Summary {
        Summary {
            title: "A Study: Effects!".to_string(),
            source_link: "https://example.org/paper".to_string(),
            query: "study effects".to_string(),
            text: text.to_string(),
            generated_at: chrono::Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn heading_lines_are_detected() {
        let blocks = parse_markup("**Key Findings**\nSome text with **bold** and *italic*.");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Block::Heading("Key Findings".to_string()));

        match &blocks[1] {
            Block::Paragraph(spans) => {
                assert_eq!(
                    spans,
                    &vec![
                        Span::new("Some text with ", Emphasis::Regular),
                        Span::new("bold", Emphasis::Bold),
                        Span::new(" and ", Emphasis::Regular),
                        Span::new("italic", Emphasis::Italic),
                        Span::new(".", Emphasis::Regular),
                    ]
                );
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        let blocks = parse_markup("first\n\n\nsecond\n");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn unmatched_markers_are_literal() {
        let blocks = parse_markup("an *unclosed marker");
        match &blocks[0] {
            Block::Paragraph(spans) => {
                assert_eq!(spans, &vec![Span::new("an *unclosed marker", Emphasis::Regular)]);
            }
            other => panic!("expected paragraph, got {:?}", other),
        }

        // A dangling double marker degrades without panicking
        let blocks = parse_markup("broken ** bold");
        assert!(matches!(&blocks[0], Block::Paragraph(_)));
    }

    #[test]
    fn heading_requires_both_markers() {
        let blocks = parse_markup("**Not a heading\nAlso not**");
        assert!(blocks.iter().all(|b| matches!(b, Block::Paragraph(_))));
    }

    #[test]
    fn filename_is_sanitized() {
        assert_eq!(clean_filename("A Study: Effects!"), "A_Study__Effects_");
        assert_eq!(clean_filename("  plain_title9  "), "plain_title9");
        assert_eq!(clean_filename("ümlaut"), "_mlaut");
    }

    #[test]
    fn wrapping_respects_the_width() {
        let spans = [Span::new("word ".repeat(100), Emphasis::Regular)];
        let lines = wrap_spans(&spans, BODY_SIZE, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            let width: f32 = line
                .iter()
                .map(|span| text_width_mm(&span.text, BODY_SIZE))
                .sum();
            assert!(width <= 61.0, "line too wide: {width}");
        }
    }

    #[test]
    fn render_produces_a_pdf() {
        let summary = fixed_summary("**Title**\nA Study\n**Key Findings**\nIt *works*.");
        let bytes = render(&summary).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn render_is_idempotent_for_fixed_inputs() {
        let summary = fixed_summary("**Key Findings**\nSame input, same bytes.");
        let first = render(&summary).unwrap();
        let second = render(&summary).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn render_tolerates_malformed_markup() {
        let summary = fixed_summary("***\n** ** **\n*\n**unclosed\nplain");
        let bytes = render(&summary).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_paragraphs_paginate() {
        let body = format!("**Key Findings**\n{}", "A finding sentence. ".repeat(600));
        let summary = fixed_summary(&body);
        let bytes = render(&summary).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
