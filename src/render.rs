//! Output renderers: plain text, Word (OOXML) and PDF.
//!
//! Every renderer takes the assembled report string. The title is the first
//! blank-line-delimited block; everything after it is body paragraphs, each
//! carrying the indentation marker, which the docx and pdf renderers strip
//! and replace with their own paragraph layout.

use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use zip::write::SimpleFileOptions;

use crate::report::{body_paragraphs, split_title};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown output format: '{0}' (expected text, docx, or pdf)")]
    UnknownFormat(String),
    #[error("docx packaging failed: {0}")]
    Docx(String),
    #[error("pdf generation failed: {0}")]
    Pdf(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Docx,
    Pdf,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self, RenderError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "docx" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(RenderError::UnknownFormat(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// Turns an assembled report into the bytes of one output file.
pub trait Renderer {
    fn render(&self, report: &str) -> Result<Vec<u8>, RenderError>;
}

pub fn renderer_for(format: OutputFormat, indent: &str) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Text => Box::new(TextRenderer),
        OutputFormat::Docx => Box::new(DocxRenderer::new(indent)),
        OutputFormat::Pdf => Box::new(PdfRenderer::new(indent)),
    }
}

/// Render `report` and write it to `path`, creating parent directories.
/// Returns the number of bytes written.
pub fn write_report(
    report: &str,
    renderer: &dyn Renderer,
    path: &Path,
) -> Result<u64, RenderError> {
    let bytes = renderer.render(report)?;
    let io_err = |source| RenderError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    std::fs::write(path, &bytes).map_err(io_err)?;
    Ok(bytes.len() as u64)
}

// ============ Text ============

pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, report: &str) -> Result<Vec<u8>, RenderError> {
        Ok(report.as_bytes().to_vec())
    }
}

// ============ Docx ============

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

/// First-line indent for body paragraphs, in twentieths of a point (half an inch).
const DOCX_FIRST_LINE_INDENT: u32 = 720;

/// Word document: centred bold title, justified body paragraphs with a
/// first-line indent.
pub struct DocxRenderer {
    indent: String,
    created: DateTime<Utc>,
}

impl DocxRenderer {
    pub fn new(indent: &str) -> Self {
        Self {
            indent: indent.to_string(),
            created: Utc::now(),
        }
    }

    /// Fix the creation timestamp recorded in the package metadata.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    fn document_xml(&self, report: &str) -> String {
        let (title, body) = split_title(report);
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        );
        xml.push_str(&format!(
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="32"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            quick_xml::escape::escape(title)
        ));
        for paragraph in body_paragraphs(body, &self.indent) {
            xml.push_str(&format!(
                r#"<w:p><w:pPr><w:jc w:val="both"/><w:ind w:firstLine="{}"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                DOCX_FIRST_LINE_INDENT,
                quick_xml::escape::escape(paragraph.trim())
            ));
        }
        xml.push_str("<w:sectPr/></w:body></w:document>");
        xml
    }

    fn core_xml(&self, title: &str) -> String {
        let stamp = self.created.format("%Y-%m-%dT%H:%M:%SZ");
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>litreport</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created></cp:coreProperties>"#,
            quick_xml::escape::escape(title),
            stamp
        )
    }
}

impl Renderer for DocxRenderer {
    fn render(&self, report: &str) -> Result<Vec<u8>, RenderError> {
        let (title, _) = split_title(report);
        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", PACKAGE_RELS.to_string()),
            ("docProps/core.xml", self.core_xml(title)),
            ("word/document.xml", self.document_xml(report)),
        ];

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            || SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in parts {
            zip.start_file(name, options())
                .map_err(|e| RenderError::Docx(e.to_string()))?;
            zip.write_all(content.as_bytes())
                .map_err(|e| RenderError::Docx(e.to_string()))?;
        }
        let cursor = zip.finish().map_err(|e| RenderError::Docx(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

// ============ PDF ============

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;
const TITLE_SIZE: i64 = 16;
const BODY_SIZE: i64 = 11;
const LEADING: i64 = 15;
/// Characters per line at the body size; Helvetica averages about half an em.
const WRAP_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
enum PdfLine {
    Title(String),
    Body(String),
    Blank,
}

/// Single-font (Helvetica) PDF with word wrapping and pagination.
pub struct PdfRenderer {
    indent: String,
}

impl PdfRenderer {
    pub fn new(indent: &str) -> Self {
        Self {
            indent: indent.to_string(),
        }
    }

    fn layout(&self, report: &str) -> Vec<PdfLine> {
        let (title, body) = split_title(report);
        let mut lines = vec![PdfLine::Title(transliterate(title)), PdfLine::Blank];
        for paragraph in body_paragraphs(body, &self.indent) {
            let text = format!("{}{}", self.indent, transliterate(paragraph.trim()));
            lines.extend(wrap(&text, WRAP_CHARS).into_iter().map(PdfLine::Body));
            lines.push(PdfLine::Blank);
        }
        if lines.last() == Some(&PdfLine::Blank) {
            lines.pop();
        }
        lines
    }

    fn lines_per_page() -> usize {
        ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize
    }
}

fn page_content(lines: &[PdfLine]) -> Content {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new(
            "Td",
            vec![Object::Integer(MARGIN), Object::Integer(PAGE_HEIGHT - MARGIN)],
        ),
    ];
    for line in lines {
        match line {
            PdfLine::Title(text) => {
                ops.push(font_op(TITLE_SIZE));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(text.as_bytes().to_vec())],
                ));
                ops.push(font_op(BODY_SIZE));
            }
            PdfLine::Body(text) => {
                ops.push(font_op(BODY_SIZE));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(text.as_bytes().to_vec())],
                ));
            }
            PdfLine::Blank => {}
        }
        ops.push(Operation::new("T*", vec![]));
    }
    ops.push(Operation::new("ET", vec![]));
    Content { operations: ops }
}

fn font_op(size: i64) -> Operation {
    Operation::new(
        "Tf",
        vec![Object::Name(b"F1".to_vec()), Object::Integer(size)],
    )
}

impl Renderer for PdfRenderer {
    fn render(&self, report: &str) -> Result<Vec<u8>, RenderError> {
        let lines = self.layout(report);
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for page_lines in lines.chunks(Self::lines_per_page()) {
            let content = page_content(page_lines)
                .encode()
                .map_err(|e| RenderError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(PAGE_WIDTH),
                    Object::Integer(PAGE_HEIGHT),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        Ok(out)
    }
}

/// Greedy word wrap at `width` characters. Words longer than a line are
/// placed on a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    // Leading indent survives as part of the first line.
    let lead = text.len() - text.trim_start().len();
    current.push_str(&text[..lead]);
    current_len += text[..lead].chars().count();
    let mut at_line_start = true;

    for word in text[lead..].split_whitespace() {
        let word_len = word.chars().count();
        let needed = if at_line_start { word_len } else { word_len + 1 };
        if !at_line_start && current_len + needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
            at_line_start = true;
        }
        if !at_line_start {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
        at_line_start = false;
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }
    lines
}

/// Reduce text to printable ASCII for the standard Helvetica font:
/// typographic punctuation is mapped, accents are stripped by
/// decomposition, and anything left over becomes `?`.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2002}'..='\u{200A}' => out.push(' '),
            '\u{00DF}' => out.push_str("ss"),
            '\u{00C6}' => out.push_str("AE"),
            '\u{00E6}' => out.push_str("ae"),
            '\u{0152}' => out.push_str("OE"),
            '\u{0153}' => out.push_str("oe"),
            '\u{00D8}' => out.push('O'),
            '\u{00F8}' => out.push('o'),
            c if c.is_ascii() => {
                if c.is_ascii_control() && c != '\n' {
                    out.push(' ');
                } else {
                    out.push(c);
                }
            }
            c => {
                let mut mapped = false;
                for d in std::iter::once(c).nfkd().filter(|d| !is_combining_mark(*d)) {
                    mapped = true;
                    out.push(if d.is_ascii() { d } else { '?' });
                }
                if !mapped {
                    out.push('?');
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;

    const REPORT: &str = "Solitary Lives\n\n    First paragraph.\n\n    Second & last.";

    #[test]
    fn output_format_parse() {
        assert_eq!(OutputFormat::parse("TXT").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("docx").unwrap(), OutputFormat::Docx);
        assert_eq!(OutputFormat::parse("pdf").unwrap(), OutputFormat::Pdf);
        assert!(matches!(
            OutputFormat::parse("odt"),
            Err(RenderError::UnknownFormat(_))
        ));
    }

    #[test]
    fn text_renderer_is_identity() {
        assert_eq!(TextRenderer.render(REPORT).unwrap(), REPORT.as_bytes());
    }

    #[test]
    fn docx_has_title_and_indented_body() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let bytes = DocxRenderer::new("    ")
            .with_created(created)
            .render(REPORT)
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut document = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut document)
            .unwrap();
        assert!(document.contains("<w:jc w:val=\"center\"/>"));
        assert!(document.contains("<w:b/>"));
        assert!(document.contains(">Solitary Lives</w:t>"));
        assert!(document.contains("w:firstLine=\"720\""));
        assert!(document.contains(">First paragraph.</w:t>"));
        assert!(document.contains("Second &amp; last."));
        assert!(!document.contains(">    First"));

        let mut core = String::new();
        archive
            .by_name("docProps/core.xml")
            .unwrap()
            .read_to_string(&mut core)
            .unwrap();
        assert!(core.contains("2024-05-01T12:00:00Z"));
        assert!(archive.by_name("[Content_Types].xml").is_ok());
    }

    #[test]
    fn pdf_loads_and_paginates() {
        let short = PdfRenderer::new("    ").render(REPORT).unwrap();
        assert!(short.starts_with(b"%PDF-1.5"));
        let doc = lopdf::Document::load_mem(&short).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let long_paragraph = "word ".repeat(600);
        let long_report = format!(
            "Long\n\n{}",
            (0..5)
                .map(|_| format!("    {}", long_paragraph.trim()))
                .collect::<Vec<_>>()
                .join("\n\n")
        );
        let bytes = PdfRenderer::new("    ").render(&long_report).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn pdf_layout_strips_marker_and_wraps() {
        let r = PdfRenderer::new("    ");
        let lines = r.layout(REPORT);
        assert_eq!(lines[0], PdfLine::Title("Solitary Lives".into()));
        assert_eq!(lines[1], PdfLine::Blank);
        assert_eq!(lines[2], PdfLine::Body("    First paragraph.".into()));
        assert_eq!(lines.last(), Some(&PdfLine::Body("    Second & last.".into())));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("    one two three four five six", 12);
        assert_eq!(lines, vec!["    one two", "three four", "five six"]);
        for line in &lines {
            assert!(line.chars().count() <= 12);
        }
        assert_eq!(wrap("supercalifragilistic", 5), vec!["supercalifragilistic"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn transliterate_maps_to_ascii() {
        assert_eq!(
            transliterate("\u{201C}Caf\u{00E9}\u{201D} \u{2014} na\u{00EF}ve\u{2026}"),
            "\"Cafe\" - naive..."
        );
        assert_eq!(transliterate("Stra\u{00DF}e"), "Strasse");
        assert_eq!(transliterate("\u{65E5}\u{672C}"), "??");
        assert!(transliterate("\u{00C5}ngstr\u{00F6}m \u{0153}uvre").is_ascii());
    }
}
