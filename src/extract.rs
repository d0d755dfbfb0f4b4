//! Multi-format text extraction for source books (XML export, PDF, EPUB).
//!
//! Readers take a path and a [`SourceFormat`] and return raw UTF-8 text for
//! the normalizer. Whole-file failures (unreadable file, corrupt container)
//! return an [`ExtractError`]. Failures of a single unit (a PDF page, an EPUB
//! spine item) are logged and skipped: each unit runs on its own thread under
//! a timeout, so one wedged page cannot stall the whole book.

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scraper::Html;
use thiserror::Error;

use crate::models::SourceFormat;

/// Qualified name of the element carrying item bodies in markup exports.
const CONTENT_ENCODED: &[u8] = b"content:encoded";

/// Extraction error. Fatal for the book being read.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: '{0}' (expected xml, pdf, or epub)")]
    UnsupportedFormat(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("XML extraction failed: {0}")]
    Xml(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("EPUB extraction failed: {0}")]
    Epub(String),
}

/// Why a single page or item was skipped.
#[derive(Debug, Error)]
pub enum UnitFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

/// Read `path` and extract its raw text according to `format`.
pub async fn extract_raw_text(
    path: &Path,
    format: SourceFormat,
    unit_timeout: Duration,
) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ExtractError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let origin = path.display().to_string();

    match format {
        SourceFormat::Xml => extract_xml(&bytes),
        SourceFormat::Pdf => extract_pdf(bytes, unit_timeout, &origin).await,
        SourceFormat::Epub => extract_epub(bytes, unit_timeout, &origin).await,
    }
}

/// Run `work` on a detached thread and wait at most `limit` for it.
///
/// A timed-out thread is abandoned rather than joined, so process exit is
/// never blocked by a stuck unit.
pub async fn run_unit<T, F>(limit: Duration, work: F) -> Result<T, UnitFailure>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        let _ = tx.send(work());
    });
    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(result)) => result.map_err(UnitFailure::Failed),
        Ok(Err(_)) => Err(UnitFailure::Failed("extraction thread panicked".to_string())),
        Err(_) => Err(UnitFailure::Timeout(limit)),
    }
}

// ============ XML ============

/// Texts of all `content:encoded` elements; if there are none, every text
/// node in document order. Embedded HTML is reduced to its text.
fn extract_xml(bytes: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut encoded = Vec::new();
    let mut all_text = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth_in_encoded = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth_in_encoded > 0 || e.name().as_ref() == CONTENT_ENCODED {
                    depth_in_encoded += 1;
                }
            }
            Ok(Event::End(_)) => {
                depth_in_encoded = depth_in_encoded.saturating_sub(1);
            }
            Ok(Event::Text(te)) => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Xml(e.to_string()))?
                    .into_owned();
                push_text(&mut encoded, &mut all_text, text, depth_in_encoded > 0);
            }
            Ok(Event::CData(cd)) => {
                let text = String::from_utf8_lossy(&cd).into_owned();
                push_text(&mut encoded, &mut all_text, text, depth_in_encoded > 0);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let texts = if encoded.is_empty() { all_text } else { encoded };
    Ok(texts.join("\n"))
}

fn push_text(encoded: &mut Vec<String>, all: &mut Vec<String>, text: String, in_encoded: bool) {
    if text.trim().is_empty() {
        return;
    }
    if in_encoded {
        encoded.push(html_to_text(&text));
    }
    all.push(text);
}

/// Visible text of an HTML document or fragment, one line per text node.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    for piece in doc.root_element().text() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(piece);
    }
    out
}

// ============ PDF ============

async fn extract_pdf(
    bytes: Vec<u8>,
    unit_timeout: Duration,
    origin: &str,
) -> Result<String, ExtractError> {
    let bytes = Arc::new(bytes);
    let doc = {
        let bytes = Arc::clone(&bytes);
        run_unit(unit_timeout, move || {
            lopdf::Document::load_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ExtractError::Pdf(e.to_string()))?
    };
    let doc = Arc::new(doc);
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let total = page_numbers.len();

    let mut out = String::new();
    for page in page_numbers {
        let doc = Arc::clone(&doc);
        let result = run_unit(unit_timeout, move || {
            doc.extract_text(&[page]).map_err(|e| e.to_string())
        })
        .await;
        match result {
            Ok(text) => {
                if !text.trim().is_empty() {
                    out.push_str(&text);
                    out.push('\n');
                }
            }
            Err(e) => {
                tracing::warn!(source = origin, page, total, "skipping PDF page: {}", e);
            }
        }
    }

    if out.trim().is_empty() {
        tracing::debug!(source = origin, "no text from page extraction, trying whole-document pass");
        let text = run_unit(unit_timeout, move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
        return Ok(text);
    }

    Ok(out)
}

// ============ EPUB ============

type EpubBook = epub::doc::EpubDoc<Cursor<Vec<u8>>>;

async fn extract_epub(
    bytes: Vec<u8>,
    unit_timeout: Duration,
    origin: &str,
) -> Result<String, ExtractError> {
    let doc = run_unit(unit_timeout, move || {
        EpubBook::from_reader(Cursor::new(bytes)).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| ExtractError::Epub(e.to_string()))?;

    let total = doc.get_num_chapters();
    let doc = Arc::new(Mutex::new(doc));
    let mut out = String::new();

    for index in 0..total {
        let doc = Arc::clone(&doc);
        let result = run_unit(unit_timeout, move || read_epub_item(&doc, index)).await;
        match result {
            Ok(text) => {
                if !text.is_empty() {
                    out.push_str(&text);
                    out.push('\n');
                }
            }
            Err(e) => {
                tracing::warn!(source = origin, item = index + 1, total, "skipping EPUB item: {}", e);
            }
        }
    }

    Ok(out)
}

/// Read one spine item and strip its markup. Runs inside a unit, so the zip
/// read and decompression share the unit's time limit.
fn read_epub_item(doc: &Mutex<EpubBook>, index: usize) -> Result<String, String> {
    let content = {
        let mut doc = doc.lock().map_err(|_| "reader lock poisoned".to_string())?;
        if !doc.set_current_chapter(index) {
            return Err("not found".to_string());
        }
        let (content, _mime) = doc.get_current_str().ok_or("unreadable")?;
        content
    };
    Ok(html_to_text(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_prefers_content_encoded() {
        let xml = br#"<?xml version="1.0"?>
<rss xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Export</title>
    <item>
      <title>Chapter One</title>
      <content:encoded><![CDATA[<p>I was <em>supposed</em> to be having the time of my life.</p>]]></content:encoded>
    </item>
    <item>
      <content:encoded><![CDATA[<p>The bell jar hung.</p>]]></content:encoded>
    </item>
  </channel>
</rss>"#;
        let text = extract_xml(xml).unwrap();
        assert!(text.contains("supposed"));
        assert!(text.contains("The bell jar hung."));
        assert!(!text.contains("Chapter One"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn xml_falls_back_to_all_text() {
        let xml = b"<book><title>Solitude</title><p>A man lives alone.</p></book>";
        let text = extract_xml(xml).unwrap();
        assert_eq!(text, "Solitude\nA man lives alone.");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = extract_xml(b"<book><p>open</q></book>").unwrap_err();
        assert!(matches!(err, ExtractError::Xml(_)));
    }

    #[test]
    fn html_to_text_strips_markup() {
        let text = html_to_text("<html><body><h1>Title</h1><p>One <b>two</b></p></body></html>");
        assert!(text.contains("Title"));
        assert!(text.contains("One"));
        assert!(text.contains("two"));
        assert!(!text.contains('<'));
    }

    #[tokio::test]
    async fn unit_timeout_is_reported() {
        let result = run_unit(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok::<_, String>(())
        })
        .await;
        assert!(matches!(result, Err(UnitFailure::Timeout(_))));
    }

    #[tokio::test]
    async fn unit_error_is_reported() {
        let result: Result<(), _> =
            run_unit(Duration::from_secs(1), || Err("bad page".to_string())).await;
        match result {
            Err(UnitFailure::Failed(msg)) => assert_eq!(msg, "bad page"),
            other => panic!("unexpected {:?}", other),
        }
    }

    /// Build a minimal EPUB: stored `mimetype` first, a container pointing at
    /// `OEBPS/content.opf`, and one manifest + spine entry per chapter. A
    /// chapter with no body is listed in the manifest but never written.
    fn epub_fixture(chapters: &[(&str, Option<&str>)]) -> Vec<u8> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut manifest = String::new();
        let mut spine = String::new();
        for (id, _) in chapters {
            manifest.push_str(&format!(
                r#"<item id="{id}" href="{id}.xhtml" media-type="application/xhtml+xml"/>"#
            ));
            spine.push_str(&format!(r#"<itemref idref="{id}"/>"#));
        }
        let opf = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Metamorphosis</dc:title>
    <dc:identifier id="uid">urn:test:metamorphosis</dc:identifier>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
        );

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let stored =
            || SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("mimetype", stored()).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file("META-INF/container.xml", stored()).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();
        zip.start_file("OEBPS/content.opf", stored()).unwrap();
        zip.write_all(opf.as_bytes()).unwrap();
        for (id, body) in chapters {
            if let Some(body) = body {
                zip.start_file(format!("OEBPS/{id}.xhtml"), stored()).unwrap();
                zip.write_all(
                    format!(
                        r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>{body}</body></html>"#
                    )
                    .as_bytes(),
                )
                .unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn rendered_pdf_reads_back() {
        use crate::render::{PdfRenderer, Renderer};

        let report = "Solitary Lives\n\n    Gregor woke alone one morning.\n\n    Nobody came to the door.";
        let bytes = PdfRenderer::new("    ").render(report).unwrap();
        let text = extract_pdf(bytes, Duration::from_secs(10), "test").await.unwrap();
        assert!(text.contains("Solitary Lives"), "{:?}", text);
        assert!(text.contains("Gregor woke alone one morning."), "{:?}", text);
        assert!(text.contains("Nobody came to the door."), "{:?}", text);
    }

    #[tokio::test]
    async fn epub_items_are_read_in_spine_order() {
        let bytes = epub_fixture(&[
            ("ch1", Some("<h1>One</h1><p>Gregor Samsa woke.</p>")),
            ("ch2", Some("<p>He was <em>alone</em>.</p>")),
        ]);
        let text = extract_epub(bytes, Duration::from_secs(5), "test").await.unwrap();
        let first = text.find("Gregor Samsa woke.").unwrap();
        let second = text.find("alone").unwrap();
        assert!(first < second);
        assert!(text.contains("One"));
        assert!(!text.contains("<p>"));
    }

    #[tokio::test]
    async fn missing_epub_item_is_skipped() {
        let bytes = epub_fixture(&[
            ("ch1", None),
            ("ch2", Some("<p>The rest of the book survives.</p>")),
        ]);
        let text = extract_epub(bytes, Duration::from_secs(5), "test").await.unwrap();
        assert_eq!(text.trim(), "The rest of the book survives.");
    }

    #[tokio::test]
    async fn epub_file_is_read_through_extract_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, epub_fixture(&[("ch1", Some("<p>Alone at last.</p>"))])).unwrap();
        let text = extract_raw_text(&path, SourceFormat::Epub, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text.trim(), "Alone at last.");
    }

    #[tokio::test]
    async fn invalid_pdf_returns_error() {
        let err = extract_pdf(b"not a pdf".to_vec(), Duration::from_secs(5), "test")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[tokio::test]
    async fn invalid_epub_returns_error() {
        let err = extract_epub(b"not a zip".to_vec(), Duration::from_secs(5), "test")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Epub(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = extract_raw_text(
            Path::new("/nonexistent/book.xml"),
            SourceFormat::Xml,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
