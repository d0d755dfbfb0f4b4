//! Offline inspection commands: `extract`, `chunks` and `render`.
//!
//! None of these reach the generation backend, so they run with built-in
//! defaults when no config file is present. Useful for checking that a book
//! reads cleanly before spending model calls on it.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::extract::extract_raw_text;
use crate::models::{Document, SourceFormat};
use crate::normalize::normalize;
use crate::progress::format_number;
use crate::render::{renderer_for, write_report, OutputFormat};
use crate::report::{body_paragraphs, split_title};

async fn read_document(
    config: &Config,
    path: &Path,
    format: Option<&str>,
) -> Result<(SourceFormat, Document)> {
    let format = match format {
        Some(f) => f.parse::<SourceFormat>()?,
        None => SourceFormat::from_path(path)?,
    };
    let timeout = Duration::from_secs(config.extraction.unit_timeout_secs);
    let raw = extract_raw_text(path, format, timeout)
        .await
        .with_context(|| format!("failed to extract {}", path.display()))?;
    Ok((format, normalize(&raw)))
}

/// Print extraction stats for one book, or its normalized text with `text`.
pub async fn run_extract(
    config: &Config,
    path: &Path,
    format: Option<&str>,
    text: bool,
) -> Result<()> {
    let (format, document) = read_document(config, path, format).await?;
    if text {
        println!("{}", document.text);
        return Ok(());
    }

    let chunks = chunk_document(&document, config.chunking.max_chars);
    println!("--- Extract ---");
    println!("path:         {}", path.display());
    println!("format:       {}", format);
    println!("id:           {}", document.id);
    println!("chars:        {}", format_number(document.char_len() as u64));
    let words = document.text.split(' ').filter(|w| !w.is_empty()).count();
    println!("words:        {}", format_number(words as u64));
    println!(
        "chunks:       {} (max {} chars)",
        chunks.len(),
        config.chunking.max_chars
    );
    if document.is_empty() {
        println!("warning:      no text extracted");
    }
    Ok(())
}

/// List the sentence-aligned chunks of one book.
pub async fn run_chunks(
    config: &Config,
    path: &Path,
    format: Option<&str>,
    max_chars: Option<usize>,
) -> Result<()> {
    let max_chars = max_chars.unwrap_or(config.chunking.max_chars);
    if max_chars == 0 {
        anyhow::bail!("--max-chars must be > 0");
    }
    let (_, document) = read_document(config, path, format).await?;
    let chunks = chunk_document(&document, max_chars);

    println!("chunks {} (max {} chars)", path.display(), max_chars);
    for chunk in &chunks {
        let preview: String = chunk.text.chars().take(60).collect();
        let ellipsis = if chunk.text.chars().count() > 60 { "..." } else { "" };
        println!(
            "  [{}] {:>6} chars  {}  {}{}",
            chunk.chunk_index,
            chunk.text.chars().count(),
            &chunk.hash[..12],
            preview,
            ellipsis
        );
    }
    println!("  total: {}", chunks.len());
    Ok(())
}

/// Re-render an already assembled text report in another output format.
pub fn run_render(config: &Config, input: &Path, format: &str, output: &Path) -> Result<()> {
    let format = OutputFormat::parse(format)?;
    let report = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read report: {}", input.display()))?;

    let (title, body) = split_title(&report);
    let paragraphs = body_paragraphs(body, &config.report.indent).len();

    let renderer = renderer_for(format, &config.report.indent);
    let bytes = write_report(&report, renderer.as_ref(), output)
        .with_context(|| format!("failed to write report to {}", output.display()))?;

    println!("render {}", output.display());
    println!("  title: {}", title);
    println!("  paragraphs: {}", paragraphs);
    println!("  format: {}", format.as_str());
    println!("  bytes written: {}", bytes);
    println!("ok");
    Ok(())
}
