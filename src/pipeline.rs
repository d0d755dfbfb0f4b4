//! Report pipeline orchestration.
//!
//! ```text
//! books ──extract──▶ normalize ──▶ summarize (cached) ─┐   (×3, independent)
//!                                                      ▼
//!          comparative analysis ──▶ thesis ──▶ title ──▶ 5 paragraphs ──▶ assemble ──▶ render
//! ```
//!
//! Each stage needs every output of the stage before it. The only fan-out is
//! across the three books and across the five paragraphs; results are joined
//! by index, never by completion order. Any error aborts the run and nothing
//! is written: the output file only appears once the full report exists.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::analyze::ComparativeAnalyzer;
use crate::backend::{create_backend, BackendError, GenerationBackend, Stage};
use crate::cache::SummaryCache;
use crate::config::{BookConfig, Config, BOOK_COUNT};
use crate::extract::extract_raw_text;
use crate::models::{Document, Report};
use crate::normalize::{collapse_whitespace, normalize};
use crate::paragraph::ParagraphGenerator;
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::render::{renderer_for, write_report, OutputFormat};
use crate::report;
use crate::summarize::Summarizer;
use crate::thesis::{ThesisGenerator, TitleGenerator};

/// Everything a run produced, in the order it was produced.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub summaries: [String; BOOK_COUNT],
    pub analysis: String,
    pub thesis: String,
    pub report: Report,
    /// The assembled report text handed to the renderer.
    pub text: String,
}

pub struct ReportPipeline {
    summarizer: Summarizer,
    analyzer: ComparativeAnalyzer,
    theses: ThesisGenerator,
    titles: TitleGenerator,
    paragraphs: ParagraphGenerator,
    dynamic_title: bool,
    static_title: String,
    indent: String,
    concurrent: bool,
    progress: Box<dyn ProgressReporter>,
}

impl ReportPipeline {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<SummaryCache>,
        config: &Config,
    ) -> Self {
        Self {
            summarizer: Summarizer::new(Arc::clone(&backend), cache, config),
            analyzer: ComparativeAnalyzer::new(Arc::clone(&backend), config),
            theses: ThesisGenerator::new(Arc::clone(&backend), config),
            titles: TitleGenerator::new(Arc::clone(&backend), config),
            paragraphs: ParagraphGenerator::new(backend, config),
            dynamic_title: config.report.dynamic_title,
            static_title: collapse_whitespace(&config.report.title),
            indent: config.report.indent.clone(),
            concurrent: config.report.concurrent,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }

    pub fn cache(&self) -> &Arc<SummaryCache> {
        self.summarizer.cache()
    }

    /// Run every generation stage over three normalized documents and
    /// assemble the report text.
    pub async fn compose(&self, documents: &[Document; BOOK_COUNT]) -> Result<ReportArtifacts> {
        let summaries = self
            .summarize_all(documents)
            .await
            .context("summarization failed")?;

        self.progress.report(ProgressEvent::Stage {
            stage: Stage::Comparison,
        });
        let analysis = self
            .analyzer
            .analyze(&summaries)
            .await
            .context("comparative analysis failed")?;

        self.progress.report(ProgressEvent::Stage {
            stage: Stage::Thesis,
        });
        let thesis = self
            .theses
            .generate_thesis(&summaries, &analysis)
            .await
            .context("thesis generation failed")?;

        let title = if self.dynamic_title {
            self.progress.report(ProgressEvent::Stage {
                stage: Stage::Title,
            });
            self.titles
                .generate_title(&thesis)
                .await
                .context("title generation failed")?
        } else {
            self.static_title.clone()
        };

        let paragraphs = self
            .paragraphs
            .generate_all(&thesis, &summaries, &analysis, self.progress())
            .await
            .context("paragraph generation failed")?;

        let text = report::assemble(&title, &paragraphs, &self.indent);
        tracing::info!(title = %title, chars = text.len(), "report assembled");

        Ok(ReportArtifacts {
            summaries,
            analysis,
            thesis,
            report: Report { title, paragraphs },
            text,
        })
    }

    async fn summarize_all(
        &self,
        documents: &[Document; BOOK_COUNT],
    ) -> Result<[String; BOOK_COUNT], BackendError> {
        let [first, second, third] = documents;
        if self.concurrent {
            let (a, b, c) = tokio::try_join!(
                self.summarize_one(1, first),
                self.summarize_one(2, second),
                self.summarize_one(3, third),
            )?;
            return Ok([a, b, c]);
        }
        Ok([
            self.summarize_one(1, first).await?,
            self.summarize_one(2, second).await?,
            self.summarize_one(3, third).await?,
        ])
    }

    async fn summarize_one(&self, number: usize, document: &Document) -> Result<String, BackendError> {
        self.progress.report(ProgressEvent::Summarizing {
            book: format!("book {}", number),
        });
        self.summarizer.summarize(document).await
    }
}

/// Extract and normalize one book.
pub async fn ingest_book(
    book: &BookConfig,
    unit_timeout: Duration,
    progress: &dyn ProgressReporter,
) -> Result<Document> {
    let label = book.display_label();
    let format = book
        .source_format()
        .with_context(|| format!("book {}", book.path.display()))?;

    progress.report(ProgressEvent::Extracting {
        book: label.clone(),
    });
    let raw = extract_raw_text(&book.path, format, unit_timeout)
        .await
        .with_context(|| format!("failed to extract {}", book.path.display()))?;

    let document = normalize(&raw);
    if document.is_empty() {
        anyhow::bail!("no text could be extracted from {}", book.path.display());
    }
    tracing::info!(
        book = %label,
        format = %format,
        chars = document.char_len(),
        id = %document.id,
        "book ingested"
    );
    progress.report(ProgressEvent::Extracted {
        book: label,
        chars: document.char_len() as u64,
    });
    Ok(document)
}

/// Ingest the three configured books. The books are independent and are
/// read concurrently when `report.concurrent` is set.
pub async fn ingest_books(
    config: &Config,
    progress: &dyn ProgressReporter,
) -> Result<[Document; BOOK_COUNT]> {
    let books: &[BookConfig; BOOK_COUNT] = config.books.as_slice().try_into().map_err(|_| {
        anyhow::anyhow!(
            "exactly {} [[books]] entries are required, found {}",
            BOOK_COUNT,
            config.books.len()
        )
    })?;
    let timeout = Duration::from_secs(config.extraction.unit_timeout_secs);
    let [first, second, third] = books;

    if config.report.concurrent {
        let (a, b, c) = tokio::try_join!(
            ingest_book(first, timeout, progress),
            ingest_book(second, timeout, progress),
            ingest_book(third, timeout, progress),
        )?;
        return Ok([a, b, c]);
    }
    Ok([
        ingest_book(first, timeout, progress).await?,
        ingest_book(second, timeout, progress).await?,
        ingest_book(third, timeout, progress).await?,
    ])
}

/// Run the whole pipeline for `config` and write the rendered report.
///
/// Prints a short summary to stdout and returns the output path.
pub async fn run_report(config: &Config, progress: Box<dyn ProgressReporter>) -> Result<PathBuf> {
    config.validate_books()?;
    let format = OutputFormat::parse(&config.output.format)?;
    let backend = create_backend(&config.backend)?;
    let model = backend.model_name().to_string();

    let pipeline = ReportPipeline::new(backend, Arc::new(SummaryCache::new()), config)
        .with_progress(progress);

    let documents = ingest_books(config, pipeline.progress()).await?;
    let artifacts = pipeline.compose(&documents).await?;

    let renderer = renderer_for(format, &config.report.indent);
    let path = config.output.path.clone();
    let bytes = write_report(&artifacts.text, renderer.as_ref(), &path)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    pipeline.progress().report(ProgressEvent::Written {
        path: path.display().to_string(),
        bytes,
    });

    println!("report {}", path.display());
    println!("  backend: {}", model);
    println!("  books: {}", documents.len());
    println!("  summaries cached: {}", pipeline.cache().len().await);
    println!("  title: {}", artifacts.report.title);
    println!("  format: {}", format.as_str());
    println!("  bytes written: {}", bytes);
    println!("ok");

    Ok(path)
}
