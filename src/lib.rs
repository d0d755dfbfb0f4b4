//! # litreport
//!
//! Thematic literary report generation from three source books.
//!
//! Books (XML exports, PDFs, EPUBs) are read into plain text, normalized,
//! and summarized through a content-addressed cache. The summaries feed a
//! comparative analysis, a thesis and a title, and five role-constrained
//! paragraphs that are assembled into a fixed report layout and rendered as
//! text, Word or PDF.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌───────────┐
//! │   Readers   │──▶│ Normalizer │──▶│ Summarizer│◀──▶ SummaryCache
//! │ XML/PDF/EPUB│   │  + chunker │   │   (×3)    │
//! └─────────────┘   └────────────┘   └─────┬─────┘
//!                                          ▼
//!             Analysis ──▶ Thesis ──▶ Title ──▶ Paragraphs (×5)
//!                                                    │
//!                                 Renderer ◀── Assembler
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! litreport extract books/first.epub          # check a book reads cleanly
//! litreport chunks books/second.pdf           # inspect sentence-aligned chunks
//! litreport run --config ./config/litreport.toml
//! litreport render Final_Book_Report.txt --format docx --output report.docx
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types and paragraph roles |
//! | [`extract`] | Format readers with per-unit timeouts |
//! | [`normalize`] | Whitespace normalization and content digests |
//! | [`chunk`] | Sentence-aware chunking |
//! | [`backend`] | Generation backend abstraction |
//! | [`cache`] | Single-flight summary cache |
//! | [`prompts`] | Prompt templates |
//! | [`summarize`] | Per-book summaries |
//! | [`analyze`] | Comparative analysis |
//! | [`thesis`] | Thesis and title generation |
//! | [`paragraph`] | The five report paragraphs |
//! | [`report`] | Report assembly |
//! | [`render`] | Text, docx and pdf output |
//! | [`pipeline`] | Stage orchestration |
//! | [`inspect`] | Offline extract/chunks/render commands |
//! | [`progress`] | Run progress reporting |

pub mod analyze;
pub mod backend;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod extract;
pub mod inspect;
pub mod models;
pub mod normalize;
pub mod paragraph;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod report;
pub mod summarize;
pub mod thesis;
