//! Per-book summarization through the content-addressed cache.
//!
//! A summary is looked up by the digest of the exact normalized text; only a
//! miss reaches the backend. Under the `map_reduce` chunk policy a document
//! longer than the chunk budget is summarized passage by passage (each
//! passage cached under its own digest) and the partial summaries are then
//! combined by one more call, cached under the document digest.

use std::sync::Arc;

use crate::backend::{BackendError, GenerationBackend, GenerationRequest, Stage};
use crate::cache::SummaryCache;
use crate::chunk::chunk_document;
use crate::config::{ChunkPolicy, Config};
use crate::models::Document;
use crate::prompts;

pub struct Summarizer {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<SummaryCache>,
    theme: String,
    citations: bool,
    temperature: f32,
    max_tokens: u32,
    policy: ChunkPolicy,
    max_chars: usize,
}

impl Summarizer {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<SummaryCache>,
        config: &Config,
    ) -> Self {
        Self {
            backend,
            cache,
            theme: config.report.theme.clone(),
            citations: config.report.summary_citations,
            temperature: config.backend.temperature,
            max_tokens: config.budgets.summary,
            policy: config.chunking.policy,
            max_chars: config.chunking.max_chars,
        }
    }

    pub fn cache(&self) -> &Arc<SummaryCache> {
        &self.cache
    }

    /// Summarize one document, reusing any summary already cached for its text.
    pub async fn summarize(&self, document: &Document) -> Result<String, BackendError> {
        if self.policy == ChunkPolicy::Whole || document.char_len() <= self.max_chars {
            return self.summarize_text(&document.id, &document.text).await;
        }

        let chunks = chunk_document(document, self.max_chars);
        if chunks.len() <= 1 {
            return self.summarize_text(&document.id, &document.text).await;
        }

        self.cache
            .get_or_try_insert_with(&document.id, || async move {
                let mut partials = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    partials.push(self.summarize_text(&chunk.hash, &chunk.text).await?);
                }
                tracing::debug!(
                    document = %document.id,
                    passages = partials.len(),
                    "combining passage summaries"
                );
                self.backend.generate(&self.reduce_request(&partials)).await
            })
            .await
    }

    async fn summarize_text(&self, key: &str, text: &str) -> Result<String, BackendError> {
        self.cache
            .get_or_try_insert_with(key, || async move {
                self.backend.generate(&self.summary_request(text)).await
            })
            .await
    }

    /// The request sent for a cache miss on `text`.
    pub fn summary_request(&self, text: &str) -> GenerationRequest {
        let mut prompt = prompts::fill(
            prompts::SUMMARY_PROMPT,
            &[("theme", &self.theme), ("text", text)],
        );
        if self.citations {
            prompt.push_str(prompts::SUMMARY_CITATION_RULE);
        }
        GenerationRequest {
            stage: Stage::Summary,
            system: prompts::fill(prompts::SUMMARY_SYSTEM, &[("theme", &self.theme)]),
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn reduce_request(&self, partials: &[String]) -> GenerationRequest {
        let joined = prompts::join_blocks(partials);
        let mut prompt = prompts::fill(
            prompts::REDUCE_PROMPT,
            &[("theme", &self.theme), ("summaries", &joined)],
        );
        if self.citations {
            prompt.push_str(prompts::SUMMARY_CITATION_RULE);
        }
        GenerationRequest {
            stage: Stage::SummaryReduce,
            system: prompts::fill(prompts::SUMMARY_SYSTEM, &[("theme", &self.theme)]),
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
