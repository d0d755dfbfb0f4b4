//! Thesis and title generation.

use std::sync::Arc;

use crate::backend::{BackendError, GenerationBackend, GenerationRequest, Stage};
use crate::config::Config;
use crate::normalize::collapse_whitespace;
use crate::prompts;

pub struct ThesisGenerator {
    backend: Arc<dyn GenerationBackend>,
    theme: String,
    temperature: f32,
    max_tokens: u32,
}

impl ThesisGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &Config) -> Self {
        Self {
            backend,
            theme: config.report.theme.clone(),
            temperature: config.backend.temperature,
            max_tokens: config.budgets.thesis,
        }
    }

    /// One call synthesizing the theme across all works, each named in quotes.
    pub async fn generate_thesis(
        &self,
        summaries: &[String],
        analysis: &str,
    ) -> Result<String, BackendError> {
        self.backend.generate(&self.request(summaries, analysis)).await
    }

    pub fn request(&self, summaries: &[String], analysis: &str) -> GenerationRequest {
        let joined = prompts::join_blocks(summaries);
        GenerationRequest {
            stage: Stage::Thesis,
            system: prompts::THESIS_SYSTEM.to_string(),
            prompt: prompts::fill(
                prompts::THESIS_PROMPT,
                &[
                    ("theme", &self.theme),
                    ("summaries", &joined),
                    ("analysis", analysis),
                ],
            ),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

pub struct TitleGenerator {
    backend: Arc<dyn GenerationBackend>,
    temperature: f32,
    max_tokens: u32,
}

impl TitleGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &Config) -> Self {
        Self {
            backend,
            temperature: config.backend.temperature,
            max_tokens: config.budgets.title,
        }
    }

    /// A short title derived from the thesis alone, cleaned to a single line.
    pub async fn generate_title(&self, thesis: &str) -> Result<String, BackendError> {
        let raw = self.backend.generate(&self.request(thesis)).await?;
        let title = clean_title(&raw);
        if title.is_empty() {
            return Err(BackendError::Malformed(format!(
                "title response has no text: {:?}",
                raw
            )));
        }
        Ok(title)
    }

    pub fn request(&self, thesis: &str) -> GenerationRequest {
        GenerationRequest {
            stage: Stage::Title,
            system: prompts::TITLE_SYSTEM.to_string(),
            prompt: prompts::fill(prompts::TITLE_PROMPT, &[("thesis", thesis)]),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Collapse a generated title to one line and drop a `Title:` label or
/// quotation marks wrapping the whole title. A pair is only stripped when
/// the marks appear nowhere else, so `"Alone" and "Together"` keeps both
/// quoted works intact.
pub fn clean_title(raw: &str) -> String {
    let mut title = collapse_whitespace(raw);
    if let Some(rest) = title
        .strip_prefix("Title:")
        .or_else(|| title.strip_prefix("title:"))
    {
        title = rest.trim().to_string();
    }
    let pairs = [('"', '"'), ('\u{201C}', '\u{201D}'), ('\'', '\''), ('*', '*')];
    loop {
        let mut chars = title.chars();
        let (first, last) = match (chars.next(), chars.next_back()) {
            (Some(f), Some(l)) => (f, l),
            _ => break,
        };
        if !pairs.contains(&(first, last)) {
            break;
        }
        // Markdown emphasis wraps with a run of marks ("**Bold**").
        let lead = title.chars().take_while(|c| *c == first).count();
        let trail = title.chars().rev().take_while(|c| *c == last).count();
        let run = lead.min(trail).min(title.chars().count() / 2);
        if run == 0 {
            break;
        }
        let inner = &title[run * first.len_utf8()..title.len() - run * last.len_utf8()];
        if inner.contains(first) || inner.contains(last) {
            break;
        }
        title = inner.trim().to_string();
    }
    title
}
