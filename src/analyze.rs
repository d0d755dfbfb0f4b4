//! Comparative analysis over the ordered book summaries.

use std::sync::Arc;

use crate::backend::{BackendError, GenerationBackend, GenerationRequest, Stage};
use crate::config::Config;
use crate::prompts;

/// One backend call comparing every summary along the report theme.
///
/// Not cached: summary order is part of the prompt, and each run asks once.
pub struct ComparativeAnalyzer {
    backend: Arc<dyn GenerationBackend>,
    theme: String,
    temperature: f32,
    max_tokens: u32,
}

impl ComparativeAnalyzer {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &Config) -> Self {
        Self {
            backend,
            theme: config.report.theme.clone(),
            temperature: config.backend.temperature,
            max_tokens: config.budgets.comparison,
        }
    }

    pub async fn analyze(&self, summaries: &[String]) -> Result<String, BackendError> {
        self.backend.generate(&self.request(summaries)).await
    }

    pub fn request(&self, summaries: &[String]) -> GenerationRequest {
        let joined = prompts::join_blocks(summaries);
        GenerationRequest {
            stage: Stage::Comparison,
            system: prompts::fill(prompts::COMPARISON_SYSTEM, &[("theme", &self.theme)]),
            prompt: prompts::fill(
                prompts::COMPARISON_PROMPT,
                &[("theme", &self.theme), ("summaries", &joined)],
            ),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EchoBackend;

    fn analyzer() -> ComparativeAnalyzer {
        ComparativeAnalyzer::new(Arc::new(EchoBackend), &Config::default())
    }

    #[test]
    fn summaries_are_blank_line_separated_in_order() {
        let summaries = vec!["First.".to_string(), "Second.".to_string(), "Third.".to_string()];
        let req = analyzer().request(&summaries);
        assert!(req.prompt.contains("First.\n\nSecond.\n\nThird."));
        assert!(req.prompt.contains("Preserve any direct quotations"));
        assert_eq!(req.max_tokens, 300);
    }

    #[test]
    fn order_changes_the_prompt() {
        let a = vec!["One.".to_string(), "Two.".to_string()];
        let b = vec!["Two.".to_string(), "One.".to_string()];
        assert_ne!(analyzer().request(&a).prompt, analyzer().request(&b).prompt);
    }

    #[tokio::test]
    async fn analyze_calls_backend_once() {
        let out = analyzer().analyze(&["x".to_string()]).await.unwrap();
        assert_eq!(out, EchoBackend::placeholder(Stage::Comparison));
    }
}
