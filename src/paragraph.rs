//! Paragraph generation for the five report roles.
//!
//! Each role sees only its own brief (see [`ParagraphBrief`]), so the five
//! calls are independent of one another. With `report.concurrent` enabled
//! they are awaited together; the resulting array is always in role order
//! regardless of which call finishes first.

use std::sync::Arc;

use crate::backend::{BackendError, GenerationBackend, GenerationRequest, Stage};
use crate::config::Config;
use crate::models::{ParagraphBrief, ParagraphRole, ReportParagraph};
use crate::normalize::collapse_whitespace;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::prompts;

pub struct ParagraphGenerator {
    backend: Arc<dyn GenerationBackend>,
    theme: String,
    temperature: f32,
    max_tokens: u32,
    concurrent: bool,
}

impl ParagraphGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &Config) -> Self {
        Self {
            backend,
            theme: config.report.theme.clone(),
            temperature: config.backend.temperature,
            max_tokens: config.budgets.paragraph,
            concurrent: config.report.concurrent,
        }
    }

    pub fn request(&self, brief: &ParagraphBrief<'_>) -> GenerationRequest {
        let body = match *brief {
            ParagraphBrief::Introduction { thesis } => prompts::fill(
                prompts::INTRODUCTION_PROMPT,
                &[("theme", &self.theme), ("thesis", thesis)],
            ),
            ParagraphBrief::BodyBook1 { thesis, summary } => body_prompt("first", thesis, summary),
            ParagraphBrief::BodyBook2 { thesis, summary } => body_prompt("second", thesis, summary),
            ParagraphBrief::BodyBook3 { thesis, summary } => body_prompt("third", thesis, summary),
            ParagraphBrief::Conclusion { thesis, analysis } => prompts::fill(
                prompts::CONCLUSION_PROMPT,
                &[("thesis", thesis), ("analysis", analysis)],
            ),
        };
        GenerationRequest {
            stage: Stage::Paragraph(brief.role()),
            system: prompts::PARAGRAPH_SYSTEM.to_string(),
            prompt: format!("{}\n\n{}", body, prompts::PARAGRAPH_CONSTRAINT),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Generate one paragraph. Internal line breaks are folded into spaces
    /// so the paragraph stays a single block in the assembled report.
    pub async fn generate(&self, brief: ParagraphBrief<'_>) -> Result<ReportParagraph, BackendError> {
        let text = self.backend.generate(&self.request(&brief)).await?;
        Ok(ReportParagraph {
            role: brief.role(),
            text: collapse_whitespace(&text),
        })
    }

    async fn generate_role(
        &self,
        role: ParagraphRole,
        thesis: &str,
        summaries: &[String; 3],
        analysis: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<ReportParagraph, BackendError> {
        progress.report(ProgressEvent::Paragraph { role });
        self.generate(ParagraphBrief::for_role(role, thesis, summaries, analysis))
            .await
    }

    /// Generate all five paragraphs, in role order. The first failure aborts
    /// the rest.
    pub async fn generate_all(
        &self,
        thesis: &str,
        summaries: &[String; 3],
        analysis: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<[ReportParagraph; 5], BackendError> {
        let [intro, body1, body2, body3, conclusion] = ParagraphRole::ALL;
        if self.concurrent {
            let (a, b, c, d, e) = tokio::try_join!(
                self.generate_role(intro, thesis, summaries, analysis, progress),
                self.generate_role(body1, thesis, summaries, analysis, progress),
                self.generate_role(body2, thesis, summaries, analysis, progress),
                self.generate_role(body3, thesis, summaries, analysis, progress),
                self.generate_role(conclusion, thesis, summaries, analysis, progress),
            )?;
            return Ok([a, b, c, d, e]);
        }

        Ok([
            self.generate_role(intro, thesis, summaries, analysis, progress).await?,
            self.generate_role(body1, thesis, summaries, analysis, progress).await?,
            self.generate_role(body2, thesis, summaries, analysis, progress).await?,
            self.generate_role(body3, thesis, summaries, analysis, progress).await?,
            self.generate_role(conclusion, thesis, summaries, analysis, progress).await?,
        ])
    }
}

fn body_prompt(ordinal: &str, thesis: &str, summary: &str) -> String {
    prompts::fill(
        prompts::BODY_PROMPT,
        &[("ordinal", ordinal), ("thesis", thesis), ("text", summary)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn summaries() -> [String; 3] {
        [
            "SUMMARY-ONE".to_string(),
            "SUMMARY-TWO".to_string(),
            "SUMMARY-THREE".to_string(),
        ]
    }

    /// Introduction answers last; everything else answers immediately.
    struct SlowIntro {
        finished: Mutex<Vec<Stage>>,
    }

    #[async_trait]
    impl GenerationBackend for SlowIntro {
        fn model_name(&self) -> &str {
            "slow-intro"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
            if request.stage == Stage::Paragraph(ParagraphRole::Introduction) {
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
            self.finished.lock().unwrap().push(request.stage);
            Ok(format!("Text for\n{}.", request.stage))
        }
    }

    struct FailOn(ParagraphRole);

    #[async_trait]
    impl GenerationBackend for FailOn {
        fn model_name(&self) -> &str {
            "fail-on"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
            if request.stage == Stage::Paragraph(self.0) {
                return Err(BackendError::Malformed("no choices".into()));
            }
            Ok("fine".into())
        }
    }

    fn generator(backend: Arc<dyn GenerationBackend>, concurrent: bool) -> ParagraphGenerator {
        let mut config = Config::default();
        config.report.concurrent = concurrent;
        ParagraphGenerator::new(backend, &config)
    }

    #[test]
    fn every_prompt_ends_with_the_constraint() {
        let gen = generator(Arc::new(crate::backend::EchoBackend), false);
        let s = summaries();
        for role in ParagraphRole::ALL {
            let req = gen.request(&ParagraphBrief::for_role(role, "THESIS", &s, "ANALYSIS"));
            assert!(req.prompt.ends_with(prompts::PARAGRAPH_CONSTRAINT));
            assert!(req.prompt.contains("THESIS"));
            assert_eq!(req.stage, Stage::Paragraph(role));
            assert_eq!(req.max_tokens, 300);
        }
    }

    #[test]
    fn briefs_isolate_their_inputs() {
        let gen = generator(Arc::new(crate::backend::EchoBackend), false);
        let s = summaries();
        let prompt = |role| {
            gen.request(&ParagraphBrief::for_role(role, "THESIS", &s, "ANALYSIS"))
                .prompt
        };

        let intro = prompt(ParagraphRole::Introduction);
        assert!(!intro.contains("SUMMARY-") && !intro.contains("ANALYSIS"));

        let body2 = prompt(ParagraphRole::BodyBook2);
        assert!(body2.contains("SUMMARY-TWO"));
        assert!(body2.contains("second novel"));
        assert!(!body2.contains("SUMMARY-ONE") && !body2.contains("SUMMARY-THREE"));
        assert!(!body2.contains("ANALYSIS"));

        let conclusion = prompt(ParagraphRole::Conclusion);
        assert!(conclusion.contains("ANALYSIS"));
        assert!(conclusion.contains("rebuttal"));
        assert!(!conclusion.contains("SUMMARY-"));
    }

    #[tokio::test]
    async fn concurrent_results_keep_role_order() {
        let backend = Arc::new(SlowIntro {
            finished: Mutex::new(Vec::new()),
        });
        let gen = generator(backend.clone(), true);
        let paragraphs = gen
            .generate_all("T", &summaries(), "A", &NoProgress)
            .await
            .unwrap();

        let roles: Vec<_> = paragraphs.iter().map(|p| p.role).collect();
        assert_eq!(roles, ParagraphRole::ALL.to_vec());
        assert_eq!(paragraphs[0].text, "Text for paragraph:introduction.");

        // The introduction really did finish last.
        let finished = backend.finished.lock().unwrap();
        assert_eq!(
            finished.last(),
            Some(&Stage::Paragraph(ParagraphRole::Introduction))
        );
    }

    #[tokio::test]
    async fn sequential_mode_produces_the_same_order() {
        let backend = Arc::new(SlowIntro {
            finished: Mutex::new(Vec::new()),
        });
        let gen = generator(backend.clone(), false);
        let paragraphs = gen
            .generate_all("T", &summaries(), "A", &NoProgress)
            .await
            .unwrap();
        let roles: Vec<_> = paragraphs.iter().map(|p| p.role).collect();
        assert_eq!(roles, ParagraphRole::ALL.to_vec());
        let finished = backend.finished.lock().unwrap();
        assert_eq!(finished.first(), Some(&Stage::Paragraph(ParagraphRole::Introduction)));
    }

    #[tokio::test]
    async fn one_failure_fails_the_set() {
        for concurrent in [true, false] {
            let gen = generator(Arc::new(FailOn(ParagraphRole::BodyBook3)), concurrent);
            let err = gen
                .generate_all("T", &summaries(), "A", &NoProgress)
                .await
                .unwrap_err();
            assert!(matches!(err, BackendError::Malformed(_)));
        }
    }
}
