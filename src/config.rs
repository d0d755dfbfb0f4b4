use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::SourceFormat;

/// Number of books a report compares. The paragraph roles are fixed to three bodies.
pub const BOOK_COUNT: usize = 3;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub budgets: BudgetConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub books: Vec<BookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout. Unset means a call waits for the backend indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini-2024-07-18".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.7
}

/// Maximum output tokens requested from the backend, per stage.
#[derive(Debug, Deserialize, Clone)]
pub struct BudgetConfig {
    #[serde(default = "default_short_budget")]
    pub summary: u32,
    #[serde(default = "default_long_budget")]
    pub comparison: u32,
    #[serde(default = "default_short_budget")]
    pub thesis: u32,
    #[serde(default = "default_title_budget")]
    pub title: u32,
    #[serde(default = "default_long_budget")]
    pub paragraph: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            summary: default_short_budget(),
            comparison: default_long_budget(),
            thesis: default_short_budget(),
            title: default_title_budget(),
            paragraph: default_long_budget(),
        }
    }
}

fn default_short_budget() -> u32 {
    150
}
fn default_long_budget() -> u32 {
    300
}
fn default_title_budget() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            unit_timeout_secs: default_unit_timeout_secs(),
        }
    }
}

fn default_unit_timeout_secs() -> u64 {
    10
}

/// How a document reaches the summarizer.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// One summary call over the whole normalized document.
    #[default]
    Whole,
    /// Summarize each chunk, then combine the partial summaries in one call.
    MapReduce,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default)]
    pub policy: ChunkPolicy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            policy: ChunkPolicy::Whole,
        }
    }
}

fn default_max_chars() -> usize {
    4000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_indent")]
    pub indent: String,
    #[serde(default = "default_true")]
    pub dynamic_title: bool,
    /// Used when `dynamic_title` is off.
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_true")]
    pub summary_citations: bool,
    #[serde(default = "default_true")]
    pub concurrent: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            indent: default_indent(),
            dynamic_title: true,
            title: default_title(),
            summary_citations: true,
            concurrent: true,
        }
    }
}

fn default_theme() -> String {
    "social isolation".to_string()
}
fn default_indent() -> String {
    "    ".to_string()
}
fn default_title() -> String {
    "Book Report".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: String,
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            path: default_output_path(),
        }
    }
}

fn default_output_format() -> String {
    "text".to_string()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("Final_Book_Report.txt")
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookConfig {
    pub path: PathBuf,
    /// `xml`, `pdf` or `epub`. Inferred from the extension when omitted.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl BookConfig {
    pub fn source_format(&self) -> Result<SourceFormat> {
        let format = match &self.format {
            Some(f) => f.parse::<SourceFormat>()?,
            None => SourceFormat::from_path(&self.path)?,
        };
        Ok(format)
    }

    /// Label shown in progress output: the configured label, else the file name.
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }
}

impl Config {
    /// Built-in defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Checks the settings every command relies on.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            anyhow::bail!("chunking.max_chars must be > 0");
        }

        if !(0.0..=2.0).contains(&self.backend.temperature) {
            anyhow::bail!("backend.temperature must be in [0.0, 2.0]");
        }

        match self.backend.provider.as_str() {
            "openai" | "echo" | "disabled" => {}
            other => anyhow::bail!(
                "Unknown backend provider: '{}'. Must be openai, echo, or disabled.",
                other
            ),
        }

        let budgets = [
            ("summary", self.budgets.summary),
            ("comparison", self.budgets.comparison),
            ("thesis", self.budgets.thesis),
            ("title", self.budgets.title),
            ("paragraph", self.budgets.paragraph),
        ];
        for (name, budget) in budgets {
            if budget == 0 {
                anyhow::bail!("budgets.{} must be > 0", name);
            }
        }

        if self.report.title.trim().is_empty() || self.report.title.contains(['\n', '\r']) {
            anyhow::bail!("report.title must be a single non-empty line");
        }

        if self.report.indent.chars().count() != 4 {
            anyhow::bail!("report.indent must be exactly four characters");
        }

        if self.extraction.unit_timeout_secs == 0 {
            anyhow::bail!("extraction.unit_timeout_secs must be > 0");
        }

        crate::render::OutputFormat::parse(&self.output.format)?;

        Ok(())
    }

    /// Checks the book list required by `run`.
    pub fn validate_books(&self) -> Result<()> {
        if self.books.len() != BOOK_COUNT {
            anyhow::bail!(
                "exactly {} [[books]] entries are required, found {}",
                BOOK_COUNT,
                self.books.len()
            );
        }
        for book in &self.books {
            book.source_format()
                .with_context(|| format!("book {}", book.path.display()))?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.validate()?;

    Ok(config)
}
