//! # litreport CLI
//!
//! The `litreport` binary reads three books, runs the generation pipeline,
//! and writes the report. It also offers offline commands for checking how a
//! book is read and for re-rendering a finished report.
//!
//! ## Usage
//!
//! ```bash
//! litreport --config ./config/litreport.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `litreport run` | Generate the report for the configured books |
//! | `litreport extract <path>` | Show extraction stats (or text) for one book |
//! | `litreport chunks <path>` | List sentence-aligned chunks for one book |
//! | `litreport render <report.txt>` | Re-render a text report as docx or pdf |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG=litreport=debug`
//! for more detail.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use litreport::config;
use litreport::inspect;
use litreport::pipeline;
use litreport::progress::ProgressMode;

/// litreport: thematic literary reports from three books.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/litreport.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "litreport",
    about = "Generate a thematic literary report from three books",
    version,
    long_about = "litreport reads three books (XML exports, PDF, EPUB), summarizes each with a \
    language model through a content-addressed cache, and composes a titled five-paragraph \
    comparative report rendered as text, Word, or PDF."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/litreport.toml`. `extract`, `chunks` and
    /// `render` fall back to built-in defaults when it does not exist.
    #[arg(long, global = true, default_value = "./config/litreport.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate the report.
    ///
    /// Extracts and summarizes the three `[[books]]`, then runs analysis,
    /// thesis, title and paragraph generation. The output file is written
    /// only if every stage succeeds.
    Run {
        /// Override `[output].path`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override `[output].format`: `text`, `docx`, or `pdf`.
        #[arg(long)]
        format: Option<String>,

        /// Progress on stderr: `human`, `json`, or `off`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Extract one book and print stats.
    Extract {
        /// Path to the book.
        path: PathBuf,

        /// Source format: `xml`, `pdf`, or `epub`. Inferred from the extension by default.
        #[arg(long)]
        format: Option<String>,

        /// Print the normalized text instead of stats.
        #[arg(long)]
        text: bool,
    },

    /// List the sentence-aligned chunks of one book.
    Chunks {
        /// Path to the book.
        path: PathBuf,

        /// Source format: `xml`, `pdf`, or `epub`.
        #[arg(long)]
        format: Option<String>,

        /// Override `[chunking].max_chars`.
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Re-render an assembled text report.
    Render {
        /// The text report to read.
        input: PathBuf,

        /// Output format: `text`, `docx`, or `pdf`.
        #[arg(long)]
        format: String,

        /// Where to write the rendered file.
        #[arg(long)]
        output: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that work without a config file
    match &cli.command {
        Commands::Extract { path, format, text } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            inspect::run_extract(&cfg, path, format.as_deref(), *text).await?;
            return Ok(());
        }
        Commands::Chunks {
            path,
            format,
            max_chars,
        } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            inspect::run_chunks(&cfg, path, format.as_deref(), *max_chars).await?;
            return Ok(());
        }
        Commands::Render {
            input,
            format,
            output,
        } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
            inspect::run_render(&cfg, input, format, output)?;
            return Ok(());
        }
        Commands::Run { .. } => {}
    }

    let mut cfg = config::load_config(&cli.config)?;

    if let Commands::Run {
        output,
        format,
        progress,
    } = cli.command
    {
        if let Some(output) = output {
            cfg.output.path = output;
        }
        if let Some(format) = format {
            cfg.output.format = format;
            cfg.validate()?;
        }
        let mode = match progress.as_deref() {
            Some(value) => ProgressMode::parse(value).ok_or_else(|| {
                anyhow::anyhow!("Unknown progress mode: '{}'. Use human, json, or off.", value)
            })?,
            None => ProgressMode::default_for_tty(),
        };
        pipeline::run_report(&cfg, mode.reporter()).await?;
    }

    Ok(())
}
