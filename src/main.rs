//! # docqa CLI
//!
//! The `docqa` binary answers questions about local PDF files using a
//! retrieval-augmented pipeline backed by a local Ollama instance.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./docqa.toml <command>
//! ```
//!
//! Without `--config`, `./docqa.toml` is used when present and built-in
//! defaults otherwise.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa ask <FILES>... -q "<question>"` | Answer a question from the given PDFs |
//! | `docqa index <FILES>...` | Build and cache the vector index without asking |
//! | `docqa history` | Print saved question/answer history |
//! | `docqa styles` | List the available answer styles |
//!
//! ## Examples
//!
//! ```bash
//! # Ask about a single file
//! docqa ask notes.pdf --question "What is the main argument?"
//!
//! # Ask across every PDF under a directory, in a different style
//! docqa ask papers/ -q "Summarize the methodology" --style "bullet points"
//!
//! # Warm the vector cache ahead of time
//! docqa index papers/
//!
//! # Revisit the last five answers
//! docqa history --limit 5
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use docqa::config::{load_config, Config};
use docqa::history::{append_history, clear_history, load_history};
use docqa::models::HistoryEntry;
use docqa::pipeline::RagPipeline;
use docqa::prompt::AnswerStyle;

/// docqa CLI — ask questions about your PDFs from the command line.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Ask questions about local PDF files using retrieval-augmented generation",
    version,
    long_about = "docqa chunks and embeds PDF files into a cached vector index, retrieves the \
    passages most similar to your question, and asks a local Ollama model to answer from them. \
    Every answer cites the file and page it came from."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./docqa.toml` when that file exists, and to built-in
    /// defaults otherwise. Passing a path that does not exist is an error.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ask a question about one or more PDF files.
    ///
    /// Loads and chunks the files (reusing the cached vector index when
    /// the bytes are unchanged), retrieves the most relevant passages,
    /// and prints the generated answer with its sources. The exchange is
    /// appended to the history file unless --no-history is given.
    Ask {
        /// PDF files or directories. Directories expand recursively to
        /// the `.pdf` files beneath them.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// The question to answer.
        #[arg(long, short = 'q')]
        question: String,

        /// Answer style, by name and case-insensitive. See `docqa styles`.
        #[arg(long, default_value = "Short and concise")]
        style: String,

        /// Do not record this exchange in the history file.
        #[arg(long)]
        no_history: bool,
    },

    /// Build and cache the vector index for files without asking anything.
    ///
    /// Useful to pay the embedding cost up front; a later `ask` over the
    /// same bytes starts from the cached vectors.
    Index {
        /// PDF files or directories. Directories expand recursively to
        /// the `.pdf` files beneath them.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print saved question/answer history, oldest first.
    History {
        /// Show only the most recent N entries.
        #[arg(long)]
        limit: Option<usize>,

        /// Empty the history file instead of printing it.
        #[arg(long)]
        clear: bool,
    },

    /// List the available answer styles with their instruction lines.
    Styles,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            files,
            question,
            style,
            no_history,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            let history_path = config.storage.history_path.clone();
            let files = collect_pdf_files(&files)?;
            let style = parse_style(&style)?;

            let pipeline = RagPipeline::new(config)?;
            let result = pipeline.answer(&files, &question, style).await?;

            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!();
                println!("Sources:");
                let mut seen = HashSet::new();
                for source in &result.sources {
                    if seen.insert((source.path.as_str(), source.page)) {
                        println!("  {} | page {}", source.path, source.page);
                    }
                }
            }

            if !no_history {
                let entry = HistoryEntry {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    question,
                    answer: result.answer,
                    answer_style: style.name().to_string(),
                    sources: result.sources,
                };
                append_history(&history_path, entry)?;
            }
        }
        Commands::Index { files } => {
            let config = resolve_config(cli.config.as_deref())?;
            let files = collect_pdf_files(&files)?;

            let pipeline = RagPipeline::new(config)?;
            let (fingerprint, chunk_count) = pipeline.build_index(&files).await?;
            println!("Indexed {} chunk(s) under fingerprint {}", chunk_count, fingerprint);
        }
        Commands::History { limit, clear } => {
            let config = resolve_config(cli.config.as_deref())?;
            let path = config.storage.history_path.clone();

            if clear {
                clear_history(&path)?;
                println!("History cleared.");
                return Ok(());
            }

            let entries = load_history(&path)?;
            if entries.is_empty() {
                println!("No history yet.");
                return Ok(());
            }
            let start = limit.map_or(0, |n| entries.len().saturating_sub(n));
            for entry in &entries[start..] {
                println!("[{}] {}", entry.timestamp, entry.question);
                println!("  style: {}", entry.answer_style);
                println!("  {}", entry.answer);
                for source in &entry.sources {
                    println!("  source: {} | page {}", source.path, source.page);
                }
                println!();
            }
        }
        Commands::Styles => {
            for style in AnswerStyle::ALL {
                println!("{}", style.name());
                println!("  {}", style.instruction());
            }
        }
    }

    Ok(())
}

/// Load configuration from an explicit path, `./docqa.toml`, or defaults.
fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new("docqa.toml");
            if default.exists() {
                load_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Expand file and directory arguments into a list of PDF paths.
///
/// Explicit file arguments are kept in the order given; each directory
/// expands recursively to the `.pdf` files beneath it, sorted by path.
fn collect_pdf_files(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(arg) {
                let entry = entry
                    .with_context(|| format!("failed to walk directory {}", arg.display()))?;
                if entry.file_type().is_file() && is_pdf(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(arg.clone());
        }
    }
    if files.is_empty() {
        bail!("no PDF files found in the given paths");
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Resolve a style name from the command line, listing the valid names
/// on failure.
fn parse_style(name: &str) -> Result<AnswerStyle> {
    AnswerStyle::from_name(name).ok_or_else(|| {
        let names: Vec<&str> = AnswerStyle::ALL.iter().map(|s| s.name()).collect();
        anyhow::anyhow!(
            "unknown answer style '{}' (expected one of: {})",
            name,
            names.join(", ")
        )
    })
}
