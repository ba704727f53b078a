//! # pdfchat CLI
//!
//! ## Usage
//!
//! ```bash
//! pdfchat [--config ./pdfchat.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfchat index --file a.pdf` | Build the index and report passages per file |
//! | `pdfchat search "<query>" --dir docs/` | Show the closest passages with scores |
//! | `pdfchat ask "<question>" --file a.pdf` | Answer one question with sources |
//!
//! `index`, `search`, and `ask` take `--json` for machine-readable output.
//! `ask` exits non-zero when the generation backend fails.
//! | `pdfchat chat --dir docs/` | Interactive session over the documents |
//! | `pdfchat completions <shell>` | Print a shell completion script |
//!
//! Without `--config` the built-in defaults are used: local embeddings and
//! Gemini generation with the key taken from `GEMINI_API_KEY`.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use pdfchat::documents::DocumentArgs;
use pdfchat::{chat, config, ingest, logging, search};

/// Ask questions about your PDFs.
#[derive(Parser)]
#[command(
    name = "pdfchat",
    about = "pdfchat: ask questions about your PDFs and get answers with page citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk, and embed documents, then report what was indexed.
    Index {
        #[command(flatten)]
        docs: DocumentArgs,

        /// Print the per-file report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the passages closest to a query, without generation.
    Search {
        /// The search query string.
        query: String,

        /// Number of passages to return (defaults to `[retrieval].k`).
        #[arg(long)]
        k: Option<usize>,

        #[command(flatten)]
        docs: DocumentArgs,

        /// Print hits as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a single question from the documents.
    Ask {
        /// The question.
        question: String,

        #[command(flatten)]
        docs: DocumentArgs,

        /// Print the answer, citations, and outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat over the documents.
    ///
    /// Reads questions from stdin, one per line. Type `/help` for commands.
    Chat {
        #[command(flatten)]
        docs: DocumentArgs,
    },

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Does not need config
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "pdfchat", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_or_default(cli.config.as_deref())?;
    logging::init(&cfg.logging.level)?;

    match cli.command {
        Commands::Index { docs, json } => {
            ingest::run_index(&cfg, &docs, json).await?;
        }
        Commands::Search {
            query,
            k,
            docs,
            json,
        } => {
            search::run_search(&cfg, &docs, &query, k, json).await?;
        }
        Commands::Ask {
            question,
            docs,
            json,
        } => {
            chat::run_ask(&cfg, &docs, &question, json).await?;
        }
        Commands::Chat { docs } => {
            chat::run_chat(&cfg, &docs).await?;
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
