//! # Grounded Chat CLI (`ragchat`)
//!
//! ## Usage
//!
//! ```bash
//! ragchat --config ./config/ragchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat index <PATH>` | Extract, chunk, embed, and upsert one document |
//! | `ragchat ask "<question>"` | Answer one question from the index |
//! | `ragchat chat` | Interactive question/answer shell |
//! | `ragchat init-index` | Create or update the search index schema |
//!
//! Credentials are read from the environment variables named in the config
//! (`SEARCH_SERVICE_API_KEY` and `AOAI_API_KEY` by default). Set `RUST_LOG`
//! for diagnostics.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use grounded_chat::embedding::{Embedder, OpenAiEmbedder};
use grounded_chat::index::azure::AzureSearchIndex;
use grounded_chat::progress::ProgressMode;
use grounded_chat::{chat, config, ingest};

const INDEX_USAGE: &str = "usage: ragchat index <PATH> [--dry-run] [--progress human|json|off]";

/// Text used to discover the embedding width when `--dims` is omitted.
const DIMENSION_PROBE: &str = "dimension probe";

/// Grounded Chat: answer questions about a document using only its contents.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "Grounded Chat: retrieval-augmented question answering over a document",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a document (.pdf, .docx, .txt, .md).
    ///
    /// Chunks are embedded and upserted one at a time in document order; the
    /// first failure stops the run.
    Index {
        /// Document to index.
        path: Option<PathBuf>,

        /// Extract and chunk only; print counts without calling any service.
        #[arg(long)]
        dry_run: bool,

        /// Per-chunk progress on stderr.
        #[arg(long, value_enum, default_value = "human")]
        progress: ProgressMode,
    },

    /// Answer a single question.
    Ask {
        question: String,

        /// Also print the retrieved sources.
        #[arg(long)]
        sources: bool,
    },

    /// Start an interactive chat. `/exit` or EOF ends the session.
    Chat,

    /// Create or update the search index schema.
    InitIndex {
        /// Vector width. Probed from the embedding deployment when omitted.
        #[arg(long)]
        dims: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Usage errors are reported before the config is read.
    if let Commands::Index { path: None, .. } = &cli.command {
        eprintln!("error: missing document path");
        eprintln!("{}", INDEX_USAGE);
        std::process::exit(1);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index {
            path,
            dry_run,
            progress,
        } => {
            if let Some(path) = path {
                ingest::run_index(&cfg, &path, dry_run, progress).await?;
            }
        }
        Commands::Ask { question, sources } => {
            chat::run_ask(&cfg, &question, sources).await?;
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
        Commands::InitIndex { dims } => {
            let dims = match dims {
                Some(d) => d,
                None => {
                    let embedder = OpenAiEmbedder::new(&cfg.openai)?;
                    embedder.embed(DIMENSION_PROBE).await?.len()
                }
            };
            let index = AzureSearchIndex::new(&cfg.search)?;
            index.create_or_update_index(dims).await?;
            println!("index {} ready ({} dims)", cfg.search.index_name, dims);
        }
    }

    Ok(())
}
