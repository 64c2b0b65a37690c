//! # pagewise CLI
//!
//! ```bash
//! pagewise [--config ./config/pagewise.toml] [--backend URL] [-v] <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagewise chat` | Interactive chat transcript |
//! | `pagewise chat -m "<message>"` | Send one message and print the reply |
//! | `pagewise docs <file>` | Summarize a PDF or load a text file, then ask questions |
//! | `pagewise docs <file> --ask "<question>"` | Answer one question and exit |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pagewise::backend::HttpBackend;
use pagewise::docs_cmd::DocsArgs;
use pagewise::shell::SessionEnd;
use pagewise::{chat_cmd, config, docs_cmd, logging};

/// pagewise — chat with a backend, or summarize a document and ask about it.
///
/// The backend origin comes from the config file, the
/// `PAGEWISE_BACKEND_URL` environment variable, or `--backend`, in
/// increasing order of precedence.
#[derive(Parser)]
#[command(
    name = "pagewise",
    about = "Chat, document summarization, and contextual Q&A against a remote backend",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/pagewise.toml")]
    config: PathBuf,

    /// Backend origin, e.g. `http://127.0.0.1:5040`.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Log requests and state changes to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the backend.
    ///
    /// Without `--message`, reads one message per line from stdin.
    /// Session commands: /clear, /save <path>, /quit.
    Chat {
        /// Send a single message and exit.
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Summarize or load a document, then ask questions about it.
    ///
    /// PDFs are summarized by the backend page by page; text files and
    /// spreadsheets are read locally. Session commands: /pages,
    /// /page <label|all>, /open <path>, /show, /quit.
    Docs {
        /// File to process.
        file: PathBuf,

        /// Ask one question and exit.
        #[arg(long)]
        ask: Option<String>,

        /// Page label to ground questions in (default: all pages).
        #[arg(long)]
        page: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let cfg = config::resolve_config(&cli.config, cli.backend)?;
    let backend = HttpBackend::from_config(&cfg)?;
    tracing::debug!(backend = %cfg.backend.url, "configuration resolved");

    let end = match cli.command {
        Commands::Chat { message } => chat_cmd::run_chat(&backend, message).await?,
        Commands::Docs { file, ask, page } => {
            docs_cmd::run_docs(&cfg, &backend, DocsArgs { file, ask, page }).await?
        }
    };

    if end == SessionEnd::Interrupted {
        // The stdin reader is still blocked, which would stall runtime shutdown.
        std::process::exit(130);
    }

    Ok(())
}
