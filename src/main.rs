//! # Resonnet CLI (`resonnet`)
//!
//! ## Usage
//!
//! ```bash
//! resonnet --config ./config/resonnet.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `resonnet check [FILE]` | Analyze a prompt once and print the findings |
//! | `resonnet session` | Feed buffer snapshots from stdin through the live coordinator |
//! | `resonnet serve` | Start the HTTP analyze proxy |
//!
//! ## Examples
//!
//! ```bash
//! export ANTHROPIC_API_KEY=sk-ant-...
//!
//! # Analyze a prompt file
//! resonnet check prompts/summarize.txt
//!
//! # Simulate an editor: one buffer snapshot per line
//! printf 'Write a\nWrite a summary of the report, make it better\n' | resonnet session
//!
//! # Serve POST /analyze for a browser editor
//! resonnet serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use resonnet::{check, client, config, server, session};

/// Resonnet: live prompt analysis for misalignment risks.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Built-in defaults are used when the file does not exist.
#[derive(Parser)]
#[command(
    name = "resonnet",
    about = "Resonnet: live prompt analysis for misalignment risks",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/resonnet.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overrides `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a prompt once.
    ///
    /// Reads the prompt from FILE, or from stdin when no file is given.
    Check {
        /// Prompt file to analyze.
        file: Option<PathBuf>,

        /// Print findings as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a live editing session over stdin.
    ///
    /// Every input line is a full snapshot of the buffer (`\n` escapes allowed).
    /// Every published analysis state is printed as a JSON line.
    Session,

    /// Start the HTTP analyze proxy.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("resonnet=debug,resonnet_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_or_default(&cli.config)?;
    let client = client::create_client(&cfg.client)?;

    match cli.command {
        Commands::Check { file, json } => {
            check::run_check(&cfg, client.as_ref(), file.as_deref(), json).await?;
        }
        Commands::Session => {
            session::run_session(&cfg, client).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg, client).await?;
        }
    }

    Ok(())
}
