//! Ragline CLI: the main entry point.
//!
//! Commands:
//! - `serve`  : Ingest the corpus and start the HTTP gateway
//! - `chat`   : Interactive or single-message chat
//! - `ingest` : Index a directory and print the report
//! - `init`   : Print (or write) the default configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Ragline, a retrieval-augmented agent with tool routing",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the corpus and start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the corpus directory
        #[arg(long, env = "RAGLINE_CORPUS")]
        corpus: Option<PathBuf>,
    },

    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Segment and index a directory of documents
    Ingest {
        /// Directory containing .md / .txt files
        dir: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Init {
        /// Write it to ~/.ragline/config.toml instead of stdout
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port, corpus } => commands::serve::run(port, corpus).await?,
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Ingest { dir, json } => commands::ingest::run(dir, json).await?,
        Commands::Init { write } => commands::init::run(write).await?,
    }

    Ok(())
}
