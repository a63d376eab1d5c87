use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{Engine, TraceOptions};

#[derive(Parser)]
#[command(name = "c4trace")]
#[command(about = "Trace architecture call trees through multi-project C# solutions")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trace call trees from the entry points
    Trace {
        /// Solution directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Trace only this method (Type.Method), repeatable
        #[arg(short, long = "entry")]
        entries: Vec<String>,

        /// Depth at which branches are cut
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write the trace to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List request types and the handlers they dispatch to
    Handlers {
        /// Solution directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// List the detected entry points
    Entries {
        /// Solution directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Trace { source, entries, max_depth, format, output } => {
                engine.trace(TraceOptions { source, entries, max_depth, format, output }).await
            }
            Commands::Handlers { source } => {
                engine.handlers(source).await
            }
            Commands::Entries { source } => {
                engine.entries(source).await
            }
            Commands::Init { path, force } => {
                engine.init(path, force).await
            }
        }
    }
}
