//! # Sift CLI
//!
//! Command-line front end for the Sift regex prefilter. It loads a JSON
//! document collection from disk and runs accelerated regex searches over it,
//! reporting how the prefilter performed.
//!
//! ## Commands
//!
//! - `sift search <file> <pattern>` - Search a field of every document
//! - `sift analyze <pattern>` - Explain how a pattern would be prefiltered
//! - `sift config` - Show or initialize the configuration
//!
//! ## Example Usage
//!
//! ```bash
//! # Find error lines in a JSON Lines log dump
//! sift search logs.jsonl "ERROR.*timeout" --field entry.message
//!
//! # Case-insensitive, repeated to exercise the cached index
//! sift search docs.json hello -O i --repeat 5 --stats
//!
//! # Why is this pattern not accelerated?
//! sift analyze "(a|b)c*"
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sift - Trigram-prefiltered regex search over JSON documents
#[derive(Parser)]
#[command(name = "sift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a document field with a regular expression
    Search {
        /// JSON array or JSON Lines file holding the documents
        file: PathBuf,

        /// Regular expression to search for
        pattern: String,

        /// Dotted path of the field to search
        #[arg(short, long, default_value = "text")]
        field: String,

        /// Match options (i, m, s, x)
        #[arg(short = 'O', long, default_value = "")]
        options: String,

        /// Disable the Bloom prefilter for this search
        #[arg(long)]
        no_bloom: bool,

        /// Override the per-document filter size in bytes
        #[arg(long)]
        size_bytes: Option<usize>,

        /// Override the minimum literal length
        #[arg(long)]
        min_literal: Option<usize>,

        /// Maximum number of matches to print
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Run the search this many times
        #[arg(long, default_value = "1")]
        repeat: usize,

        /// Print prefilter statistics after searching
        #[arg(long)]
        stats: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Explain how a pattern would be prefiltered
    Analyze {
        /// Regular expression to analyze
        pattern: String,

        /// Match options (i, m, s, x)
        #[arg(short = 'O', long, default_value = "")]
        options: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show the effective configuration
    Config {
        /// Print the default configuration file path and exit
        #[arg(long)]
        path: bool,

        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => sift_core::Config::load_from(path)?,
        None => sift_core::Config::load()?,
    };

    // Execute command
    match cli.command {
        Commands::Search {
            file,
            pattern,
            field,
            options,
            no_bloom,
            size_bytes,
            min_literal,
            limit,
            repeat,
            stats,
            output,
        } => {
            let request = commands::search::SearchRequest {
                file,
                pattern,
                field,
                options,
                no_bloom,
                size_bytes,
                min_literal,
                limit,
                repeat,
                stats,
            };
            commands::search::run(config, request, output)
        }
        Commands::Analyze {
            pattern,
            options,
            output,
        } => commands::analyze::run(config, &pattern, &options, output),
        Commands::Config { path, init } => commands::config::run(config, cli.config, path, init),
    }
}
