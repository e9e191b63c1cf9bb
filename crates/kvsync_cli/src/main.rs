//! kvsync CLI
//!
//! Command-line tools for kvsync file stores.
//!
//! # Commands
//!
//! - `get` - Print the value of a key
//! - `set` - Write a value
//! - `remove` - Delete a key
//! - `list` - Print every entry
//! - `watch` - Poll keys and print each detected change

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// kvsync command-line store tools.
#[derive(Parser)]
#[command(name = "kvsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON store file
    #[arg(global = true, short, long, default_value = "kvsync.json")]
    file: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a key
    Get {
        /// Key to read
        key: String,
    },

    /// Write a value under a key
    Set {
        /// Key to write
        key: String,
        /// Value to store verbatim
        value: String,
    },

    /// Remove a key
    Remove {
        /// Key to remove
        key: String,
    },

    /// Print every entry in the store
    List {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Poll keys and print every change until interrupted
    Watch {
        /// Keys to track
        #[arg(required = true)]
        keys: Vec<String>,

        /// Milliseconds between polls
        #[arg(short, long, default_value = "1000")]
        interval_ms: u64,

        /// Stop after this many changes
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Get { key } => commands::entry::get(&cli.file, &key)?,
        Commands::Set { key, value } => commands::entry::set(&cli.file, &key, &value)?,
        Commands::Remove { key } => commands::entry::remove(&cli.file, &key)?,
        Commands::List { format } => commands::entry::list(&cli.file, &format)?,
        Commands::Watch {
            keys,
            interval_ms,
            count,
        } => commands::watch::run(&cli.file, keys, interval_ms, count)?,
        Commands::Version => {
            println!("kvsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
