//! lsmkv command-line driver
//!
//! Opens the engine (replaying the log), submits one request, then exits.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use lsmkv::wal::LogRecovery;
use lsmkv::{Action, Config, Engine, Key};
use tracing_subscriber::{fmt, EnvFilter};

/// lsmkv
#[derive(Parser, Debug)]
#[command(name = "lsmkv")]
#[command(about = "Embedded LSM key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./lsmkv_data")]
    data_dir: PathBuf,

    /// Distinct keys held in memory before a flush
    #[arg(short = 'm', long, default_value = "10")]
    memtable_keys: usize,

    /// Segments allowed before a flush compacts them
    #[arg(short = 's', long, default_value = "2")]
    max_segments: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add or overwrite a value
    Add {
        /// The key (> 0)
        key: Key,

        /// The value
        value: String,
    },

    /// Look up a value
    Search {
        /// The key (> 0)
        key: Key,
    },

    /// Delete a key
    Delete {
        /// The key (> 0)
        key: Key,
    },

    /// Write the memtable to a snapshot file
    Flush,

    /// Print log records not yet covered by a checkpoint
    Replay,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lsmkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!(fatal = e.is_fatal(), "{}", e);
        process::exit(if e.is_fatal() { 2 } else { 1 });
    }
}

fn run(args: Args) -> lsmkv::Result<()> {
    let (action, key, value) = match args.command {
        Commands::Add { key, value } => (Action::Add, key, Some(value)),
        Commands::Search { key } => (Action::Search, key, None),
        Commands::Delete { key } => (Action::Delete, key, None),
        Commands::Flush => (Action::Flush, 0, None),
        Commands::Replay => return print_pending(&args.data_dir),
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .memtable_max_keys(args.memtable_keys)
        .max_segments(args.max_segments)
        .build();

    let engine = Engine::open(config)?;
    tracing::debug!("lsmkv v{} opened {}", lsmkv::VERSION, args.data_dir.display());

    let result = engine.submit(action, key, value.as_deref());
    match &result {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) if action == Action::Search => println!("(not found)"),
        _ => {}
    }

    let exit = engine.submit(Action::Exit, 0, None);
    result?;
    exit.map(|_| ())
}

/// Print log records after the last checkpoint without opening the engine
fn print_pending(data_dir: &Path) -> lsmkv::Result<()> {
    let (records, stats) = LogRecovery::inspect(&data_dir.join("wal.log"))?;
    for record in &records {
        println!("{}", record);
    }
    tracing::info!(?stats, "log inspected");
    Ok(())
}
