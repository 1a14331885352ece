//! pondb CLI
//!
//! Command-line tools for pondb databases.
//!
//! # Commands
//!
//! - `inspect` - Display database statistics
//! - `get` - Print one record
//! - `upsert` - Insert or replace a record from JSON
//! - `delete` - Delete one record
//! - `query` - Print (or delete) the records matching conditions
//! - `dump-wal` - Dump WAL records for debugging
//! - `checkpoint` - Rewrite the WAL to reclaim space

mod commands;
mod error;
mod json;

use clap::{Parser, Subcommand};
use commands::Format;
use error::CliError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// pondb command-line database tools.
#[derive(Parser)]
#[command(name = "pondb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display database statistics
    Inspect {
        /// List collections with record counts
        #[arg(short, long)]
        collections: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one record
    Get {
        /// Collection name
        collection: String,

        /// Key: integer, `oid:<uuid>`, `text:<key>` or text
        key: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Insert or replace a record
    Upsert {
        /// Collection name
        collection: String,

        /// Record fields as a JSON object
        fields: String,

        /// Key: integer, `oid:<uuid>`, `text:<key>` or text. Generated if omitted.
        #[arg(short, long)]
        key: Option<String>,

        /// Update policy (replace-all, fail-on-conflict, insert-only, replace-only)
        #[arg(long, default_value = "replace-all")]
        policy: String,
    },

    /// Delete one record
    Delete {
        /// Collection name
        collection: String,

        /// Key: integer, `oid:<uuid>`, `text:<key>` or text
        key: String,
    },

    /// Print the records matching all conditions
    Query {
        /// Collection name
        collection: String,

        /// Field condition, e.g. `age >= 4` or `ponds.Wald == Dark`
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,

        /// Size condition on a list or dictionary, e.g. `ponds > 1`
        #[arg(short, long)]
        count: Vec<String>,

        /// Dictionary key condition, e.g. `ponds:Wald`
        #[arg(long)]
        contains_key: Vec<String>,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Delete the matching records instead of printing them
        #[arg(long)]
        delete: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump WAL records for debugging
    DumpWal {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Start from this offset
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rewrite the WAL as a single transaction
    Checkpoint,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let path = || {
        cli.path
            .clone()
            .ok_or_else(|| CliError::argument("database path required (--path)"))
    };

    match &cli.command {
        Commands::Inspect {
            collections,
            format,
        } => commands::inspect::run(&path()?, *collections, Format::parse(format)?)?,
        Commands::Get {
            collection,
            key,
            format,
        } => commands::get::run(&path()?, collection, key, Format::parse(format)?)?,
        Commands::Upsert {
            collection,
            fields,
            key,
            policy,
        } => commands::upsert::run(&path()?, collection, key.as_deref(), fields, policy)?,
        Commands::Delete { collection, key } => {
            commands::delete::run(&path()?, collection, key)?;
        }
        Commands::Query {
            collection,
            filters,
            count,
            contains_key,
            limit,
            delete,
            format,
        } => {
            let conditions = commands::query::Conditions {
                filters: filters.clone(),
                counts: count.clone(),
                contains_keys: contains_key.clone(),
            };
            commands::query::run(
                &path()?,
                collection,
                &conditions,
                *limit,
                *delete,
                Format::parse(format)?,
            )?;
        }
        Commands::DumpWal {
            limit,
            offset,
            format,
        } => commands::dump_wal::run(&path()?, *limit, *offset, Format::parse(format)?)?,
        Commands::Checkpoint => commands::checkpoint::run(&path()?)?,
        Commands::Version => {
            println!("pondb CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
