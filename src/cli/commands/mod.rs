//! CLI command definitions and dispatch.
//!
//! This module provides the command-line interface for groove-import.
//! Each subcommand is implemented in its own submodule for maintainability:
//! - `import`: CSV import into the database (or a dry run in memory)
//! - `inspect`: Parse one notation string or normalize one media reference
//! - `logs`: Recent import runs
//! - `config`: Show or write the configuration file

mod config;
mod import;
mod inspect;
mod logs;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::csv::Encoding;
use crate::embed::EmbedKind;
use crate::import::ImportKind;

pub use config::cmd_config;
pub use import::cmd_import;
pub use inspect::{cmd_embed, cmd_parse};
pub use logs::cmd_logs;

/// Legacy notation and song importer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the standard location
    #[arg(long, global = true, env = "GROOVE_IMPORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Import a legacy CSV export
    Import {
        /// Which export the file is
        #[arg(value_enum)]
        kind: ImportKind,
        /// Path to the CSV file
        file: PathBuf,
        /// Database path (defaults to the configured one)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Dry run - transform and count without touching the database
        #[arg(long)]
        dry_run: bool,
        /// Rows per batch write
        #[arg(long)]
        batch_size: Option<usize>,
        /// Byte encoding of the file
        #[arg(long, value_enum)]
        encoding: Option<Encoding>,
    },
    /// Parse one notation string and print the result as JSON
    Parse {
        /// Notation text
        notation: String,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
        /// Also print the drumblocks cut from an ok result
        #[arg(long)]
        blocks: bool,
    },
    /// Normalize one media reference and print the embed module as JSON
    Embed {
        /// URL, URI, iframe snippet or free text
        input: String,
        /// Media kind of the field the value came from
        #[arg(long, value_enum, default_value = "external")]
        kind: EmbedKind,
    },
    /// Show recent import runs
    Logs {
        /// Database path (defaults to the configured one)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let mut config = match &cli.config {
        Some(path) => crate::config::load_from(path),
        None => crate::config::load(),
    };

    match &cli.command {
        Commands::Import {
            kind,
            file,
            db,
            dry_run,
            batch_size,
            encoding,
        } => {
            if let Some(size) = batch_size {
                config.import.batch_size = *size;
            }
            if let Some(encoding) = encoding {
                config.import.encoding = *encoding;
            }
            let db = db.clone().unwrap_or_else(|| config.database.path.clone());
            cmd_import(&rt, &config, *kind, file, &db, *dry_run)
        }
        Commands::Parse {
            notation,
            strict,
            blocks,
        } => cmd_parse(&config, notation, *strict, *blocks),
        Commands::Embed { input, kind } => cmd_embed(&config, input, *kind),
        Commands::Logs { db, limit } => {
            let db = db.clone().unwrap_or_else(|| config.database.path.clone());
            cmd_logs(&rt, &db, *limit)
        }
        Commands::Config { init } => cmd_config(cli.config.as_deref(), &config, *init),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_args() {
        let cli = Cli::try_parse_from([
            "groove-import",
            "import",
            "songs",
            "POS_Songs.csv",
            "--dry-run",
            "--batch-size",
            "25",
            "--encoding",
            "auto",
        ])
        .unwrap();

        match cli.command {
            Commands::Import {
                kind,
                file,
                dry_run,
                batch_size,
                encoding,
                db,
            } => {
                assert_eq!(kind, ImportKind::Songs);
                assert_eq!(file, PathBuf::from("POS_Songs.csv"));
                assert!(dry_run);
                assert_eq!(batch_size, Some(25));
                assert_eq!(encoding, Some(Encoding::Auto));
                assert!(db.is_none());
            }
            _ => panic!("expected import command"),
        }
    }

    #[test]
    fn test_parse_embed_kind() {
        let cli = Cli::try_parse_from(["groove-import", "embed", "https://youtu.be/x", "--kind", "video"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Embed {
                kind: EmbedKind::Video,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["groove-import", "import", "students", "x.csv"]).is_err());
    }
}
