//! Groove Import - legacy data importer for a music-school application.
//!
//! Reads the notation and song spreadsheets exported from the old system,
//! parses drum notation into a grid-quantized event model, normalizes media
//! references into embeddable modules and stores the results alongside the
//! untouched original values.

pub mod cli;
pub mod config;
pub mod csv;
pub mod db;
pub mod embed;
pub mod error;
pub mod import;
pub mod notation;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "groove_import=info,import=info,db=info,config=info,embed=warn";

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; stdout carries command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    cli::run_command(&args)
}
