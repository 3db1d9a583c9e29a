//! Command-line interface for groove-import.
//!
//! This module provides CLI commands for importing legacy exports and for
//! inspecting how single notation strings and media references are read.

mod commands;

pub use commands::{Cli, Commands, run_command};
