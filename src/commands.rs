//! This module defines the command-line interface for the service using
//! `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line
//! arguments, and a `Commands` enum that represents the available
//! subcommands and their options.
//!
//! # Examples
//!
//! Parsing command-line arguments:
//!
//! ```no_run
//! use clap::Parser;
//! use astro_chat::commands::Cli;
//!
//! let cli = Cli::parse();
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
///
/// This struct is constructed by parsing the command-line arguments using
/// `clap`. It contains a `command` field that holds the parsed subcommand
/// and its options.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Run the HTTP server.
    ///
    /// Loads the corpus, the vector index, and the embedding model, then
    /// serves the chat endpoints until interrupted.
    Serve {
        /// Path to the configuration file. Defaults to `config.yaml` in the
        /// per-platform configuration directory.
        #[arg(short, long, env = "ASTRO_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Write a default configuration file to the configuration directory.
    Init,
}
