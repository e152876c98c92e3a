//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for quipu using clap's
//! derive API.
//!
//! # Commands
//!
//! - `play`: Play a script into a shell running in a PTY
//! - `check`: Parse and validate a script without playing it
//! - `keys`: List the special keys scripts can use
//! - `info`: Load the script language and describe it
//! - `init`: Write a starter `quipu.yaml`
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `--config <PATH>`: Use this config file instead of searching for one
//!
//! # Example
//!
//! ```bash
//! quipu check demo.quipu --verbose
//! quipu play demo.quipu --speed 0.05 --cols 100 --rows 30
//! quipu play demo.quipu --dry-run
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{CheckArgs, InfoArgs, InitArgs, KeysArgs, PlayArgs};

pub use validators::{validate_dimension, validate_jitter, validate_speed};

/// Quipu - scripted terminal sessions
///
/// Plays `.quipu` scripts into a real shell with human-like typing, for
/// recording demos and screencasts.
#[derive(Parser, Debug)]
#[command(name = "quipu")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of the discovered one
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Play a script
    ///
    /// Spawns the shell in a pseudo-terminal and types the script into it.
    /// Send SIGINT to stop playback early.
    Play(PlayArgs),

    /// Check a script for errors
    ///
    /// Parses and validates the script and prints a summary of what it does.
    Check(CheckArgs),

    /// List special keys
    ///
    /// Shows every `<key>` name and modifier spelling scripts can use.
    Keys(KeysArgs),

    /// Show language information
    ///
    /// Loads the script language into a parser and reports its version and
    /// directives.
    Info(InfoArgs),

    /// Write a starter config file
    ///
    /// Creates `quipu.yaml` in the current directory with the default
    /// settings.
    Init(InitArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Some(Commands::Play(args)) => {
                execute::execute_play(args, self.config.as_deref(), output_mode).await
            }
            Some(Commands::Check(args)) => execute::execute_check(args, output_mode).await,
            Some(Commands::Keys(args)) => execute::execute_keys(args, output_mode),
            Some(Commands::Info(args)) => execute::execute_info(args, output_mode),
            Some(Commands::Init(args)) => execute::execute_init(args, output_mode).await,
            None => {
                println!("Quipu scripted terminal sessions");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}
