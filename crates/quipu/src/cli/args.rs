//! Command argument structures for the CLI.

use clap::Parser;
use std::path::PathBuf;

use super::validators::{validate_dimension, validate_jitter, validate_speed};

/// Arguments for the `play` command
#[derive(Parser, Debug, Clone)]
pub struct PlayArgs {
    /// Script to play
    pub script: PathBuf,

    /// Shell to spawn (overrides `@ shell:` and the config file)
    #[arg(long)]
    pub shell: Option<String>,

    /// Terminal columns (overrides `@ size:` and the config file)
    #[arg(long, value_parser = validate_dimension)]
    pub cols: Option<u16>,

    /// Terminal rows (overrides `@ size:` and the config file)
    #[arg(long, value_parser = validate_dimension)]
    pub rows: Option<u16>,

    /// Initial seconds between keystrokes
    ///
    /// `@ speed:` directives in the script still apply once reached.
    #[arg(long, value_parser = validate_speed)]
    pub speed: Option<f64>,

    /// Initial jitter fraction (0.0 to 1.0)
    #[arg(long, value_parser = validate_jitter)]
    pub jitter: Option<f64>,

    /// Print keystrokes in caret notation instead of spawning a shell
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `check` command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Script to check
    pub script: PathBuf,

    /// List every parsed command
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the `keys` command
#[derive(Parser, Debug, Clone, Default)]
pub struct KeysArgs {}

/// Arguments for the `info` command
#[derive(Parser, Debug, Clone, Default)]
pub struct InfoArgs {}

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone, Default)]
pub struct InitArgs {
    /// Overwrite an existing `quipu.yaml`
    #[arg(short, long)]
    pub force: bool,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}
