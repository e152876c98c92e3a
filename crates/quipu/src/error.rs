//! Error types for quipu operations.

use std::io;
use thiserror::Error;

/// The error type for quipu operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A script line could not be parsed.
    #[error("Line {line}: {message}")]
    Parse {
        /// 1-based line number in the script.
        line: usize,
        /// What went wrong on that line.
        message: String,
    },

    /// The script parsed but is not playable as written.
    #[error("Invalid script: {0}")]
    InvalidScript(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The grammar handle could not be used.
    #[error(transparent)]
    Language(#[from] LanguageError),

    /// Pseudo-terminal setup or I/O failed.
    #[error("PTY error: {0}")]
    Pty(String),
}

/// Failures when loading the quipu language into a parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    /// `parse` was called before a language was assigned.
    #[error("No language assigned to the parser")]
    NoLanguage,

    /// The handle was built for a grammar version this parser cannot read.
    #[error(
        "Incompatible language version {version} for '{name}' (supported: {min_supported}..={max_supported})"
    )]
    IncompatibleVersion {
        /// Name of the rejected language.
        name: &'static str,
        /// Version carried by the rejected handle.
        version: u32,
        /// Oldest version this parser reads.
        min_supported: u32,
        /// Newest version this parser reads.
        max_supported: u32,
    },
}

/// A specialized Result type for quipu operations.
pub type Result<T> = std::result::Result<T, Error>;
