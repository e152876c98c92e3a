//! Quipu - scripted terminal sessions.
//!
//! Parses `.quipu` scripts and plays them into a shell running in a
//! pseudo-terminal, typing with human-like timing. The crate provides both
//! the `quipu` CLI and a library for embedding playback.
//!
//! ```
//! use quipu::domain::Command;
//! use quipu::parser::parse_script;
//!
//! let script = parse_script("@ speed:0.05\n$ echo hi<ret>\n").unwrap();
//! assert_eq!(script.commands[1], Command::Type("echo hi\r".to_string()));
//! ```

#![forbid(unsafe_code)]

// Script model and grammar
pub mod domain;
pub mod error;
pub mod keys;
pub mod language;
pub mod parser;

// Playback
pub mod playback;
pub mod pty;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

pub mod config;
pub mod output;

pub use error::{Error, LanguageError, Result};
pub use language::{Language, language};
pub use parser::{ScriptParser, parse_script};
