//! Output formatting for CLI commands.
//!
//! Commands print either human-readable text or JSON for programmatic use.
//! Text output is written through `Write` handles so it can be tested
//! without a terminal.

pub mod color;

use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::path::Path;

use crate::domain::{Command, Script};
use crate::keys::MODIFIERS;
use crate::language::Language;
use crate::playback::PlaybackSummary;

pub use color::{info, success, warning};

use color::{bold, dimmed};

// ============================================================================
// Output Configuration
// ============================================================================

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `QUIPU_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let use_colors = env::var_os("NO_COLOR").is_none()
            && match env::var("QUIPU_COLOR") {
                Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") => false,
                Ok(v) if v.is_empty() || v == "1" || v.eq_ignore_ascii_case("true") => true,
                Ok(v) => {
                    tracing::warn!(
                        env_var = "QUIPU_COLOR",
                        value = %v,
                        "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                    );
                    true
                }
                Err(_) => true,
            };

        Self { use_colors }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Output mode for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

// ============================================================================
// Text Formatting
// ============================================================================

/// Render control characters in caret notation (`^[`, `^M`, `^?`).
pub fn caret_notation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\x00'..='\x1f' => {
                out.push('^');
                out.push(char::from(ch as u8 + 0x40));
            }
            '\x7f' => out.push_str("^?"),
            _ => out.push(ch),
        }
    }
    out
}

fn describe_command(command: &Command) -> String {
    match command {
        Command::SetSpeed(speed) => format!("speed {speed}s"),
        Command::SetJitter(jitter) => format!("jitter {jitter}"),
        Command::Wait(duration) => format!("wait {}s", duration.as_secs_f64()),
        Command::SetShell(shell) => format!("shell {shell}"),
        Command::SetSize(cols, rows) => format!("size {cols}x{rows}"),
        Command::Type(text) => format!("type \"{}\"", caret_notation(text)),
    }
}

/// Print the result of `quipu check`.
pub fn print_check_text<W: Write>(
    w: &mut W,
    path: &Path,
    script: &Script,
    verbose: bool,
    config: &OutputConfig,
) -> io::Result<()> {
    let session = script.session();
    writeln!(
        w,
        "{} {}",
        success("OK", config),
        bold(&path.display().to_string(), config)
    )?;
    writeln!(
        w,
        "  {} {} ({} typed, {:.1}s of waits)",
        dimmed("commands:", config),
        script.commands.len(),
        script.type_count(),
        script.total_wait().as_secs_f64()
    )?;
    if let Some(shell) = &session.shell {
        writeln!(w, "  {} {}", dimmed("shell:", config), shell)?;
    }
    if let Some((cols, rows)) = session.size {
        writeln!(w, "  {} {cols}x{rows}", dimmed("size:", config))?;
    }

    if verbose {
        writeln!(w)?;
        for (index, command) in script.commands.iter().enumerate() {
            writeln!(
                w,
                "  {} {}",
                dimmed(&format!("{:>3}.", index + 1), config),
                describe_command(command)
            )?;
        }
    }
    Ok(())
}

/// Print the named-key table and modifier spellings.
pub fn print_keys_text<W: Write>(
    w: &mut W,
    language: &Language,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(w, "{}", bold("Keys", config))?;
    for key in language.keys() {
        let names = key
            .names
            .iter()
            .map(|name| format!("<{name}>"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            w,
            "  {:<32} {}",
            info(&names, config),
            dimmed(&caret_notation(key.sequence), config)
        )?;
    }

    writeln!(w)?;
    writeln!(w, "{}", bold("Modifiers", config))?;
    for (modifier, spellings) in MODIFIERS {
        writeln!(w, "  {:<8} {}", modifier, spellings.join(", "))?;
    }
    writeln!(w)?;
    writeln!(
        w,
        "Combine as <MOD-KEY>, e.g. <C-c>, <A-ret>, <C-A-x>. Write \\< and \\> for literal brackets."
    )
}

/// Print the language handle description for `quipu info`.
pub fn print_language_text<W: Write>(
    w: &mut W,
    language: &Language,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} {} (version {})",
        success("Loaded", config),
        bold(language.name(), config),
        language.version()
    )?;
    writeln!(w)?;
    writeln!(w, "{}", bold("Directives", config))?;
    for spec in language.directives() {
        let usage = format!("@ {}:{}", spec.name, spec.argument.syntax());
        writeln!(w, "  {:<28} {}", info(&usage, config), spec.summary)?;
    }
    writeln!(w)?;
    writeln!(w, "  {:<28} comment", info("# ...", config))?;
    writeln!(w, "  {:<28} type text", info("$ <text>", config))?;
    writeln!(w)?;
    writeln!(w, "{} named keys", language.keys().len())
}

/// Print the closing line after playback.
pub fn print_playback_summary<W: Write>(
    w: &mut W,
    summary: &PlaybackSummary,
    config: &OutputConfig,
) -> io::Result<()> {
    let status = if summary.stopped {
        warning("Stopped", config)
    } else {
        success("Finished", config)
    };
    writeln!(
        w,
        "{status}: {} commands, {} keystrokes",
        summary.commands, summary.keystrokes
    )
}
