//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

use super::args::{CheckArgs, InfoArgs, InitArgs, KeysArgs, PlayArgs};
use crate::config::{QuipuConfig, SessionOverrides, resolve_session};
use crate::domain::{PlaybackConfig, Script};
use crate::language::language;
use crate::output::{self, OutputConfig, OutputMode};
use crate::parser::ScriptParser;
use crate::playback::{KeystrokeSink, PlaybackEngine, StopHandle};
use crate::pty::PtyManager;

/// Read, parse and validate a script file.
async fn load_script(path: &Path) -> Result<Script> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script '{}'", path.display()))?;

    let script = crate::parser::parse_script(&source)
        .with_context(|| format!("Failed to parse '{}'", path.display()))?;
    script
        .validate()
        .with_context(|| format!("'{}' cannot be played", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        commands = script.commands.len(),
        "Loaded script"
    );
    Ok(script)
}

/// Prints each keystroke unit on its own line in caret notation.
struct DryRunSink<W: Write> {
    out: W,
}

impl<W: Write> KeystrokeSink for DryRunSink<W> {
    fn send(&mut self, keys: &str) -> crate::error::Result<()> {
        writeln!(self.out, "{}", output::caret_notation(keys))?;
        Ok(())
    }
}

/// Execute the play command
pub async fn execute_play(
    args: &PlayArgs,
    config_path: Option<&Path>,
    output_mode: OutputMode,
) -> Result<()> {
    let script = load_script(&args.script).await?;
    let config = QuipuConfig::discover(config_path, &std::env::current_dir()?).await?;

    let overrides = SessionOverrides {
        shell: args.shell.clone(),
        cols: args.cols,
        rows: args.rows,
    };
    let options = resolve_session(&overrides, &script.session(), &config);

    let defaults = config.playback();
    let playback = PlaybackConfig {
        speed: args.speed.unwrap_or(defaults.speed),
        jitter: args.jitter.unwrap_or(defaults.jitter),
    };

    if args.dry_run {
        return match output_mode {
            OutputMode::Json => {
                let mut engine = PlaybackEngine::new(Vec::new())
                    .with_config(playback)
                    .without_delays();
                let summary = engine.execute(&script).await?;
                output::print_json(&serde_json::json!({
                    "shell": options.shell,
                    "cols": options.cols,
                    "rows": options.rows,
                    "term": options.term,
                    "keystrokes": engine.into_sink(),
                    "commands": summary.commands,
                }))?;
                Ok(())
            }
            OutputMode::Text => {
                eprintln!(
                    "Dry run: '{}' at {}x{}",
                    options.shell, options.cols, options.rows
                );
                let stdout = io::stdout();
                let mut engine = PlaybackEngine::new(DryRunSink { out: stdout.lock() })
                    .with_config(playback)
                    .without_delays();
                engine.execute(&script).await?;
                engine.into_sink().out.flush()?;
                Ok(())
            }
        };
    }

    let stop = StopHandle::new();
    let signal_stop = stop.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, stopping playback");
            signal_stop.stop();
        }
    });

    let result = {
        let pty = PtyManager::spawn(&options)?;
        let mut engine = PlaybackEngine::new(pty)
            .with_config(playback)
            .with_stop_handle(stop);
        engine.execute(&script).await
        // The PTY drops here, restoring the terminal before we print.
    };
    signal_task.abort();

    let summary = result?;
    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "commands": summary.commands,
            "keystrokes": summary.keystrokes,
            "stopped": summary.stopped,
        }))?,
        OutputMode::Text => output::print_playback_summary(
            &mut io::stderr().lock(),
            &summary,
            &OutputConfig::from_env(),
        )?,
    }
    Ok(())
}

/// Execute the check command
pub async fn execute_check(args: &CheckArgs, output_mode: OutputMode) -> Result<()> {
    let script = load_script(&args.script).await?;

    match output_mode {
        OutputMode::Json => {
            let session = script.session();
            output::print_json(&serde_json::json!({
                "script": args.script.display().to_string(),
                "shell": session.shell,
                "size": session.size,
                "typed": script.type_count(),
                "total_wait": script.total_wait().as_secs_f64(),
                "commands": script.commands,
            }))?;
        }
        OutputMode::Text => {
            output::print_check_text(
                &mut io::stdout().lock(),
                &args.script,
                &script,
                args.verbose,
                &OutputConfig::from_env(),
            )?;
        }
    }
    Ok(())
}

/// Execute the keys command
pub fn execute_keys(_args: &KeysArgs, output_mode: OutputMode) -> Result<()> {
    let language = language();
    match output_mode {
        OutputMode::Json => {
            let keys: Vec<_> = language
                .keys()
                .iter()
                .map(|key| {
                    serde_json::json!({
                        "names": key.names,
                        "sequence": key.sequence,
                    })
                })
                .collect();
            let modifiers: serde_json::Map<_, _> = crate::keys::MODIFIERS
                .iter()
                .map(|(name, spellings)| ((*name).to_string(), serde_json::json!(spellings)))
                .collect();
            output::print_json(&serde_json::json!({
                "keys": keys,
                "modifiers": modifiers,
            }))?;
        }
        OutputMode::Text => {
            output::print_keys_text(&mut io::stdout().lock(), language, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the info command
///
/// Assigns the built-in language to a fresh parser, which fails if the
/// handle is unusable.
pub fn execute_info(_args: &InfoArgs, output_mode: OutputMode) -> Result<()> {
    let mut parser = ScriptParser::new();
    parser
        .set_language(language())
        .context("Failed to load the quipu language")?;
    let loaded = parser
        .language()
        .context("Parser has no language after loading")?;

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({
                "name": loaded.name(),
                "version": loaded.version(),
                "compatible": loaded.is_compatible(),
                "directives": loaded.directives(),
                "keys": loaded.keys().len(),
            }))?;
        }
        OutputMode::Text => {
            output::print_language_text(&mut io::stdout().lock(), loaded, &OutputConfig::from_env())?;
        }
    }
    Ok(())
}

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.force).await?;

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({
                "config_file": result.config_file.display().to_string(),
                "overwritten": result.overwritten,
            }))?;
        }
        OutputMode::Text if !args.quiet => {
            let verb = if result.overwritten { "Rewrote" } else { "Created" };
            println!(
                "{} {}",
                output::success(verb, &OutputConfig::from_env()),
                result.config_file.display()
            );
        }
        OutputMode::Text => {}
    }
    Ok(())
}
