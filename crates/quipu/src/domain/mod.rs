//! Core domain types for quipu scripts.
//!
//! A [`Script`] is the parsed form of a `.quipu` file: an ordered list of
//! [`Command`]s. Setup directives (`@ shell:` and `@ size:`) describe the
//! session and are consumed before playback starts; everything else is
//! executed in order by the playback engine.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Default base time between keystrokes, in seconds.
pub const DEFAULT_SPEED: f64 = 0.1;

/// Default jitter fraction.
pub const DEFAULT_JITTER: f64 = 0.0;

/// A single script instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Command {
    /// Base time between keystrokes, in seconds.
    #[serde(rename = "speed")]
    SetSpeed(f64),

    /// Jitter as a fraction (0.0 to 1.0) of the speed.
    #[serde(rename = "jitter")]
    SetJitter(f64),

    /// Pause playback.
    Wait(#[serde(serialize_with = "serialize_seconds")] Duration),

    /// Shell to spawn. Must come before any `Type` command.
    #[serde(rename = "shell")]
    SetShell(String),

    /// PTY size as columns and rows. Must come before any `Type` command.
    #[serde(rename = "size")]
    SetSize(u16, u16),

    /// Text to type, with special keys already resolved to escape sequences.
    Type(String),
}

impl Command {
    /// Whether this command configures the session rather than playback.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::SetShell(_) | Self::SetSize(_, _))
    }
}

fn serialize_seconds<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Live timing parameters for playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Base time between keystrokes in seconds.
    pub speed: f64,
    /// Jitter as a fraction (0.0 to 1.0) of speed.
    pub jitter: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            jitter: DEFAULT_JITTER,
        }
    }
}

/// Session settings declared by a script's setup directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Shell requested with `@ shell:`.
    pub shell: Option<String>,
    /// `(cols, rows)` requested with `@ size:`.
    pub size: Option<(u16, u16)>,
}

/// A parsed script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    /// Commands in source order.
    pub commands: Vec<Command>,
}

impl Script {
    /// Create a script from a list of commands.
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Collect the setup directives. The last occurrence of each wins.
    pub fn session(&self) -> SessionSettings {
        let mut settings = SessionSettings::default();
        for command in &self.commands {
            match command {
                Command::SetShell(shell) => settings.shell = Some(shell.clone()),
                Command::SetSize(cols, rows) => settings.size = Some((*cols, *rows)),
                _ => {}
            }
        }
        settings
    }

    /// Check that setup directives precede the first `Type` command.
    ///
    /// The shell and PTY size are fixed once the session starts, so a setup
    /// directive after typing has begun could never take effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScript`] naming the first misplaced directive.
    pub fn validate(&self) -> Result<()> {
        let Some(first_type) = self
            .commands
            .iter()
            .position(|c| matches!(c, Command::Type(_)))
        else {
            return Ok(());
        };

        let late = self
            .commands
            .iter()
            .enumerate()
            .skip(first_type)
            .find(|(_, c)| c.is_setup());

        if let Some((index, command)) = late {
            let directive = match command {
                Command::SetShell(_) => "shell",
                _ => "size",
            };
            return Err(Error::InvalidScript(format!(
                "'@ {directive}:' must appear before the first '$' line (command {} of {})",
                index + 1,
                self.commands.len()
            )));
        }

        Ok(())
    }

    /// Number of `Type` commands in the script.
    pub fn type_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Type(_)))
            .count()
    }

    /// Sum of all explicit waits.
    pub fn total_wait(&self) -> Duration {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Wait(d) => Some(*d),
                _ => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_config_default() {
        let config = PlaybackConfig::default();
        assert!((config.speed - 0.1).abs() < f64::EPSILON);
        assert!(config.jitter.abs() < f64::EPSILON);
    }

    #[test]
    fn test_session_last_directive_wins() {
        let script = Script::new(vec![
            Command::SetShell("/bin/bash".to_string()),
            Command::SetSize(80, 24),
            Command::SetShell("/bin/zsh".to_string()),
            Command::Type("ls".to_string()),
        ]);

        let session = script.session();
        assert_eq!(session.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(session.size, Some((80, 24)));
    }

    #[test]
    fn test_validate_accepts_setup_before_typing() {
        let script = Script::new(vec![
            Command::SetSize(100, 30),
            Command::SetSpeed(0.05),
            Command::Type("echo hi".to_string()),
            Command::Wait(Duration::from_secs(1)),
        ]);
        assert!(script.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_shell_after_typing() {
        let script = Script::new(vec![
            Command::Type("echo hi".to_string()),
            Command::SetShell("/bin/zsh".to_string()),
        ]);

        let err = script.validate().unwrap_err().to_string();
        assert!(err.contains("'@ shell:'"), "unexpected error: {err}");
        assert!(err.contains("command 2 of 2"), "unexpected error: {err}");
    }

    #[test]
    fn test_validate_rejects_size_after_typing() {
        let script = Script::new(vec![
            Command::Type("a".to_string()),
            Command::Wait(Duration::from_millis(5)),
            Command::SetSize(80, 24),
        ]);
        let err = script.validate().unwrap_err().to_string();
        assert!(err.contains("'@ size:'"));
    }

    #[test]
    fn test_empty_script_is_valid() {
        assert!(Script::default().validate().is_ok());
    }

    #[test]
    fn test_command_json_shape() {
        let json = serde_json::to_value(Command::Wait(Duration::from_millis(1500))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "wait", "value": 1.5}));

        let json = serde_json::to_value(Command::SetSize(120, 40)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "size", "value": [120, 40]}));

        let json = serde_json::to_value(Command::Type("ls\r".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "type", "value": "ls\r"}));
    }

    #[test]
    fn test_totals() {
        let script = Script::new(vec![
            Command::Type("a".to_string()),
            Command::Wait(Duration::from_millis(250)),
            Command::Type("b".to_string()),
            Command::Wait(Duration::from_millis(750)),
        ]);
        assert_eq!(script.type_count(), 2);
        assert_eq!(script.total_wait(), Duration::from_secs(1));
    }

    #[test]
    fn test_total_wait_saturates() {
        let huge = Duration::from_secs_f64(1e19);
        let script = Script::new(vec![
            Command::Wait(huge),
            Command::Wait(huge),
            Command::Type("x".to_string()),
        ]);
        assert_eq!(script.total_wait(), Duration::MAX);
    }
}
