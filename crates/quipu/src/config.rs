//! Configuration management for quipu.
//!
//! Configuration is an optional YAML file with session defaults. It is
//! looked up in this order:
//!
//! 1. The path given with `--config` (must exist)
//! 2. `quipu.yaml` in the current directory
//! 3. `$XDG_CONFIG_HOME/quipu/config.yaml`, or `~/.config/quipu/config.yaml`
//!
//! When no file is found, built-in defaults apply.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::{PlaybackConfig, SessionSettings};
use crate::error::{Error, Result};
use crate::pty::{DEFAULT_TERM, PtyOptions};

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "quipu.yaml";

/// Name of the configuration file inside the user config directory.
pub const USER_CONFIG_FILE_NAME: &str = "config.yaml";

/// Shell used when neither flags, script, config nor `$SHELL` name one.
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Terminal size used when none is requested and none can be detected.
pub const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Configuration file structure for quipu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QuipuConfig {
    /// Shell to spawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// `TERM` exported to the shell.
    pub term: String,

    /// Initial seconds between keystrokes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Initial jitter fraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,

    /// Terminal columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,

    /// Terminal rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
}

impl Default for QuipuConfig {
    fn default() -> Self {
        Self {
            shell: None,
            term: DEFAULT_TERM.to_string(),
            speed: None,
            jitter: None,
            cols: None,
            rows: None,
        }
    }
}

impl QuipuConfig {
    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// holds out-of-range values.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Find and load the configuration.
    ///
    /// An explicit path must exist; discovered locations are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any found file
    /// fails to load.
    pub async fn discover(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !fs::try_exists(path).await? {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path).await;
        }

        for candidate in candidate_paths(working_dir) {
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                return Self::load(&candidate).await;
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Reject values no session could use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if let Some(speed) = self.speed.filter(|s| !(s.is_finite() && *s >= 0.0)) {
            return Err(Error::Config(format!(
                "speed must be a non-negative number, got {speed}"
            )));
        }
        if let Some(jitter) = self.jitter.filter(|j| !(0.0..=1.0).contains(j)) {
            return Err(Error::Config(format!(
                "jitter must be between 0.0 and 1.0, got {jitter}"
            )));
        }
        if self.cols == Some(0) || self.rows == Some(0) {
            return Err(Error::Config(
                "cols and rows must be greater than zero".to_string(),
            ));
        }
        if self.shell.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(Error::Config("shell must not be empty".to_string()));
        }
        Ok(())
    }

    /// Initial playback timing from the config, over built-in defaults.
    pub fn playback(&self) -> PlaybackConfig {
        let defaults = PlaybackConfig::default();
        PlaybackConfig {
            speed: self.speed.unwrap_or(defaults.speed),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        }
    }
}

fn candidate_paths(working_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![working_dir.join(CONFIG_FILE_NAME)];
    if let Some(dir) = user_config_dir() {
        paths.push(dir.join("quipu").join(USER_CONFIG_FILE_NAME));
    }
    paths
}

fn user_config_dir() -> Option<PathBuf> {
    match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(".config")),
    }
}

/// Session values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOverrides {
    /// `--shell`
    pub shell: Option<String>,
    /// `--cols`
    pub cols: Option<u16>,
    /// `--rows`
    pub rows: Option<u16>,
}

/// Resolve the PTY session.
///
/// Each value comes from the first source that sets it: command line,
/// script directives, config file, environment (`$SHELL`, detected
/// terminal size), then built-in fallbacks.
pub fn resolve_session(
    overrides: &SessionOverrides,
    script: &SessionSettings,
    config: &QuipuConfig,
) -> PtyOptions {
    let shell = overrides
        .shell
        .clone()
        .or_else(|| script.shell.clone())
        .or_else(|| config.shell.clone())
        .or_else(|| env::var("SHELL").ok().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| FALLBACK_SHELL.to_string());

    let (detected_cols, detected_rows) = detected_size().unwrap_or(FALLBACK_SIZE);
    let cols = overrides
        .cols
        .or(script.size.map(|(cols, _)| cols))
        .or(config.cols)
        .unwrap_or(detected_cols);
    let rows = overrides
        .rows
        .or(script.size.map(|(_, rows)| rows))
        .or(config.rows)
        .unwrap_or(detected_rows);

    PtyOptions {
        shell,
        cols,
        rows,
        term: config.term.clone(),
    }
}

fn detected_size() -> Option<(u16, u16)> {
    terminal_size::terminal_size()
        .map(|(w, h)| (w.0, h.0))
        .filter(|&(cols, rows)| cols > 0 && rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        let config = QuipuConfig {
            shell: Some("/bin/zsh".to_string()),
            speed: Some(0.05),
            cols: Some(100),
            ..QuipuConfig::default()
        };
        config.save(&path).await.unwrap();

        let loaded = QuipuConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "jitter: 0.25\n").unwrap();

        let loaded = QuipuConfig::load(&path).await.unwrap();
        assert_eq!(loaded.term, DEFAULT_TERM);
        assert_eq!(loaded.jitter, Some(0.25));
        assert!(loaded.shell.is_none());
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "speeed: 0.1\n").unwrap();

        let err = QuipuConfig::load(&path).await.unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "unexpected: {err}");
    }

    #[tokio::test]
    async fn test_load_rejects_out_of_range_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "jitter: 2.0\n").unwrap();

        let err = QuipuConfig::load(&path).await.unwrap_err().to_string();
        assert!(err.contains("jitter"));
    }

    #[tokio::test]
    async fn test_discover_prefers_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "rows: 33\n").unwrap();

        let config = QuipuConfig::discover(None, temp_dir.path()).await.unwrap();
        assert_eq!(config.rows, Some(33));
    }

    #[tokio::test]
    async fn test_discover_missing_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.yaml");

        let err = QuipuConfig::discover(Some(&missing), temp_dir.path())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn test_playback_from_config() {
        let config = QuipuConfig {
            speed: Some(0.02),
            ..QuipuConfig::default()
        };
        let playback = config.playback();
        assert!((playback.speed - 0.02).abs() < f64::EPSILON);
        assert!(playback.jitter.abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_session_precedence() {
        let config = QuipuConfig {
            shell: Some("/from/config".to_string()),
            cols: Some(70),
            rows: Some(20),
            ..QuipuConfig::default()
        };
        let script = SessionSettings {
            shell: Some("/from/script".to_string()),
            size: Some((90, 30)),
        };

        let session = resolve_session(&SessionOverrides::default(), &script, &config);
        assert_eq!(session.shell, "/from/script");
        assert_eq!((session.cols, session.rows), (90, 30));

        let overrides = SessionOverrides {
            shell: Some("/from/flag".to_string()),
            cols: Some(132),
            rows: None,
        };
        let session = resolve_session(&overrides, &script, &config);
        assert_eq!(session.shell, "/from/flag");
        assert_eq!((session.cols, session.rows), (132, 30));

        let session = resolve_session(
            &SessionOverrides::default(),
            &SessionSettings::default(),
            &config,
        );
        assert_eq!(session.shell, "/from/config");
        assert_eq!((session.cols, session.rows), (70, 20));
        assert_eq!(session.term, DEFAULT_TERM);
    }
}
