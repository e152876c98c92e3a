//! Implementation of the `init` command.
//!
//! Writes a starter `quipu.yaml` holding the built-in defaults, so users
//! have something to edit.

use crate::config::{CONFIG_FILE_NAME, QuipuConfig};
use crate::domain::{DEFAULT_JITTER, DEFAULT_SPEED};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

const HEADER: &str = "\
# quipu configuration
#
# Values here are defaults; '@' directives in a script and command-line
# flags take precedence.
";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the written config file
    pub config_file: PathBuf,
    /// Whether an existing file was replaced
    pub overwritten: bool,
}

/// Configuration written by `quipu init`.
pub fn starter_config() -> QuipuConfig {
    QuipuConfig {
        speed: Some(DEFAULT_SPEED),
        jitter: Some(DEFAULT_JITTER),
        ..QuipuConfig::default()
    }
}

/// Write a starter config file into `base_dir`.
///
/// # Errors
///
/// Returns an error if the file already exists and `force` is not set, or
/// if writing fails.
pub async fn init(base_dir: &Path, force: bool) -> Result<InitResult> {
    let config_file = base_dir.join(CONFIG_FILE_NAME);
    let exists = fs::try_exists(&config_file).await?;

    if exists && !force {
        return Err(Error::Config(format!(
            "'{}' already exists. Use --force to overwrite it",
            config_file.display()
        )));
    }

    let body = serde_yaml::to_string(&starter_config())
        .map_err(|e| Error::Config(format!("YAML error: {e}")))?;
    fs::write(&config_file, format!("{HEADER}{body}")).await?;

    tracing::debug!(path = %config_file.display(), overwritten = exists, "Wrote config");
    Ok(InitResult {
        config_file,
        overwritten: exists,
    })
}
