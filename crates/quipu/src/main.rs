//! Quipu CLI binary.

use anyhow::Result;
use quipu::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the quipu CLI.
///
/// Playback is sequential and I/O bound, so the current_thread runtime is
/// enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; the PTY owns stdout during playback.
    // Example: RUST_LOG=quipu=debug quipu play demo.quipu 2>quipu.log
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quipu=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting quipu CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Quipu CLI completed successfully");
    Ok(())
}
