//! PTY management for playback.
//!
//! Spawns the shell inside a pseudo-terminal, mirrors its output to our
//! stdout, and accepts keystrokes through [`KeystrokeSink`].

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use portable_pty::{Child, ChildKiller, CommandBuilder, PtySize, native_pty_system};
use std::io::{IsTerminal, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::playback::KeystrokeSink;

/// Default `TERM` for the spawned shell.
pub const DEFAULT_TERM: &str = "xterm-256color";

/// Time given to the outer terminal to answer queries before shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// How long the shell gets to exit on EOF before it is killed.
const EXIT_TIMEOUT: Duration = Duration::from_millis(500);

/// How long to wait for the output thread once the shell is gone.
const READER_TIMEOUT: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const READ_BUFFER_SIZE: usize = 8192;

/// Terminal raw mode, enabled only while stdout is a TTY.
struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    fn new() -> Result<Self> {
        let enabled = if std::io::stdout().is_terminal() {
            enable_raw_mode().map_err(|e| Error::Pty(format!("Failed to enable raw mode: {e}")))?;
            true
        } else {
            false
        };
        Ok(Self { enabled })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            let _ = disable_raw_mode();
        }
    }
}

/// Settings for the PTY session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyOptions {
    /// Shell program to spawn.
    pub shell: String,
    /// Terminal columns.
    pub cols: u16,
    /// Terminal rows.
    pub rows: u16,
    /// `TERM` exported to the shell.
    pub term: String,
}

/// A shell running in a pseudo-terminal.
///
/// Dropping the manager closes the shell's input, waits for its output to
/// drain, and restores the terminal.
pub struct PtyManager {
    writer: Option<Box<dyn Write + Send>>,
    reader_thread: Option<thread::JoinHandle<()>>,
    child: Box<dyn Child + Send + Sync>,
    // Dropped last so output is flushed before the terminal is restored.
    _raw_mode_guard: RawModeGuard,
}

impl std::fmt::Debug for PtyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyManager")
            .field("open", &self.writer.is_some())
            .field("pid", &self.child.process_id())
            .finish_non_exhaustive()
    }
}

impl PtyManager {
    /// Spawn `options.shell` in a new PTY.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pty`] if raw mode, the PTY, or the shell cannot be
    /// set up.
    pub fn spawn(options: &PtyOptions) -> Result<Self> {
        // Raw mode first, so escape sequences pass through untouched.
        let raw_mode_guard = RawModeGuard::new()?;

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: options.rows,
                cols: options.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| Error::Pty(format!("Failed to create PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&options.shell);
        cmd.env("TERM", &options.term);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| Error::Pty(format!("Failed to spawn '{}' in PTY: {e}", options.shell)))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| Error::Pty(format!("Failed to get PTY reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| Error::Pty(format!("Failed to get PTY writer: {e}")))?;

        let reader_thread = thread::spawn(move || forward_output(reader));

        tracing::debug!(
            shell = %options.shell,
            cols = options.cols,
            rows = options.rows,
            pid = ?child.process_id(),
            "Spawned shell in PTY"
        );

        Ok(Self {
            writer: Some(writer),
            reader_thread: Some(reader_thread),
            child,
            _raw_mode_guard: raw_mode_guard,
        })
    }

    /// Write raw bytes to the shell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pty`] if the writer is closed or the write fails.
    pub fn write(&mut self, data: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Pty("PTY writer has been closed".to_string()))?;
        writer
            .write_all(data.as_bytes())
            .map_err(|e| Error::Pty(format!("Failed to write to PTY: {e}")))?;
        writer
            .flush()
            .map_err(|e| Error::Pty(format!("Failed to flush PTY: {e}")))?;
        Ok(())
    }
}

impl KeystrokeSink for PtyManager {
    fn send(&mut self, keys: &str) -> Result<()> {
        self.write(keys)
    }
}

/// Copy PTY output to stdout until either side closes.
fn forward_output(mut reader: Box<dyn Read + Send>) {
    let mut stdout = std::io::stdout();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if stdout.write_all(&buffer[..n]).is_err() || stdout.flush().is_err() {
                    break;
                }
            }
        }
    }
}

impl PtyManager {
    /// Wait for the shell to exit on its own, killing it after `timeout`.
    fn reap_child(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(?status, "Shell exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Ok(None) | Err(_) => break,
            }
        }

        tracing::debug!("Shell still running after EOF, killing it");
        if let Err(e) = self.child.kill() {
            tracing::warn!(error = %e, "Failed to kill shell");
        }
        let _ = self.child.wait();
    }

    /// Join the output thread, giving up after `timeout`.
    ///
    /// A process that inherited the PTY can keep the reader blocked; the
    /// thread is then left to end with the process.
    fn join_reader(&mut self, timeout: Duration) {
        let Some(handle) = self.reader_thread.take() else {
            return;
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            tracing::warn!("PTY output still open after shutdown, detaching reader");
        }
    }
}

impl Drop for PtyManager {
    fn drop(&mut self) {
        // Closing the writer signals EOF to the shell.
        drop(self.writer.take());

        self.reap_child(EXIT_TIMEOUT);

        // Output must reach stdout before raw mode is disabled.
        self.join_reader(READER_TIMEOUT);

        thread::sleep(SHUTDOWN_GRACE);

        // Swallow terminal query responses so they do not show up as
        // garbage after we exit.
        if std::io::stdin().is_terminal() {
            use crossterm::event::{poll, read};
            while poll(Duration::from_millis(0)).unwrap_or(false) {
                let _ = read();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_options() -> PtyOptions {
        PtyOptions {
            shell: "/bin/sh".to_string(),
            cols: 80,
            rows: 24,
            term: DEFAULT_TERM.to_string(),
        }
    }

    #[test]
    fn test_spawn_write_and_exit() {
        let mut pty = PtyManager::spawn(&sh_options()).unwrap();
        pty.write("echo quipu\r").unwrap();
        KeystrokeSink::send(&mut pty, "exit\r").unwrap();

        let started = Instant::now();
        drop(pty);
        assert!(started.elapsed() < EXIT_TIMEOUT + READER_TIMEOUT + Duration::from_secs(1));
    }

    #[test]
    fn test_drop_kills_shell_that_ignores_eof() {
        let mut pty = PtyManager::spawn(&sh_options()).unwrap();
        // Keeps the shell busy, so EOF on its input is never read.
        pty.write("sleep 30\r").unwrap();
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        drop(pty);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_spawn_missing_shell_is_pty_error() {
        let options = PtyOptions {
            shell: "/nonexistent/shell".to_string(),
            ..sh_options()
        };
        match PtyManager::spawn(&options) {
            Err(Error::Pty(message)) => assert!(message.contains("/nonexistent/shell")),
            Err(other) => panic!("expected a PTY error, got {other}"),
            Ok(_) => panic!("spawning a missing shell should fail"),
        }
    }
}
