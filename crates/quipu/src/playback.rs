//! Playback engine for quipu scripts.
//!
//! Executes parsed commands with human-like timing: every keystroke is
//! followed by a delay of `speed` seconds, varied by `jitter`. Escape
//! sequences are sent atomically so the receiving terminal never sees half a
//! key.

use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::{Command, PlaybackConfig, Script};
use crate::error::Result;

/// Destination for keystrokes.
pub trait KeystrokeSink {
    /// Deliver one keystroke unit (a character or a whole escape sequence).
    ///
    /// # Errors
    ///
    /// Returns an error if the keystroke cannot be delivered.
    fn send(&mut self, keys: &str) -> Result<()>;
}

impl<S: KeystrokeSink + ?Sized> KeystrokeSink for &mut S {
    fn send(&mut self, keys: &str) -> Result<()> {
        (**self).send(keys)
    }
}

/// Collects keystrokes in memory.
impl KeystrokeSink for Vec<String> {
    fn send(&mut self, keys: &str) -> Result<()> {
        self.push(keys.to_string());
        Ok(())
    }
}

/// Cloneable handle that stops a running playback.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    /// Create a handle in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Ask playback to stop after the current keystroke.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether playback may continue.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// What a playback run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    /// Commands fully executed.
    pub commands: usize,
    /// Keystroke units delivered to the sink.
    pub keystrokes: usize,
    /// Whether the run ended because of a stop request.
    pub stopped: bool,
}

/// Length in bytes of the escape sequence starting at `text[0]`.
///
/// `text` must start with ESC. CSI sequences (`ESC [`) run through any
/// digits and `;` to one final character; SS3 sequences (`ESC O`) take one
/// more character; a doubled ESC (Alt on an escape sequence) covers the
/// whole inner sequence; any other ESC pairs with the following character.
fn escape_sequence_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes.first(), Some(&0x1b));

    let char_end = |from: usize| -> usize {
        text[from..]
            .chars()
            .next()
            .map_or(text.len(), |c| from + c.len_utf8())
    };

    match bytes.get(1) {
        None => 1,
        Some(b'[') => {
            let mut i = 2;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b';') {
                i += 1;
            }
            if i < bytes.len() { char_end(i) } else { bytes.len() }
        }
        Some(b'O') if bytes.len() > 2 => char_end(2),
        Some(b'O') => bytes.len(),
        Some(0x1b) => 1 + escape_sequence_len(&text[1..]),
        Some(_) => char_end(1),
    }
}

/// Split typed text into the units sent as single keystrokes.
pub fn keystrokes(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        let len = if ch == '\x1b' {
            escape_sequence_len(rest)
        } else {
            ch.len_utf8()
        };
        let (unit, tail) = rest.split_at(len);
        units.push(unit);
        rest = tail;
    }

    units
}

/// Delay after a keystroke.
///
/// With a base of `speed` seconds and a spread of `base * jitter`, the delay
/// is uniform in `[base - spread, base + spread]` (never below zero).
pub fn keystroke_delay<R: Rng>(config: &PlaybackConfig, rng: &mut R) -> Duration {
    let base_ms = (config.speed * 1000.0) as u64;
    let jitter_ms = (base_ms as f64 * config.jitter) as u64;

    if jitter_ms > 0 {
        let variation = rng.random_range(0..=jitter_ms.saturating_mul(2));
        Duration::from_millis(base_ms.saturating_add(variation).saturating_sub(jitter_ms))
    } else {
        Duration::from_millis(base_ms)
    }
}

/// Runs scripts against a [`KeystrokeSink`].
pub struct PlaybackEngine<S> {
    sink: S,
    config: PlaybackConfig,
    stop: StopHandle,
    delays: bool,
}

impl<S> std::fmt::Debug for PlaybackEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("config", &self.config)
            .field("running", &self.stop.is_running())
            .field("delays", &self.delays)
            .finish_non_exhaustive()
    }
}

impl<S: KeystrokeSink> PlaybackEngine<S> {
    /// Create an engine with the default playback config.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            config: PlaybackConfig::default(),
            stop: StopHandle::new(),
            delays: true,
        }
    }

    /// Start from `config` instead of the default.
    #[must_use]
    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Skip keystroke delays and waits.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.delays = false;
        self
    }

    /// Share an existing stop handle, e.g. one already wired to a signal.
    #[must_use]
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that stops this engine from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current playback config.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Give the sink back.
    pub fn into_sink(self) -> S {
        self.sink
    }

    async fn pause(&self, duration: Duration) {
        if self.delays && !duration.is_zero() {
            sleep(duration).await;
        }
    }

    async fn type_text(&mut self, text: &str, summary: &mut PlaybackSummary) -> Result<bool> {
        for unit in keystrokes(text) {
            if !self.stop.is_running() {
                return Ok(false);
            }

            self.sink.send(unit)?;
            summary.keystrokes += 1;

            if self.delays {
                let delay = keystroke_delay(&self.config, &mut rand::rng());
                self.pause(delay).await;
            }
        }
        Ok(true)
    }

    async fn execute_command(
        &mut self,
        command: &Command,
        summary: &mut PlaybackSummary,
    ) -> Result<bool> {
        tracing::trace!(?command, "Executing command");
        match command {
            Command::SetSpeed(speed) => self.config.speed = *speed,
            Command::SetJitter(jitter) => self.config.jitter = *jitter,
            Command::Wait(duration) => self.pause(*duration).await,
            // Consumed before the session starts.
            Command::SetShell(_) | Command::SetSize(_, _) => {}
            Command::Type(text) => return self.type_text(text, summary).await,
        }
        Ok(true)
    }

    /// Execute every command in order.
    ///
    /// Stops early, without error, once the [`StopHandle`] is triggered.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the sink.
    pub async fn execute(&mut self, script: &Script) -> Result<PlaybackSummary> {
        let mut summary = PlaybackSummary::default();

        for command in &script.commands {
            if !self.stop.is_running() {
                summary.stopped = true;
                break;
            }

            if !self.execute_command(command, &mut summary).await? {
                summary.stopped = true;
                break;
            }
            summary.commands += 1;
        }

        tracing::debug!(
            commands = summary.commands,
            keystrokes = summary.keystrokes,
            stopped = summary.stopped,
            "Playback finished"
        );
        Ok(summary)
    }
}
