//! Pause key input
//!
//! At every pause the operator answers with exactly one of two keys: repeat
//! the sentence or advance. `TerminalKeyReader` reads single raw keypresses
//! with crossterm and ignores everything else.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use sdk::errors::EngineError;
use std::time::Duration;

use crate::config::KeysConfig;
use crate::shutdown::ShutdownSignal;

/// How often the blocking reader wakes up to check for shutdown
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The operator's answer at a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKey {
    Repeat,
    Advance,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Interrupted")]
    Interrupted,

    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("Key reader task failed: {0}")]
    Task(String),
}

impl From<InputError> for EngineError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::Interrupted => EngineError::Interrupted,
            other => EngineError::Input(other.to_string()),
        }
    }
}

/// Blocks until the operator presses a qualifying key
#[async_trait]
pub trait KeyReader: Send {
    async fn read_key(&mut self) -> Result<PauseKey, InputError>;
}

/// What a raw keypress means at a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Pause(PauseKey),
    Interrupt,
}

/// The two accepted keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub repeat: char,
    pub advance: char,
}

impl KeyBindings {
    pub fn from_config(config: &KeysConfig) -> Self {
        Self {
            repeat: config.repeat,
            advance: config.advance,
        }
    }

    /// Map a keypress to its meaning; `None` for keys that must be ignored
    pub fn classify(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<KeyPress> {
        if modifiers.contains(KeyModifiers::CONTROL)
            && matches!(code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Some(KeyPress::Interrupt);
        }

        if matches_key(self.repeat, code) {
            Some(KeyPress::Pause(PauseKey::Repeat))
        } else if matches_key(self.advance, code) {
            Some(KeyPress::Pause(PauseKey::Advance))
        } else {
            None
        }
    }

    /// Extended prompt shown at the first pause of a session
    pub fn hint(&self) -> String {
        format!(
            "[press {} to repeat, {} for next]> ",
            key_name(self.repeat),
            key_name(self.advance)
        )
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_config(&KeysConfig::default())
    }
}

fn matches_key(binding: char, code: KeyCode) -> bool {
    match binding {
        '\n' | '\r' => code == KeyCode::Enter,
        '\t' => code == KeyCode::Tab,
        c => code == KeyCode::Char(c),
    }
}

fn key_name(key: char) -> String {
    match key {
        ' ' => "space".to_string(),
        '\n' | '\r' => "enter".to_string(),
        '\t' => "tab".to_string(),
        c => c.to_string(),
    }
}

/// Reads raw keypresses from the controlling terminal
pub struct TerminalKeyReader {
    bindings: KeyBindings,
    shutdown: ShutdownSignal,
}

impl TerminalKeyReader {
    pub fn new(bindings: KeyBindings, shutdown: ShutdownSignal) -> Self {
        Self { bindings, shutdown }
    }
}

#[async_trait]
impl KeyReader for TerminalKeyReader {
    async fn read_key(&mut self) -> Result<PauseKey, InputError> {
        let bindings = self.bindings;
        let shutdown = self.shutdown.clone();

        tokio::task::spawn_blocking(move || read_key_blocking(bindings, &shutdown))
            .await
            .map_err(|e| InputError::Task(e.to_string()))?
    }
}

/// Restores cooked mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

fn read_key_blocking(
    bindings: KeyBindings,
    shutdown: &ShutdownSignal,
) -> Result<PauseKey, InputError> {
    let _raw = RawModeGuard::enable()?;

    loop {
        if shutdown.is_triggered() {
            return Err(InputError::Interrupted);
        }

        if !event::poll(READ_POLL_INTERVAL)? {
            continue;
        }

        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => continue,
        };

        match bindings.classify(key.code, key.modifiers) {
            Some(KeyPress::Pause(pause_key)) => return Ok(pause_key),
            Some(KeyPress::Interrupt) => {
                shutdown.trigger();
                return Err(InputError::Interrupted);
            }
            None => tracing::trace!("Ignoring key {:?}", key.code),
        }
    }
}
