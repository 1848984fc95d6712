//! Error types and handling
//!
//! This module provides the error types used throughout the repeat-chat engine.
//! All errors implement the `ChatErrorExt` trait which provides user-friendly
//! hints and indicates whether the session can carry on after them.
//!
//! # Propagation
//!
//! Only errors raised before playback starts (configuration, secrets, a
//! malformed scenario) end the program. Everything raised while a session is
//! running is absorbed where it happens and logged.

use thiserror::Error;

/// Trait for repeat-chat error extensions
pub trait ChatErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display and never contains API keys.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are absorbed by the running session. Non-recoverable
    /// errors abort before any playback happens.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{ChatErrorExt, EngineError};
///
/// let error = EngineError::ScenarioParse("missing Scene line".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
///
/// let transient = EngineError::Speech("timeout".to_string());
/// assert!(transient.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Scenario errors
    #[error("Failed to parse scenario: {0}")]
    ScenarioParse(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Speech synthesis errors
    #[error("Speech synthesis failed: {0}")]
    Speech(String),

    // Playback errors
    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Invalid audio resource: {0:?}")]
    InvalidResource(std::path::PathBuf),

    // Terminal input errors
    #[error("Input error: {0}")]
    Input(String),

    #[error("Interrupted")]
    Interrupted,

    // Secret errors
    #[error("Secret error: {0}")]
    Secret(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::ScenarioParse(_) => "The model returned an unexpected script. Try again",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API key and network",
            Self::Speech(_) => "Speech synthesis failed. The sentence will play silently",
            Self::Playback(_) => "Audio player failed. Check the configured player program",
            Self::InvalidResource(_) => "Audio for this sentence is missing. Skipping it",
            Self::Input(_) => "Could not read from the terminal",
            Self::Interrupted => "Session interrupted",
            Self::Secret(_) => "Set OPENAI_API_KEY or enter the key when prompted",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::ScenarioParse(_) | Self::Secret(_) | Self::Input(_) => false,

            // All other errors are absorbed by the session
            _ => true,
        }
    }
}
