//! Configuration management
//!
//! This module handles loading, validation, and management of the repeat-chat
//! configuration. Configuration is stored in TOML format at
//! ~/.repeat-chat/config.toml, or wherever `REPEAT_CHAT_CONFIG` points.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, scratch directory for synthesized audio
//! - **language**: Language the learner practises and the translation language
//! - **llm**: Chat model used to write the dialogue
//! - **speech**: Speech model and default voice
//! - **playback**: Audio player program, prefetch low-water mark, poll interval
//! - **keys**: Repeat and advance keys used at each pause
//!
//! # Examples
//!
//! ```no_run
//! use repeat_chat::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Low-water mark: {}", config.playback.low_water_mark);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "REPEAT_CHAT_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Learner and feedback languages
    #[serde(default)]
    pub language: LanguageConfig,

    /// Chat model configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Playback pipeline configuration
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Pause key bindings
    #[serde(default)]
    pub keys: KeysConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding per-run scratch folders for synthesized audio (supports ~ expansion)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

/// Language configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language the dialogue is spoken in
    #[serde(default = "default_learner_language")]
    pub learner: String,

    /// Language the translations are written in
    #[serde(default = "default_feedback_language")]
    pub feedback: String,
}

/// Chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for the OpenAI-compatible API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens in the generated script
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Number of turns requested from the model
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    // Note: API key comes from OPENAI_API_KEY or an interactive prompt, not from config
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Base URL for the OpenAI-compatible API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Speech model name
    #[serde(default = "default_speech_model")]
    pub model: String,

    /// Voice used when the scenario names an unknown voice
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Request timeout in seconds
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

/// Playback pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// External program that plays an audio file
    #[serde(default = "default_player")]
    pub player: String,

    /// Arguments placed before the file path
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,

    /// Files smaller than this are treated as invalid and never played
    #[serde(default = "default_min_audio_bytes")]
    pub min_audio_bytes: u64,

    /// Queue length below which the next turn is prefetched
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,

    /// Idle wait between queue checks in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Pause key bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Key that replays the last sentence
    #[serde(default = "default_repeat_key")]
    pub repeat: char,

    /// Key that moves on to the next command (newline means Enter)
    #[serde(default = "default_advance_key")]
    pub advance: char,
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("repeat-chat")
}

fn default_learner_language() -> String {
    "English".to_string()
}

fn default_feedback_language() -> String {
    "Japanese".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    600
}

fn default_max_turns() -> usize {
    8
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_speech_timeout() -> u64 {
    10
}

fn default_player() -> String {
    if cfg!(target_os = "macos") {
        "afplay".to_string()
    } else {
        "mpg123".to_string()
    }
}

fn default_player_args() -> Vec<String> {
    if cfg!(target_os = "macos") {
        Vec::new()
    } else {
        vec!["-q".to_string()]
    }
}

fn default_min_audio_bytes() -> u64 {
    100
}

fn default_low_water_mark() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_repeat_key() -> char {
    ' '
}

fn default_advance_key() -> char {
    '\n'
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            learner: default_learner_language(),
            feedback: default_feedback_language(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_turns: default_max_turns(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_speech_model(),
            default_voice: default_voice(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            player_args: default_player_args(),
            min_audio_bytes: default_min_audio_bytes(),
            low_water_mark: default_low_water_mark(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            repeat: default_repeat_key(),
            advance: default_advance_key(),
        }
    }
}

impl Config {
    /// Load configuration from `REPEAT_CHAT_CONFIG` or the default location
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => PathBuf::from(path),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.repeat-chat/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".repeat-chat").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// Validates value ranges and key bindings and expands ~ in the scratch
    /// directory. The scratch directory itself is created by the session.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.max_turns == 0 {
            return Err(EngineError::Config(
                "max_turns must be at least 1".to_string(),
            ));
        }

        if self.playback.low_water_mark == 0 {
            return Err(EngineError::Config(
                "low_water_mark must be at least 1".to_string(),
            ));
        }

        if self.playback.player.trim().is_empty() {
            return Err(EngineError::Config(
                "playback.player must name a program".to_string(),
            ));
        }

        if normalize_key(self.keys.repeat) == normalize_key(self.keys.advance) {
            return Err(EngineError::Config(
                "keys.repeat and keys.advance must differ".to_string(),
            ));
        }

        self.core.scratch_dir = expand_path(&self.core.scratch_dir)?;

        Ok(())
    }
}

/// Treat carriage return and newline as the same Enter key
fn normalize_key(key: char) -> char {
    if key == '\r' {
        '\n'
    } else {
        key
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
