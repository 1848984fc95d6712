//! repeat-chat engine library
//!
//! Everything behind the `repeat-chat` binary: configuration, the OpenAI
//! clients, scenario parsing and the playback session. It is used by both the
//! binary and the integration tests.

/// Configuration management module
pub mod config;

/// API key handling
pub mod secrets;

/// Chat model client
pub mod llm;

/// Dialogue generation and parsing
pub mod scenario;

/// Text-to-speech client
pub mod speech;

/// Audio playback through an external player
pub mod playback;

/// Single-key terminal input
pub mod input;

/// Interrupt handling
pub mod shutdown;

/// The playback pipeline
pub mod session;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
