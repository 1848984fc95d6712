//! API key handling
//!
//! The OpenAI key is read from `OPENAI_API_KEY`. When the variable is unset the
//! user is prompted once on stderr, like a first-run setup. The key is held in a
//! `SecretString` so it never reaches logs, and `scrub` strips key-shaped text
//! from error messages before they are shown.

use regex::Regex;
use sdk::errors::EngineError;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::OnceLock;

/// Environment variable holding the OpenAI API key
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// A wrapper for sensitive string data that prevents accidental logging.
///
/// `Debug` and `Display` always print `[REDACTED]`; use `unsecure()` to reach
/// the raw value when building a request header.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Access the raw underlying string
    pub fn unsecure(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Regex patterns for detecting API keys, compiled once.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            // OpenAI API keys, including sk-proj- style variants
            Regex::new(r"sk-[a-zA-Z0-9\-_]{20,}").expect("Invalid OpenAI pattern"),
            // Bearer tokens echoed back in error bodies
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Resolve the API key from the environment, prompting on stderr if it is absent
pub fn resolve_api_key() -> Result<SecretString, EngineError> {
    match std::env::var(API_KEY_ENV_VAR) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", API_KEY_ENV_VAR);
            Ok(SecretString::new(key.trim()))
        }
        _ => {
            tracing::info!("{} not set, prompting user", API_KEY_ENV_VAR);
            let stdin = io::stdin();
            prompt_for_key(&mut stdin.lock(), &mut io::stderr())
        }
    }
}

/// Prompt for the key on `output` and read one line from `input`
fn prompt_for_key<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<SecretString, EngineError> {
    write!(output, "Enter your OpenAI API key: ")
        .and_then(|_| output.flush())
        .map_err(|e| EngineError::Secret(format!("Failed to write prompt: {}", e)))?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| EngineError::Secret(format!("Failed to read input: {}", e)))?;

    let key = line.trim();
    if key.is_empty() {
        return Err(EngineError::Secret("API key cannot be empty".to_string()));
    }

    Ok(SecretString::new(key))
}

/// Replace API keys and bearer tokens in `text` with `[REDACTED]`
///
/// # Examples
/// ```
/// use repeat_chat::secrets::scrub;
///
/// let scrubbed = scrub("My API key is sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "My API key is [REDACTED]");
/// ```
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}
