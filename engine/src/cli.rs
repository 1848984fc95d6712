//! CLI interface for repeat-chat
//!
//! The only input is an optional scene. Everything else comes from the config
//! file (see `REPEAT_CHAT_CONFIG`).

use clap::Parser;

use crate::scenario::DEFAULT_TOPIC;

/// Listen-and-repeat conversation practice
///
/// Generates a short two-person dialogue for the given scene and plays it one
/// sentence at a time. Press space to hear a sentence again, enter to move on,
/// Ctrl-C to quit.
#[derive(Parser, Debug)]
#[command(name = "repeat-chat")]
#[command(long_about = None)]
pub struct Cli {
    /// Scene for the conversation (default: "at a café")
    #[arg(value_name = "TOPIC")]
    pub topic: Option<String>,
}

impl Cli {
    /// The requested scene, falling back to the default one
    pub fn topic(&self) -> &str {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .unwrap_or(DEFAULT_TOPIC)
    }
}
