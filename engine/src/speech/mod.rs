//! Speech synthesis
//!
//! One request per sentence, one attempt each. A failure here never stops a
//! session: the caller logs it and the sentence plays silently.

use async_trait::async_trait;
use sdk::errors::EngineError;

pub mod openai;

pub use openai::OpenAISpeech;

/// Errors from a synthesis request
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Speech endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Empty audio response")]
    EmptyAudio,
}

impl From<SpeechError> for EngineError {
    fn from(err: SpeechError) -> Self {
        EngineError::Speech(crate::secrets::scrub(&err.to_string()))
    }
}

/// Turns text into encoded audio bytes
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError>;
}
