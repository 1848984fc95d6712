use super::{SpeechError, SpeechSynthesizer};
use crate::config::SpeechConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Client for the `/audio/speech` endpoint
pub struct OpenAISpeech {
    config: SpeechConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAISpeech {
    pub fn new(config: SpeechConfig, api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            api_key,
            client,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
        let url = format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'));

        let payload = json!({
            "model": self.config.model,
            "voice": voice,
            "input": text,
        });

        tracing::debug!("Synthesizing {} chars with voice {}", text.len(), voice);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .json(&payload)
            .send()
            .await
            .map_err(|e| SpeechError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Request(e.to_string()))?;

        if bytes.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        Ok(bytes.to_vec())
    }
}
