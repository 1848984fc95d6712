//! Scenario generation
//!
//! Turns a free-text topic into a complete `Scenario` with one chat request.
//! This runs once, before the playback pipeline starts; a reply that does not
//! follow the script grammar is fatal.

use crate::config::LanguageConfig;
use crate::llm::{LLMProvider, Message};
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::Scenario;
use std::sync::Arc;

pub mod parser;

pub use parser::{parse_scenario, KNOWN_VOICES};

/// Topic used when none is given on the command line
pub const DEFAULT_TOPIC: &str = "at a café";

/// Source of dialogue scripts
#[async_trait]
pub trait ScenarioSource: Send + Sync {
    async fn generate(&self, topic: &str) -> Result<Scenario, EngineError>;
}

/// Writes the script with a chat model and parses the reply
pub struct LlmScenarioSource {
    provider: Arc<dyn LLMProvider>,
    language: LanguageConfig,
    max_turns: usize,
    default_voice: String,
}

impl LlmScenarioSource {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        language: LanguageConfig,
        max_turns: usize,
        default_voice: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            language,
            max_turns,
            default_voice: default_voice.into(),
        }
    }

    fn system_prompt(&self, topic: &str) -> String {
        format!(
            "Given the scene '{topic}', write a natural conversation between two roles.\n\
             The conversation is practice material for learners of {learner}.\n\
             The scene, role descriptions and spoken lines must be in {learner}. \
             Translations must be in {feedback}.\n\
             Write exactly {turns} lines, alternating A and B, starting with A. \
             Keep each line to one to three short sentences.\n\
             Separate the sentences inside a line with ' | ', and separate the sentences \
             of its translation the same way and in the same order.\n\
             Pick a voice for each role from: {voices}.\n\
             Output only this format:\n\
             Scene: <scene>\n\
             Role A: <description>\n\
             Role B: <description>\n\
             Voice A: <voice>\n\
             Voice B: <voice>\n\
             A: <line>\n\
             Translation: <translation>\n\
             B: <line>\n\
             Translation: <translation>\n",
            topic = topic,
            learner = self.language.learner,
            feedback = self.language.feedback,
            turns = self.max_turns,
            voices = KNOWN_VOICES.join(", "),
        )
    }
}

#[async_trait]
impl ScenarioSource for LlmScenarioSource {
    async fn generate(&self, topic: &str) -> Result<Scenario, EngineError> {
        tracing::info!(
            "Generating scenario for '{}' with {}",
            topic,
            self.provider.name()
        );

        let messages = vec![Message::system(self.system_prompt(topic))];
        let reply = self.provider.generate(&messages).await?;
        tracing::debug!("Scenario reply:\n{}", reply);

        let scenario = parse_scenario(&reply, &self.default_voice)?;
        tracing::info!(
            "Scenario '{}' has {} turns",
            scenario.scene,
            scenario.script.len()
        );

        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm;

    struct CannedProvider(String);

    #[async_trait]
    impl LLMProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _messages: &[Message]) -> llm::Result<String> {
            Ok(self.0.clone())
        }
    }

    fn source(reply: &str) -> LlmScenarioSource {
        LlmScenarioSource::new(
            Arc::new(CannedProvider(reply.to_string())),
            LanguageConfig::default(),
            4,
            "alloy",
        )
    }

    #[test]
    fn test_prompt_mentions_languages_and_turns() {
        let prompt = source("").system_prompt("at the airport");
        assert!(prompt.contains("at the airport"));
        assert!(prompt.contains("learners of English"));
        assert!(prompt.contains("Translations must be in Japanese"));
        assert!(prompt.contains("Write exactly 4 lines"));
        assert!(prompt.contains("shimmer"));
    }

    #[tokio::test]
    async fn test_generate_parses_reply() {
        let reply = "Scene: airport\nRole A: agent\nRole B: traveler\nVoice A: sage\nVoice B: onyx\nA: Passport, please.\nTranslation: パスポートをお願いします。\n";
        let scenario = source(reply).generate("airport").await.unwrap();

        assert_eq!(scenario.scene, "airport");
        assert_eq!(scenario.script.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_malformed_reply_is_fatal() {
        let err = source("Sorry, I can't help with that.")
            .generate("airport")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ScenarioParse(_)));
    }
}
