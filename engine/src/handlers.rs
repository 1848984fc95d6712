//! Command handlers
//!
//! Wires config, credentials and the OpenAI clients into a scenario source
//! and a playback session.

use anyhow::{Context, Result};
use sdk::errors::EngineError;
use sdk::types::Scenario;
use std::sync::Arc;

use crate::config::Config;
use crate::input::{KeyBindings, TerminalKeyReader};
use crate::llm::openai::OpenAIProvider;
use crate::playback::CommandPlayer;
use crate::scenario::{LlmScenarioSource, ScenarioSource};
use crate::secrets::resolve_api_key;
use crate::session::{Peripherals, Session, SessionOutcome, SessionSettings, TerminalDisplay};
use crate::shutdown::ShutdownSignal;
use crate::speech::OpenAISpeech;

/// Generate a dialogue for `topic` and play it
pub async fn handle_session(topic: &str, config: &Config, shutdown: ShutdownSignal) -> Result<()> {
    let api_key = resolve_api_key()?;

    let provider = Arc::new(OpenAIProvider::new(config.llm.clone(), api_key.clone()));
    let source = LlmScenarioSource::new(
        provider,
        config.language.clone(),
        config.llm.max_turns,
        config.speech.default_voice.clone(),
    );

    tracing::info!("Generating scenario for '{}'", topic);
    let scenario = tokio::select! {
        scenario = source.generate(topic) => scenario?,
        _ = shutdown.wait() => {
            println!("Exiting repeat-chat");
            return Ok(());
        }
    };

    print_scenario(&scenario);

    let synthesizer = Arc::new(OpenAISpeech::new(config.speech.clone(), api_key));
    let peripherals = Peripherals {
        player: Box::new(CommandPlayer::from_config(&config.playback)),
        keys: Box::new(TerminalKeyReader::new(
            KeyBindings::from_config(&config.keys),
            shutdown.clone(),
        )),
        display: Box::new(TerminalDisplay::stdout()),
    };

    let session = Session::new(
        &scenario,
        synthesizer,
        peripherals,
        shutdown,
        SessionSettings::from_config(config),
    )
    .context("Failed to prepare session")?;

    match session.run().await {
        SessionOutcome::Completed => println!("--------\nEnd of conversation."),
        SessionOutcome::Interrupted => {}
    }

    Ok(())
}

fn print_scenario(scenario: &Scenario) {
    println!("scene: {}", scenario.scene);
    println!("role A: {}", scenario.roles.a);
    println!("role B: {}", scenario.roles.b);
    tracing::debug!(
        "Voices: A={}, B={}; {} turn(s)",
        scenario.voices.a,
        scenario.voices.b,
        scenario.script.len()
    );
}

/// Hint for a failed run, if the failure came from the engine
pub fn failure_hint(err: &anyhow::Error) -> Option<&str> {
    use sdk::errors::ChatErrorExt;

    err.chain()
        .find_map(|cause| cause.downcast_ref::<EngineError>())
        .map(|engine_err| engine_err.user_hint())
}
