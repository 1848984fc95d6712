//! Dialogue playback session
//!
//! A session turns a parsed scenario into sound and text. Turns are compiled
//! into commands by `TurnCompiler`, one turn ahead, on a background task
//! driven by `PrefetchScheduler`. The `CommandExecutor` runs those commands
//! on the foreground and waits for the operator at every sentence.
//!
//! Every audio file is registered with a `CleanupRegistry` before anything can
//! refer to it, and the registry is swept when the session ends however it
//! ends.

pub mod cleanup;
pub mod command;
pub mod compiler;
pub mod display;
pub mod executor;
pub mod prefetch;
pub mod queue;

pub use cleanup::CleanupRegistry;
pub use command::{Command, CompiledBatch, Speak};
pub use compiler::TurnCompiler;
pub use display::{DialogueDisplay, TerminalDisplay};
pub use executor::{CommandExecutor, ExecutorSettings, PauseState, Peripherals, SessionOutcome};
pub use prefetch::PrefetchScheduler;
pub use queue::CommandQueue;

use sdk::errors::EngineError;
use sdk::types::Scenario;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::input::KeyBindings;
use crate::shutdown::ShutdownSignal;
use crate::speech::SpeechSynthesizer;

/// Session tuning taken from config
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Parent of the per-run scratch directory
    pub scratch_root: PathBuf,
    pub low_water_mark: usize,
    pub min_audio_bytes: u64,
    pub poll_interval: Duration,
    pub first_prompt: String,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scratch_root: config.core.scratch_dir.clone(),
            low_water_mark: config.playback.low_water_mark,
            min_audio_bytes: config.playback.min_audio_bytes,
            poll_interval: Duration::from_millis(config.playback.poll_interval_ms),
            first_prompt: KeyBindings::from_config(&config.keys).hint(),
        }
    }
}

/// Sweeps the registry when dropped, so cancellation and panics clean up too
struct SweepOnDrop(Arc<CleanupRegistry>);

impl Drop for SweepOnDrop {
    fn drop(&mut self) {
        self.0.final_sweep();
    }
}

/// One playback of one scenario
pub struct Session {
    executor: CommandExecutor,
    registry: Arc<CleanupRegistry>,
    scratch_dir: PathBuf,
}

impl Session {
    /// Prepare a session. Creates a fresh scratch directory for its audio.
    pub fn new(
        scenario: &Scenario,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        peripherals: Peripherals,
        shutdown: ShutdownSignal,
        settings: SessionSettings,
    ) -> Result<Self, EngineError> {
        let scratch_dir = settings
            .scratch_root
            .join(format!("session-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&scratch_dir).map_err(|e| {
            EngineError::Config(format!(
                "Cannot create scratch directory {:?}: {}",
                scratch_dir, e
            ))
        })?;
        tracing::debug!("Scratch directory {:?}", scratch_dir);

        let registry = Arc::new(CleanupRegistry::with_scratch_dir(&scratch_dir));
        let compiler = Arc::new(TurnCompiler::new(
            synthesizer,
            registry.clone(),
            &scratch_dir,
        ));
        let scheduler = PrefetchScheduler::new(
            scenario.script.clone(),
            scenario.voices.clone(),
            compiler,
            settings.low_water_mark,
        );
        let executor = CommandExecutor::new(
            scheduler,
            registry.clone(),
            peripherals,
            shutdown,
            ExecutorSettings {
                min_audio_bytes: settings.min_audio_bytes,
                poll_interval: settings.poll_interval,
                first_prompt: settings.first_prompt,
            },
        );

        Ok(Self {
            executor,
            registry,
            scratch_dir,
        })
    }

    pub fn registry(&self) -> Arc<CleanupRegistry> {
        self.registry.clone()
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Play the scenario to the end or until interrupted, then sweep
    pub async fn run(mut self) -> SessionOutcome {
        let _sweep = SweepOnDrop(self.registry.clone());
        let outcome = self.executor.run().await;
        tracing::info!("Session ended: {:?}", outcome);
        outcome
    }
}
