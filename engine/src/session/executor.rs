//! The foreground command loop
//!
//! Runs one command at a time, tops up the queue from the prefetch scheduler
//! and owns the pause state machine. Every point where it can block (idle
//! wait, playback, key read) also listens for the shutdown signal.

use sdk::errors::{ChatErrorExt, EngineError};
use sdk::types::Role;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::cleanup::CleanupRegistry;
use super::command::{Command, Speak};
use super::display::DialogueDisplay;
use super::prefetch::PrefetchScheduler;
use super::queue::CommandQueue;
use crate::input::{InputError, KeyReader, PauseKey};
use crate::playback::{validate_resource, AudioPlayer};
use crate::shutdown::ShutdownSignal;

/// Prompt shown at every pause after the first
pub const SHORT_PROMPT: &str = "> ";

/// Shown when the session is interrupted
pub const EXIT_NOTICE: &str = "Exiting repeat-chat";

/// Whether the executor is waiting on the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    Idle,
    AwaitingInput,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Interrupted,
}

/// Executor tuning
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub min_audio_bytes: u64,
    pub poll_interval: Duration,
    /// Prompt for the first pause of the session
    pub first_prompt: String,
}

/// I/O the executor drives
pub struct Peripherals {
    pub player: Box<dyn AudioPlayer>,
    pub keys: Box<dyn KeyReader>,
    pub display: Box<dyn DialogueDisplay>,
}

pub struct CommandExecutor {
    queue: CommandQueue,
    scheduler: PrefetchScheduler,
    registry: Arc<CleanupRegistry>,
    player: Box<dyn AudioPlayer>,
    keys: Box<dyn KeyReader>,
    display: Box<dyn DialogueDisplay>,
    shutdown: ShutdownSignal,
    settings: ExecutorSettings,
    state: PauseState,
    prompted: bool,
    current_role: Option<Role>,
}

impl CommandExecutor {
    pub fn new(
        scheduler: PrefetchScheduler,
        registry: Arc<CleanupRegistry>,
        peripherals: Peripherals,
        shutdown: ShutdownSignal,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            queue: CommandQueue::new(),
            scheduler,
            registry,
            player: peripherals.player,
            keys: peripherals.keys,
            display: peripherals.display,
            shutdown,
            settings,
            state: PauseState::Idle,
            prompted: false,
            current_role: None,
        }
    }

    /// Run until the script is exhausted or the session is interrupted
    pub async fn run(&mut self) -> SessionOutcome {
        loop {
            if self.shutdown.is_triggered() {
                return self.interrupt();
            }

            self.scheduler.maybe_prefetch(self.queue.len());

            if let Some(command) = self.queue.pop_front() {
                if self.execute(command).await == Step::Interrupted {
                    return self.interrupt();
                }
                continue;
            }

            if let Some(batch) = self.scheduler.take_pending() {
                let previous = self.current_role.replace(batch.role);
                tracing::debug!(
                    "Turn {} ready with {} command(s), speaker {:?} -> {}",
                    batch.index,
                    batch.commands.len(),
                    previous,
                    batch.role
                );
                self.queue.extend_batch(batch);
                continue;
            }

            if self.scheduler.is_finished() {
                tracing::info!("Script finished");
                return SessionOutcome::Completed;
            }

            tokio::select! {
                _ = self.scheduler.wait_for_batch(self.settings.poll_interval) => {}
                _ = self.shutdown.wait() => {}
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Step {
        tracing::trace!("Executing {}", command.kind());

        match command {
            Command::ShowMessage {
                role,
                text,
                translation,
            } => {
                self.display.show_message(role, &text, &translation);
                Step::Continue
            }
            Command::ShowSentence {
                role,
                text,
                translation,
            } => {
                self.display.show_sentence(role, &text, &translation);
                Step::Continue
            }
            Command::Speak(speak) => self.speak(&speak.file).await,
            Command::Pause { repeat } => self.pause(repeat).await,
            Command::Cleanup { file } => {
                self.registry.remove_now(&file);
                Step::Continue
            }
        }
    }

    async fn speak(&mut self, file: &Path) -> Step {
        if let Err(e) = validate_resource(file, self.settings.min_audio_bytes) {
            return absorb(e.into());
        }

        tokio::select! {
            result = self.player.play(file) => match result {
                Ok(()) => Step::Continue,
                Err(e) => absorb(e.into()),
            },
            _ = self.shutdown.wait() => Step::Interrupted,
        }
    }

    async fn pause(&mut self, repeat: Speak) -> Step {
        self.state = PauseState::AwaitingInput;

        if self.prompted {
            self.display.prompt(SHORT_PROMPT);
        } else {
            self.display.prompt(&self.settings.first_prompt);
            self.prompted = true;
        }

        let key = tokio::select! {
            key = self.keys.read_key() => key,
            _ = self.shutdown.wait() => Err(InputError::Interrupted),
        };

        // An interrupted prompt stays open until `interrupt` closes it
        let key = match key {
            Ok(key) => key,
            Err(InputError::Interrupted) => return Step::Interrupted,
            Err(e) => {
                // Without keys there is no way to go on
                absorb(e.into());
                self.shutdown.trigger();
                return Step::Interrupted;
            }
        };

        self.display.end_prompt();
        self.state = PauseState::Idle;

        if key == PauseKey::Repeat {
            tracing::debug!("Repeating {:?}", repeat.file);
            self.queue.inject_repeat(&repeat);
        }
        Step::Continue
    }

    fn interrupt(&mut self) -> SessionOutcome {
        if self.state == PauseState::AwaitingInput {
            self.display.end_prompt();
            self.state = PauseState::Idle;
        }

        let discarded = self.queue.iter().filter(|c| !c.is_cleanup()).count();
        let files = self.queue.drain_cleanups();
        tracing::info!(
            "Interrupted; dropping {} command(s), removing {} queued file(s)",
            discarded,
            files.len()
        );
        for file in files {
            self.registry.remove_now(&file);
        }
        self.display.notice(EXIT_NOTICE);
        SessionOutcome::Interrupted
    }
}

/// Log a session-time failure. Recoverable ones let the session go on.
fn absorb(err: EngineError) -> Step {
    if err.is_recoverable() {
        tracing::warn!("{} ({})", err, err.user_hint());
        Step::Continue
    } else {
        tracing::error!("{} ({}); ending session", err, err.user_hint());
        Step::Interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputError;
    use crate::playback::PlaybackError;
    use crate::speech::SpeechError;
    use std::path::PathBuf;

    #[test]
    fn test_resource_and_player_failures_are_absorbed() {
        let small = PlaybackError::TooSmall {
            path: PathBuf::from("turn_0_0.mp3"),
            size: 12,
            min: 100,
        };
        assert_eq!(absorb(small.into()), Step::Continue);
        assert_eq!(
            absorb(PlaybackError::Missing(PathBuf::from("gone.mp3")).into()),
            Step::Continue
        );
        assert_eq!(absorb(SpeechError::EmptyAudio.into()), Step::Continue);
    }

    #[test]
    fn test_terminal_failure_ends_session() {
        let err = InputError::Terminal(std::io::Error::other("not a tty"));
        assert_eq!(absorb(err.into()), Step::Interrupted);
    }
}
