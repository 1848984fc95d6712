//! The foreground command queue

use std::collections::VecDeque;
use std::path::PathBuf;

use super::command::{Command, CompiledBatch, Speak};

/// Ordered double-ended queue of pending commands
///
/// Only the executor touches it. New turns are appended at the back; repeats
/// are injected at the front.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub fn push_front(&mut self, command: Command) {
        self.commands.push_front(command);
    }

    pub fn pop_front(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Append a compiled turn, preserving its order
    pub fn extend_batch(&mut self, batch: CompiledBatch) {
        self.commands.extend(batch.commands);
    }

    /// Put `Speak(repeat)` then `Pause(repeat)` at the front.
    ///
    /// Called after the pause itself has been popped, so the sentence plays
    /// again and the operator is asked again before anything else runs.
    pub fn inject_repeat(&mut self, repeat: &Speak) {
        self.commands.push_front(Command::Pause {
            repeat: repeat.clone(),
        });
        self.commands.push_front(Command::Speak(repeat.clone()));
    }

    /// Empty the queue, returning the files of the cleanup commands it held
    pub fn drain_cleanups(&mut self) -> Vec<PathBuf> {
        self.commands
            .drain(..)
            .filter_map(|command| match command {
                Command::Cleanup { file } => Some(file),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }
}
