//! Playback commands
//!
//! A turn is compiled into a flat list of commands which the executor runs one
//! at a time. Every command is a value; repeats re-insert clones.

use sdk::types::Role;
use std::path::{Path, PathBuf};

/// Play one audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speak {
    pub file: PathBuf,
}

impl Speak {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

/// One step of the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a whole turn with its translation
    ShowMessage {
        role: Role,
        text: String,
        translation: String,
    },

    /// Print one sentence with its aligned translation
    ShowSentence {
        role: Role,
        text: String,
        translation: String,
    },

    Speak(Speak),

    /// Wait for the operator; on repeat, `repeat` is played again
    Pause { repeat: Speak },

    /// Delete an audio file once it can no longer be replayed
    Cleanup { file: PathBuf },
}

impl Command {
    pub fn speak(file: impl Into<PathBuf>) -> Self {
        Self::Speak(Speak::new(file))
    }

    pub fn pause(file: impl Into<PathBuf>) -> Self {
        Self::Pause {
            repeat: Speak::new(file),
        }
    }

    pub fn cleanup(file: impl Into<PathBuf>) -> Self {
        Self::Cleanup { file: file.into() }
    }

    pub fn is_cleanup(&self) -> bool {
        matches!(self, Self::Cleanup { .. })
    }

    /// The audio file this command refers to, if any
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::Speak(speak) => Some(&speak.file),
            Self::Pause { repeat } => Some(&repeat.file),
            Self::Cleanup { file } => Some(file),
            Self::ShowMessage { .. } | Self::ShowSentence { .. } => None,
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShowMessage { .. } => "show_message",
            Self::ShowSentence { .. } => "show_sentence",
            Self::Speak(_) => "speak",
            Self::Pause { .. } => "pause",
            Self::Cleanup { .. } => "cleanup",
        }
    }
}

/// The commands for one turn, produced off the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBatch {
    pub index: usize,
    pub role: Role,
    pub commands: Vec<Command>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_accessor() {
        assert_eq!(Command::speak("a.mp3").file(), Some(Path::new("a.mp3")));
        assert_eq!(Command::pause("b.mp3").file(), Some(Path::new("b.mp3")));
        assert_eq!(Command::cleanup("c.mp3").file(), Some(Path::new("c.mp3")));

        let show = Command::ShowSentence {
            role: Role::A,
            text: "Hi".into(),
            translation: String::new(),
        };
        assert_eq!(show.file(), None);
    }

    #[test]
    fn test_is_cleanup() {
        assert!(Command::cleanup("c.mp3").is_cleanup());
        assert!(!Command::speak("c.mp3").is_cleanup());
        assert_eq!(Command::pause("p.mp3").kind(), "pause");
    }
}
