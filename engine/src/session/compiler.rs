//! Turn compilation
//!
//! Splits a turn into sentences, synthesizes each one to a file in the
//! session's scratch directory and emits the commands that show, speak, pause
//! on and finally delete it.

use sdk::errors::{ChatErrorExt, EngineError};
use sdk::types::Turn;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cleanup::CleanupRegistry;
use super::command::{Command, CompiledBatch};
use crate::speech::SpeechSynthesizer;

/// Separates clauses in both the text and the translation of a turn
pub const SEGMENT_DELIMITER: char = '|';

/// Split `text` on the clause delimiter, trimming and dropping empty segments
pub fn split_segments(text: &str) -> Vec<String> {
    text.split(SEGMENT_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Line up translation segments with `sentences` text segments.
///
/// Missing segments become empty strings. Extra segments are folded into the
/// last sentence's translation.
pub fn align_translations(sentences: usize, translation: &str) -> Vec<String> {
    let mut segments = split_segments(translation);
    if sentences == 0 {
        return Vec::new();
    }

    if segments.len() > sentences {
        let surplus = segments.split_off(sentences - 1);
        segments.push(surplus.join(" "));
    }
    segments.resize(sentences, String::new());
    segments
}

/// Compiles turns into command batches
pub struct TurnCompiler {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    registry: Arc<CleanupRegistry>,
    scratch_dir: PathBuf,
}

impl TurnCompiler {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        registry: Arc<CleanupRegistry>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            registry,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Audio file for sentence `sentence` of turn `index`
    pub fn audio_path(&self, index: usize, sentence: usize) -> PathBuf {
        self.scratch_dir
            .join(format!("turn_{}_{}.mp3", index, sentence))
    }

    /// Compile turn `index`. Never fails: a sentence whose synthesis fails
    /// still gets its commands and is skipped at playback.
    pub async fn compile(&self, index: usize, turn: &Turn, voice: &str) -> CompiledBatch {
        let sentences = split_segments(&turn.text);
        let translations = align_translations(sentences.len(), &turn.translation);

        tracing::debug!(
            "Compiling turn {} ({}, voice {}) into {} sentence(s)",
            index,
            turn.role,
            voice,
            sentences.len()
        );

        let mut commands = Vec::with_capacity(1 + sentences.len() * 4);
        commands.push(Command::ShowMessage {
            role: turn.role,
            text: sentences.join(" "),
            translation: split_segments(&turn.translation).join(" "),
        });

        for (position, (sentence, translation)) in
            sentences.into_iter().zip(translations).enumerate()
        {
            let file = self.audio_path(index, position);
            self.synthesize_to(&file, &sentence, voice).await;

            commands.push(Command::ShowSentence {
                role: turn.role,
                text: sentence,
                translation,
            });
            commands.push(Command::speak(&file));
            commands.push(Command::pause(&file));
            commands.push(Command::cleanup(file));
        }

        CompiledBatch {
            index,
            role: turn.role,
            commands,
        }
    }

    async fn synthesize_to(&self, file: &Path, sentence: &str, voice: &str) {
        match self.synthesizer.synthesize(sentence, voice).await {
            Ok(audio) => {
                if let Err(e) = self.registry.materialize(file, &audio) {
                    tracing::warn!("Could not store audio: {}", e);
                }
            }
            Err(e) => {
                let err = EngineError::from(e);
                tracing::warn!("{:?}: {} ({})", file, err, err.user_hint());
                self.registry.register(file);
            }
        }
    }
}
