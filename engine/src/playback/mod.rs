//! Audio playback
//!
//! The executor checks every file with `validate_resource` before handing it
//! to an `AudioPlayer`, so a missing or truncated synthesis result is skipped
//! instead of being fed to the player.

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::PlaybackConfig;

/// Errors from playing a single file
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Audio resource missing: {0:?}")]
    Missing(PathBuf),

    #[error("Audio resource too small ({size} bytes < {min}): {path:?}")]
    TooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("Failed to start player '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Player exited with {0}")]
    PlayerFailed(std::process::ExitStatus),
}

impl From<PlaybackError> for EngineError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Missing(path) | PlaybackError::TooSmall { path, .. } => {
                EngineError::InvalidResource(path)
            }
            other => EngineError::Playback(other.to_string()),
        }
    }
}

/// Plays an audio file to the output device
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Check that `path` exists and holds at least `min_bytes` bytes
pub fn validate_resource(path: &Path, min_bytes: u64) -> Result<(), PlaybackError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(PlaybackError::Missing(path.to_path_buf())),
    };

    if metadata.len() < min_bytes {
        return Err(PlaybackError::TooSmall {
            path: path.to_path_buf(),
            size: metadata.len(),
            min: min_bytes,
        });
    }

    Ok(())
}

/// Plays files by running an external program such as `afplay` or `mpg123`
///
/// The child is killed if the playback future is dropped, which is how an
/// interrupt stops a sentence mid-way.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.player.clone(), config.player_args.clone())
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        tracing::debug!("Playing {:?} with {}", path, self.program);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| PlaybackError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(PlaybackError::PlayerFailed(status));
        }

        tracing::debug!("{:?} has played", path);
        Ok(())
    }
}
