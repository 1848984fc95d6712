//! Audio file lifetime tracking
//!
//! Every audio path the compiler produces is registered here before any
//! command can refer to it. Files are removed early by `Cleanup` commands and
//! whatever is left is removed by `final_sweep` when the session ends.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Registry already swept; refusing to create {0:?}")]
    Sealed(PathBuf),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
struct RegistryState {
    files: Vec<PathBuf>,
    known: HashSet<PathBuf>,
    sealed: bool,
}

/// Thread-safe set of audio files owned by the session
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    state: Mutex<RegistryState>,
    scratch_dir: Option<PathBuf>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that also removes `dir` at the final sweep if it is empty
    pub fn with_scratch_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::default(),
            scratch_dir: Some(dir.into()),
        }
    }

    // A panic elsewhere must not stop files from being removed
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `path`. Returns false if it was already known.
    pub fn register(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let mut state = self.lock();
        if state.known.insert(path.clone()) {
            state.files.push(path);
            true
        } else {
            false
        }
    }

    /// Register `path` and write `bytes` to it under one lock.
    ///
    /// Once `final_sweep` has run no new file can appear on disk.
    pub fn materialize(&self, path: &Path, bytes: &[u8]) -> Result<(), CleanupError> {
        let mut state = self.lock();
        if state.sealed {
            return Err(CleanupError::Sealed(path.to_path_buf()));
        }

        if state.known.insert(path.to_path_buf()) {
            state.files.push(path.to_path_buf());
        }

        std::fs::write(path, bytes).map_err(|source| CleanupError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Delete `path` if it exists. Returns whether a file was removed.
    pub fn remove_now(&self, path: &Path) -> bool {
        remove_file(path)
    }

    /// Delete every registered file and seal the registry. Idempotent.
    ///
    /// Returns how many files were actually removed.
    pub fn final_sweep(&self) -> usize {
        let mut state = self.lock();
        state.sealed = true;

        let removed = state.files.iter().filter(|path| remove_file(path)).count();

        if let Some(dir) = &self.scratch_dir {
            match std::fs::remove_dir(dir) {
                Ok(()) => tracing::debug!("Removed scratch directory {:?}", dir),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::debug!("Left scratch directory {:?} in place: {}", dir, e),
            }
        }

        if removed > 0 {
            tracing::info!("Final sweep removed {} audio file(s)", removed);
        }
        removed
    }

    /// Snapshot of every path registered so far, in registration order
    pub fn registered(&self) -> Vec<PathBuf> {
        self.lock().files.clone()
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }
}

fn remove_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::trace!("Removed {:?}", path);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
            false
        }
    }
}
