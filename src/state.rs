//! Flag-file state store.
//!
//! The presence of a single marker file is the only record of which layout is active.
//! All reads and writes go through [`StateStore`] so the check-then-act sequence can be
//! serialised in one place.

use crate::error::{FileOp, ToggleError};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub(crate) trait StateStore {
    /// Take the store's exclusive lock; released when the guard drops.
    fn lock(&self) -> Result<StateLock, ToggleError>;
    fn is_set(&self) -> Result<bool, ToggleError>;
    fn set(&self) -> Result<(), ToggleError>;
    fn clear(&self) -> Result<(), ToggleError>;
}

/// Guard for an advisory lock. Holds nothing when locking is disabled.
pub(crate) struct StateLock {
    held: Option<Flock<File>>,
}

impl StateLock {
    pub(crate) fn unlocked() -> Self {
        Self { held: None }
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self) -> bool {
        self.held.is_some()
    }
}

/// Marker file in the user's home, with an optional `flock(2)` lock file elsewhere.
pub(crate) struct FlagFileStore {
    path: PathBuf,
    lock_path: Option<PathBuf>,
}

impl FlagFileStore {
    pub(crate) fn new(path: impl Into<PathBuf>, lock_path: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_path,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn access_error(&self, op: FileOp, source: std::io::Error) -> ToggleError {
        ToggleError::FileAccess {
            op,
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for FlagFileStore {
    fn lock(&self) -> Result<StateLock, ToggleError> {
        let Some(lock_path) = self.lock_path.as_deref() else {
            return Ok(StateLock::unlocked());
        };
        let lock_err = |source| ToggleError::Lock {
            path: lock_path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)
            .map_err(lock_err)?;
        let held = Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| lock_err(std::io::Error::from(errno)))?;
        tracing::trace!(path = %lock_path.display(), "lock acquired");
        Ok(StateLock { held: Some(held) })
    }

    fn is_set(&self) -> Result<bool, ToggleError> {
        self.path
            .try_exists()
            .map_err(|e| self.access_error(FileOp::Check, e))
    }

    fn set(&self) -> Result<(), ToggleError> {
        // Touch: contents are irrelevant, an existing file is left as is.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(drop)
            .map_err(|e| self.access_error(FileOp::Create, e))
    }

    fn clear(&self) -> Result<(), ToggleError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Only reachable when another unlocked invocation got here first.
                tracing::debug!(path = %self.path.display(), "flag file already gone");
                Ok(())
            }
            Err(e) => Err(self.access_error(FileOp::Remove, e)),
        }
    }
}
