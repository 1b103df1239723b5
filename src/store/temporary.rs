//! Temporary directory scope

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::manager::{EphemeralFileManager, Manager};

/// A unique directory under the store's `tmp` topic, with a manager in it
///
/// Derefs to the EphemeralFileManager rooted at the directory. `exit()`
/// tears the scope down and reports whether the directory could be removed;
/// dropping an un-exited scope does the same and logs any failure.
pub struct TemporaryDir {
    path: PathBuf,
    manager: EphemeralFileManager,
    exited: bool,
}

impl TemporaryDir {
    pub(super) fn new(path: PathBuf, manager: EphemeralFileManager) -> Self {
        Self {
            path,
            manager,
            exited: false,
        }
    }

    /// Path of the scope's directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manager(&self) -> &EphemeralFileManager {
        &self.manager
    }

    /// Close the manager, then remove the directory recursively
    ///
    /// A manager close failure is logged; the removal error is returned.
    pub fn exit(mut self) -> Result<()> {
        self.exit_scope()
    }

    fn exit_scope(&mut self) -> Result<()> {
        if self.exited {
            return Ok(());
        }
        self.exited = true;

        if let Err(e) = self.manager.close() {
            tracing::error!("Unable to close file manager: {}", e);
        }

        fs::remove_dir_all(&self.path)?;
        tracing::debug!("Exited temporary scope {}", self.path.display());
        Ok(())
    }
}

impl Deref for TemporaryDir {
    type Target = EphemeralFileManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

impl Drop for TemporaryDir {
    fn drop(&mut self) {
        if let Err(e) = self.exit_scope() {
            tracing::warn!(
                "Unable to remove temporary directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
