//! Deferred File Manager
//!
//! Cache slots that are reserved before their content exists.
//!
//! ## Two-phase protocol
//! ```text
//!   manager.create("result-42")   reserve the slot (no file yet)
//!   handle.lock().use_file(tmp)   producer links its output in
//!   manager.open("result-42")     consumer gets the same slot
//!   handle.lock().load()          (if the producer unloaded it)
//!   release.release()             slot and file are removed
//! ```

use std::path::Path;

use crate::error::Result;
use crate::resource::{RootDir, ScopedResource};

use super::table::{Acquired, ManagedRoot};
use super::{Manager, OpenManager};

const KIND: &str = "cache file";

/// Manages lazily materialized cache resources under a root directory
///
/// `create` and `open` are the same operation here: reserve the name, or
/// return the slot already reserved under it. Reserving a name whose file is
/// already on disk (but untracked) fails with `AlreadyExists`.
///
/// Releasing a slot, or closing the manager, removes its file.
pub struct DeferredFileManager {
    core: ManagedRoot<String, ScopedResource>,
}

impl DeferredFileManager {
    /// Create a manager rooted at an already open directory
    pub fn new(root: RootDir) -> Self {
        Self {
            core: ManagedRoot::new(root, KIND),
        }
    }

    /// Open `path` as the root and create a manager on it
    pub fn open_root(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(RootDir::open(path)?))
    }

    /// Number of reserved slots
    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.core.contains(&name.to_string())
    }

    fn reserve(&self, name: &str) -> Result<Acquired<String, ScopedResource>> {
        let key = name.to_string();
        if let Some(acquired) = self.core.lookup(&key) {
            return Ok(acquired);
        }

        let path = self.core.resolve(name)?;
        let resource = ScopedResource::reserve(path)?;
        Ok(self.core.track(key, resource))
    }
}

impl Manager for DeferredFileManager {
    type Key = String;
    type Resource = ScopedResource;

    fn create(&self, name: &str) -> Result<Acquired<String, ScopedResource>> {
        self.reserve(name)
    }

    fn path(&self) -> &Path {
        self.core.path()
    }

    fn close(&mut self) -> Result<()> {
        self.core.close()
    }
}

impl OpenManager for DeferredFileManager {
    fn open(&self, name: &str) -> Result<Acquired<String, ScopedResource>> {
        self.reserve(name)
    }
}
