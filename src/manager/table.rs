//! Handle table and release tokens
//!
//! Shared plumbing behind every manager variant.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{Result, StoreError};
use crate::resource::{Closeable, Handle, RootDir};

/// A tracked resource paired with the token that releases it
pub type Acquired<K, R> = (Handle<R>, Release<K, R>);

/// Table shared between a manager and the release tokens it hands out
pub(crate) type SharedTable<K, R> = Arc<Mutex<HandleTable<K, R>>>;

/// Mapping from logical key to live resource
///
/// One table per manager instance; at most one entry per key.
pub struct HandleTable<K, R> {
    entries: HashMap<K, Handle<R>>,
}

impl<K: Eq + Hash + Clone, R> HandleTable<K, R> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Clone of the handle tracked under `key`
    pub fn get(&self, key: &K) -> Option<Handle<R>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: K, handle: Handle<R>) {
        self.entries.insert(key, handle);
    }

    pub fn remove(&mut self, key: &K) -> Option<Handle<R>> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<(K, Handle<R>)> {
        self.entries.drain().collect()
    }
}

impl<K: Eq + Hash + Clone, R> Default for HandleTable<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Release Token
// =============================================================================

/// One-shot capability to relinquish one key of one table
///
/// Releasing removes the entry and closes the resource (what "close" means
/// is up to the resource: sync for permanent files, delete for temporary and
/// cache files). Releasing a key that is no longer tracked, including after
/// the manager itself was closed, logs a warning and does nothing else.
pub struct Release<K, R> {
    key: K,
    table: Weak<Mutex<HandleTable<K, R>>>,
    kind: &'static str,
}

impl<K, R> Release<K, R>
where
    K: Eq + Hash + Clone + fmt::Display,
    R: Closeable,
{
    fn new(key: K, table: &SharedTable<K, R>, kind: &'static str) -> Self {
        Self {
            key,
            table: Arc::downgrade(table),
            kind,
        }
    }

    /// Key this token releases
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Release the resource. Safe to call any number of times.
    pub fn release(&self) {
        let removed = self.table.upgrade().and_then(|table| {
            let removed = table.lock().remove(&self.key);
            removed
        });

        let Some(handle) = removed else {
            tracing::warn!("Unable to release already released {} {}", self.kind, self.key);
            return;
        };

        let mut resource = handle.lock();
        match resource.close() {
            Ok(()) => tracing::trace!("Released {} {}", self.kind, self.key),
            Err(e) => tracing::error!(
                "Error closing {} {} ({}): {}",
                self.kind,
                self.key,
                resource.path().display(),
                e
            ),
        }
    }
}

impl<K: fmt::Debug, R> fmt::Debug for Release<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .finish()
    }
}

// =============================================================================
// Managed Root
// =============================================================================

/// State common to all managers: the root directory and the handle table
///
/// ## Invariants:
/// - `root` is `Some` from construction until `close()`
/// - `close()` closes every entry before the root, and always attempts the
///   root even if entries fail
pub(crate) struct ManagedRoot<K, R>
where
    K: Eq + Hash + Clone + fmt::Display,
    R: Closeable,
{
    path: PathBuf,
    root: Option<RootDir>,
    table: SharedTable<K, R>,
    kind: &'static str,
}

impl<K, R> ManagedRoot<K, R>
where
    K: Eq + Hash + Clone + fmt::Display,
    R: Closeable,
{
    pub(crate) fn new(root: RootDir, kind: &'static str) -> Self {
        Self {
            path: root.path().to_path_buf(),
            root: Some(root),
            table: Arc::new(Mutex::new(HandleTable::new())),
            kind,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a logical name to a path under the root
    pub(crate) fn resolve(&self, name: &str) -> Result<PathBuf> {
        self.ensure_open()?;
        validate_name(name)?;
        Ok(self.path.join(name))
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.root {
            Some(_) => Ok(()),
            None => Err(StoreError::Closed(self.path.clone())),
        }
    }

    /// Existing handle for `key` with a fresh release token
    pub(crate) fn lookup(&self, key: &K) -> Option<Acquired<K, R>> {
        let handle = self.table.lock().get(key)?;
        Some((handle, Release::new(key.clone(), &self.table, self.kind)))
    }

    /// Start tracking a freshly materialized resource
    pub(crate) fn track(&self, key: K, resource: R) -> Acquired<K, R> {
        let handle = Handle::new(resource);
        self.table.lock().insert(key.clone(), handle.clone());
        tracing::debug!("Tracking {} {} under {}", self.kind, key, self.path.display());
        (handle, Release::new(key, &self.table, self.kind))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.table.lock().contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Close every tracked entry, then the root
    ///
    /// Entry failures are logged; only the root close error is returned.
    /// Closing twice is a logged no-op.
    pub(crate) fn close(&mut self) -> Result<()> {
        let Some(root) = self.root.take() else {
            tracing::warn!(
                "The {} manager at {} is already closed",
                self.kind,
                self.path.display()
            );
            return Ok(());
        };

        let entries = self.table.lock().drain();
        let mut failed = 0usize;
        for (key, handle) in entries {
            let mut resource = handle.lock();
            if let Err(e) = resource.close() {
                failed += 1;
                tracing::warn!(
                    "Unable to close {} {} ({}): {}",
                    self.kind,
                    key,
                    resource.path().display(),
                    e
                );
            }
        }

        if failed > 0 {
            tracing::warn!(
                "{} {} entries failed to close under {}",
                failed,
                self.kind,
                self.path.display()
            );
        }

        root.close()
    }
}

impl<K, R> Drop for ManagedRoot<K, R>
where
    K: Eq + Hash + Clone + fmt::Display,
    R: Closeable,
{
    fn drop(&mut self) {
        if self.root.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("Error closing {} manager on drop: {}", self.kind, e);
            }
        }
    }
}

/// Names must stay a single path component under the root
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
