//! Manager Module
//!
//! Named file handles under a root directory, with release tokens.
//!
//! ## Variants
//! - `PermanentFileManager`: files that outlive the manager; create, open,
//!   or adopt an external file by hard link
//! - `EphemeralFileManager`: auto-named scratch files, deleted on release
//! - `DeferredFileManager`: cache slots reserved before their content exists
//!
//! ## Shared Contract
//! ```text
//!   create(name) ──▶ (Handle<R>, Release)     re-entrant per name
//!   open(name)   ──▶ (Handle<R>, Release)     permanent + deferred only
//!   path()       ──▶ root directory
//!   close()      ──▶ close entries (log failures), then the root
//! ```
//!
//! Managers are not synchronized across calls; drive each one from a single
//! owner.

mod deferred;
mod ephemeral;
mod permanent;
mod table;

use std::fmt;
use std::hash::Hash;
use std::path::Path;

use crate::error::Result;
use crate::resource::Closeable;

pub use deferred::DeferredFileManager;
pub use ephemeral::{EphemeralFileManager, TempFile};
pub use permanent::{ManagedFile, PermanentFileManager};
pub use table::{Acquired, HandleTable, Release};

/// Operations every manager variant supports
pub trait Manager {
    /// Key the handle table is indexed by
    type Key: Eq + Hash + Clone + fmt::Display + fmt::Debug;

    /// Resource type handed out
    type Resource: Closeable;

    /// Materialize a resource for `name`, or return the one already tracked
    fn create(&self, name: &str) -> Result<Acquired<Self::Key, Self::Resource>>;

    /// Root directory of the manager
    fn path(&self) -> &Path;

    /// Close every tracked resource, then the root directory
    ///
    /// Per-entry failures are logged, never returned.
    fn close(&mut self) -> Result<()>;
}

/// Managers whose resources can be reopened by name
pub trait OpenManager: Manager {
    fn open(&self, name: &str) -> Result<Acquired<Self::Key, Self::Resource>>;
}
