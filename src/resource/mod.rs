//! Resource Module
//!
//! The building blocks every manager is made of.
//!
//! ## Responsibilities
//! - Hold the open root directory a manager lives under (`RootDir`)
//! - Represent a lazily materialized, named on-disk object (`ScopedResource`)
//! - Share a single live stream between re-entrant acquisitions (`Handle`)
//!
//! ## ScopedResource Lifecycle
//! ```text
//!   reserve(path)
//!        │
//!        ▼
//!   ┌──────────┐  load() / use_file()  ┌──────────┐
//!   │ Reserved │ ────────────────────▶ │  Loaded  │
//!   │ (no fd)  │ ◀──────────────────── │  (fd)    │
//!   └────┬─────┘        unload()       └────┬─────┘
//!        │                                  │
//!        └──────────── close() ─────────────┘
//!                        │
//!                        ▼
//!                  ┌──────────┐
//!                  │  Closed  │  (file removed, terminal)
//!                  └──────────┘
//! ```

mod handle;
mod root;
mod scoped;

use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::Result;

pub use handle::Handle;
pub use root::RootDir;
pub(crate) use root::absolute;
pub use scoped::{ResourceState, ScopedResource};

/// A stream that a manager can track and tear down
///
/// `close` is what release tokens and manager shutdown call. Each resource
/// decides what closing means for it (sync, delete, or both), and a second
/// `close` after a successful one must be a no-op.
pub trait Closeable: Read + Write + Seek {
    /// Backing path of the resource
    fn path(&self) -> &Path;

    /// Relinquish the resource
    fn close(&mut self) -> Result<()>;
}
