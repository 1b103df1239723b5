//! # handlestore
//!
//! A local on-disk resource store with:
//! - Named file handles under a root directory, one live handle per name
//! - Release tokens that are safe to invoke more than once
//! - Auto-named temporary files that are deleted on release
//! - Cache slots reserved before their content exists, filled by hard link
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                                │
//! │          (base directory + cache/images/gold/tmp)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ RootDir per manager
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌────────────┐ ┌────────────┐     ┌──────────────┐
//!   │ Permanent  │ │ Ephemeral  │     │   Deferred   │
//!   │  Manager   │ │  Manager   │     │   Manager    │
//!   └─────┬──────┘ └─────┬──────┘     └──────┬───────┘
//!         │              │                   │
//!         └──────────────┼───────────────────┘
//!                        ▼
//!                ┌───────────────┐
//!                │  HandleTable  │ ◀── Release tokens
//!                └───────┬───────┘
//!                        ▼
//!        ManagedFile / TempFile / ScopedResource
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod resource;
pub mod manager;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use manager::{
    Acquired, DeferredFileManager, EphemeralFileManager, Manager, OpenManager,
    PermanentFileManager, Release,
};
pub use resource::{Closeable, Handle, ResourceState, RootDir, ScopedResource};
pub use store::{Store, TemporaryDir};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of handlestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
