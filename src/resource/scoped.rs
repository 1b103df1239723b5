//! Scoped Resource
//!
//! A named on-disk object that can be reserved before its content exists.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

use super::Closeable;

/// Observable materialization state of a ScopedResource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Path allocated, no open handle
    Reserved,
    /// Backing file open and usable for I/O
    Loaded,
    /// Backing file removed; terminal
    Closed,
}

/// Internal state: the live file only exists while Loaded
#[derive(Debug)]
enum Materialization {
    Reserved,
    Loaded(File),
    Closed,
}

/// A lazily materialized file bound to a fixed path
///
/// ## Protocol:
/// 1. `reserve()` claims a path that must not exist yet
/// 2. a producer populates it with `use_file()` (hard link, then load), or
///    something else writes the file and a reader calls `load()`
/// 3. `Read`/`Write`/`Seek` only work while Loaded; they fail with
///    `StoreError::NotLoaded` (inside the `io::Error`) otherwise
/// 4. `unload()` drops the descriptor but keeps the path and content
/// 5. `close()` drops the descriptor and removes the file for good
#[derive(Debug)]
pub struct ScopedResource {
    /// Logical name (final path component)
    name: String,
    /// Backing path, fixed at reservation
    path: PathBuf,
    state: Materialization,
}

impl ScopedResource {
    /// Reserve `path` for content that will exist later
    ///
    /// Fails with `AlreadyExists` if anything is already at `path`.
    pub fn reserve(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        match fs::symlink_metadata(&path) {
            Ok(_) => return Err(StoreError::AlreadyExists(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::trace!("Reserved {}", path.display());

        Ok(Self {
            name,
            path,
            state: Materialization::Reserved,
        })
    }

    /// Open the backing file
    ///
    /// Errors:
    /// - `AlreadyLoaded` if a handle is already open
    /// - `Closed` if the resource has been closed
    /// - `NotInitialized` if nothing has been written to the path yet
    /// - `NotAFile` if the path holds a directory
    pub fn load(&mut self) -> Result<()> {
        match self.state {
            Materialization::Loaded(_) => {
                return Err(StoreError::AlreadyLoaded(self.path.clone()))
            }
            Materialization::Closed => return Err(StoreError::Closed(self.path.clone())),
            Materialization::Reserved => {}
        }

        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotInitialized(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            return Err(StoreError::NotAFile(self.path.clone()));
        }

        let file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(f) => f,
            // Content linked in read-only is still loadable for readers
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => File::open(&self.path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotInitialized(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        self.state = Materialization::Loaded(file);
        tracing::trace!("Loaded {}", self.path.display());
        Ok(())
    }

    /// Drop the open handle but keep the path and its content
    ///
    /// Never fails; flush errors are logged. No-op unless Loaded.
    pub fn unload(&mut self) {
        if let Materialization::Loaded(_) = self.state {
            if let Materialization::Loaded(file) =
                mem::replace(&mut self.state, Materialization::Reserved)
            {
                release_file(&self.path, file);
            }
        }
    }

    /// Populate the reserved path by hard-linking `source` onto it, then load
    ///
    /// Fails with `LinkFailed` if the target already exists or the link
    /// cannot be made (cross-device, permissions).
    pub fn use_file(&mut self, source: impl AsRef<Path>) -> Result<()> {
        let source = source.as_ref();

        if let Materialization::Closed = self.state {
            return Err(StoreError::Closed(self.path.clone()));
        }

        fs::hard_link(source, &self.path).map_err(|e| StoreError::LinkFailed {
            from: source.to_path_buf(),
            to: self.path.clone(),
            source: e,
        })?;

        tracing::debug!("Linked {} into {}", source.display(), self.path.display());
        self.load()
    }

    /// Close the resource and remove its backing file
    ///
    /// A missing backing file counts as already closed. A directory at the
    /// path is refused with `NotAFile`. Calling again after success is a
    /// no-op.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, Materialization::Reserved) {
            Materialization::Closed => {
                self.state = Materialization::Closed;
                tracing::debug!("Resource {} already closed", self.path.display());
                return Ok(());
            }
            Materialization::Loaded(file) => release_file(&self.path, file),
            Materialization::Reserved => {}
        }

        match fs::symlink_metadata(&self.path) {
            Ok(m) if m.is_dir() => return Err(StoreError::NotAFile(self.path.clone())),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.state = Materialization::Closed;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.state = Materialization::Closed;
        tracing::trace!("Closed {}", self.path.display());
        Ok(())
    }

    /// Logical name of the resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing path, fixed since reservation
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ResourceState {
        match self.state {
            Materialization::Reserved => ResourceState::Reserved,
            Materialization::Loaded(_) => ResourceState::Loaded,
            Materialization::Closed => ResourceState::Closed,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, Materialization::Loaded(_))
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        match &mut self.state {
            Materialization::Loaded(file) => Ok(file),
            _ => Err(StoreError::NotLoaded.into()),
        }
    }
}

/// Flush and drop a live handle, logging instead of failing
fn release_file(path: &Path, file: File) {
    if let Err(e) = file.sync_all() {
        tracing::warn!("Error closing handle for {}: {}", path.display(), e);
    }
}

// =============================================================================
// Stream Delegation
// =============================================================================

impl Read for ScopedResource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Write for ScopedResource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Seek for ScopedResource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}

impl Closeable for ScopedResource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<()> {
        ScopedResource::close(self)
    }
}
