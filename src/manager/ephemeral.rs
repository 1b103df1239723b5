//! Ephemeral File Manager
//!
//! Auto-named scratch files that are deleted when released.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, StoreError};
use crate::resource::{Closeable, RootDir};

use super::table::{validate_name, Acquired, ManagedRoot};
use super::Manager;

const KIND: &str = "temporary file";

/// Default number of random characters appended to a prefix
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// A temporary file tracked by an EphemeralFileManager
///
/// Closing drops the descriptor and deletes the file. There is no way to
/// close without deleting.
#[derive(Debug)]
pub struct TempFile {
    index: u64,
    path: PathBuf,
    file: Option<File>,
}

impl TempFile {
    /// Sequence number assigned by the manager
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(StoreError::Closed(self.path.clone()).into()),
        }
    }
}

impl Read for TempFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Write for TempFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Seek for TempFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}

impl Closeable for TempFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        drop(file);

        fs::remove_file(&self.path)?;
        tracing::trace!("Removed temporary file #{} ({})", self.index, self.path.display());
        Ok(())
    }
}

/// Manages uniquely named temporary files under a root directory
///
/// `create(prefix)` always allocates a new file named `prefix` followed by
/// random alphanumerics, so it never collides with an existing name.
/// Entries are keyed by a sequence number that is never reused.
pub struct EphemeralFileManager {
    core: ManagedRoot<u64, TempFile>,
    /// Next index to hand out (atomic, never reused)
    next_index: AtomicU64,
    suffix_len: usize,
}

impl EphemeralFileManager {
    /// Create a manager rooted at an already open directory
    pub fn new(root: RootDir) -> Self {
        Self {
            core: ManagedRoot::new(root, KIND),
            next_index: AtomicU64::new(1),
            suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }

    /// Open `path` as the root and create a manager on it
    pub fn open_root(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(RootDir::open(path)?))
    }

    /// Set how many random characters follow the prefix
    pub fn with_suffix_len(mut self, len: usize) -> Self {
        self.suffix_len = len.max(1);
        self
    }

    /// Number of live temporary files
    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Manager for EphemeralFileManager {
    type Key = u64;
    type Resource = TempFile;

    fn create(&self, prefix: &str) -> Result<Acquired<u64, TempFile>> {
        self.core.ensure_open()?;
        if !prefix.is_empty() {
            validate_name(prefix)?;
        }

        let named = tempfile::Builder::new()
            .prefix(prefix)
            .rand_bytes(self.suffix_len)
            .tempfile_in(self.core.path())?;
        let (file, path) = named.keep().map_err(|e| StoreError::Io(e.error))?;

        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Created temporary file #{} ({})", index, path.display());

        let temp = TempFile {
            index,
            path,
            file: Some(file),
        };
        Ok(self.core.track(index, temp))
    }

    fn path(&self) -> &Path {
        self.core.path()
    }

    fn close(&mut self) -> Result<()> {
        self.core.close()
    }
}
