//! Permanent File Manager
//!
//! Named files that persist under the root after release.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::resource::{Closeable, RootDir};

use super::table::{Acquired, ManagedRoot};
use super::{Manager, OpenManager};

const KIND: &str = "file";

/// A persistent file tracked by a PermanentFileManager
///
/// Closing syncs the file (when it was opened writable) and drops the
/// descriptor; the file itself stays on disk.
#[derive(Debug)]
pub struct ManagedFile {
    path: PathBuf,
    file: Option<File>,
    writable: bool,
}

impl ManagedFile {
    fn new(path: PathBuf, file: File, writable: bool) -> Self {
        Self {
            path,
            file: Some(file),
            writable,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the descriptor is still open
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

impl Read for ManagedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Write for ManagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Seek for ManagedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}

impl Closeable for ManagedFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            if self.writable {
                file.sync_all()?;
            }
        }
        Ok(())
    }
}

/// Manages named files that persist under a root directory
///
/// ## Semantics:
/// - `create` refuses names whose file already exists
/// - `open` refuses names whose file does not exist, and opens read-only
/// - `add` adopts an external file by hard-linking it under the root
/// - re-requesting a tracked name returns the tracked handle
pub struct PermanentFileManager {
    core: ManagedRoot<String, ManagedFile>,
}

impl PermanentFileManager {
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

    /// Adopt an external file under `name` by hard-linking it into the root
    ///
    /// Errors:
    /// - `DuplicateName` if `name` is already tracked
    /// - `IsDirectory` if `source` is a directory
    /// - `LinkFailed` if the link cannot be created
    ///
    /// If the linked file cannot be opened, the link is removed again.
    pub fn add(
        &self,
        source: impl AsRef<Path>,
        name: &str,
    ) -> Result<Acquired<String, ManagedFile>> {
        let source = source.as_ref();
        let key = name.to_string();

        if self.core.contains(&key) {
            return Err(StoreError::DuplicateName(key));
        }

        if fs::metadata(source)?.is_dir() {
            return Err(StoreError::IsDirectory(source.to_path_buf()));
        }

        let path = self.core.resolve(name)?;

        fs::hard_link(source, &path).map_err(|e| StoreError::LinkFailed {
            from: source.to_path_buf(),
            to: path.clone(),
            source: e,
        })?;

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path) {
                    tracing::warn!(
                        "Unable to remove linked file {} during error: {}",
                        path.display(),
                        rm
                    );
                }
                return Err(e.into());
            }
        };

        tracing::debug!("Adopted {} as {}", source.display(), path.display());
        Ok(self.core.track(key, ManagedFile::new(path, file, false)))
    }

    /// Number of tracked files
    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.core.contains(&name.to_string())
    }
}

impl Manager for PermanentFileManager {
    type Key = String;
    type Resource = ManagedFile;

    /// Create a new file; `AlreadyExists` if one is already on disk
    fn create(&self, name: &str) -> Result<Acquired<String, ManagedFile>> {
        let key = name.to_string();
        if let Some(acquired) = self.core.lookup(&key) {
            return Ok(acquired);
        }

        let path = self.core.resolve(name)?;
        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(path));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.core.track(key, ManagedFile::new(path, file, true)))
    }

    fn path(&self) -> &Path {
        self.core.path()
    }

    fn close(&mut self) -> Result<()> {
        self.core.close()
    }
}

impl OpenManager for PermanentFileManager {
    /// Open an existing file for reading; `DoesNotExist` if it is absent,
    /// `NotAFile` if the name refers to a directory
    fn open(&self, name: &str) -> Result<Acquired<String, ManagedFile>> {
        let key = name.to_string();
        if let Some(acquired) = self.core.lookup(&key) {
            return Ok(acquired);
        }

        let path = self.core.resolve(name)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::DoesNotExist(path));
            }
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.is_dir() {
            return Err(StoreError::NotAFile(path));
        }

        Ok(self.core.track(key, ManagedFile::new(path, file, false)))
    }
}
