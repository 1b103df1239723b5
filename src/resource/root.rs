//! Root directory handle

use std::env;
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// An open directory that a manager (or the store) is rooted at
///
/// Holding the descriptor keeps the directory pinned for the owner's
/// lifetime. The path is kept alongside it since every resource under the
/// root is addressed by joining a name onto it.
#[derive(Debug)]
pub struct RootDir {
    path: PathBuf,
    handle: File,
}

impl RootDir {
    /// Open an existing directory
    ///
    /// Fails with `DoesNotExist` if nothing is at `path` and with
    /// `NotADirectory` if something other than a directory is.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = absolute(path.as_ref())?;

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::DoesNotExist(path));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            return Err(StoreError::NotADirectory(path));
        }

        let handle = open_dir(&path)?;
        tracing::debug!("Opened root directory {}", path.display());

        Ok(Self { path, handle })
    }

    /// Absolute path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final component of the path
    pub fn name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    /// Close the directory handle
    ///
    /// Fails with `CloseFailure` if the directory is no longer present at its
    /// path. The descriptor is released either way.
    pub fn close(self) -> Result<()> {
        let Self { path, handle } = self;
        drop(handle);

        match fs::metadata(&path) {
            Ok(m) if m.is_dir() => {
                tracing::debug!("Closed root directory {}", path.display());
                Ok(())
            }
            Ok(_) => Err(StoreError::CloseFailure {
                source: io::Error::new(io::ErrorKind::Other, "path is no longer a directory"),
                path,
            }),
            Err(source) => Err(StoreError::CloseFailure { path, source }),
        }
    }
}

/// Make `path` absolute without resolving symlinks
pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

#[cfg(windows)]
fn open_dir(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    // FILE_FLAG_BACKUP_SEMANTICS is required to open a directory
    OpenOptions::new()
        .read(true)
        .custom_flags(0x0200_0000)
        .open(path)
}

#[cfg(not(windows))]
fn open_dir(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}
