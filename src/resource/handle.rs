//! Shared resource handle
//!
//! The stream type handed back by every manager.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// A shared, lockable handle to a tracked resource
///
/// Re-requesting a name that a manager already tracks returns a clone of the
/// same handle, so every holder reads and writes through one file position.
/// `Read`/`Write`/`Seek` lock the resource for the duration of each call;
/// use `lock()` to reach resource-specific methods such as
/// `ScopedResource::load`.
pub struct Handle<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Handle<R> {
    pub(crate) fn new(resource: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(resource)),
        }
    }

    /// Lock the underlying resource
    pub fn lock(&self) -> MutexGuard<'_, R> {
        self.inner.lock()
    }

    /// Whether two handles refer to the same tracked resource
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R> Clone for Handle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(resource) => f.debug_tuple("Handle").field(&*resource).finish(),
            None => f.debug_tuple("Handle").field(&"<locked>").finish(),
        }
    }
}

impl<R: Read> Read for Handle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.lock().read(buf)
    }
}

impl<R: Write> Write for Handle<R> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<R: Seek> Seek for Handle<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().seek(pos)
    }
}
