//! Store Module
//!
//! Bootstraps a base directory into topics and hands out managers.
//!
//! ## Layout
//! ```text
//!   {data_dir}/
//!     ├── cache/    DeferredFileManager
//!     ├── images/   PermanentFileManager
//!     ├── gold/     PermanentFileManager
//!     └── tmp/      one unique directory per temporary scope
//! ```

mod temporary;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{Config, TOPIC_TMP};
use crate::error::{Result, StoreError};
use crate::manager::{DeferredFileManager, EphemeralFileManager, PermanentFileManager};
use crate::resource::{absolute, RootDir};

pub use temporary::TemporaryDir;

/// A local on-disk store rooted at `config.data_dir`
///
/// Holds an open handle on the base directory and on every topic for its
/// whole lifetime. Managers handed out by the store open their own handle
/// on the topic, so they can be closed independently of the store.
pub struct Store {
    config: Config,
    base: PathBuf,
    root: Option<RootDir>,
    topics: BTreeMap<String, RootDir>,
}

impl Store {
    /// Open or create a store
    ///
    /// On startup:
    /// 1. Create the base directory if it doesn't exist
    /// 2. Open a handle on it
    /// 3. Create, chmod and open every configured topic
    ///
    /// Topic failures are logged one by one and reported together as
    /// `StoreError::Topics`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let base = absolute(&config.data_dir)?;

        match fs::metadata(&base) {
            Ok(m) if m.is_dir() => {}
            Ok(_) => return Err(StoreError::NotADirectory(base)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&base)?;
                set_mode(&base, config.dir_mode)?;
                tracing::info!("Created store directory {}", base.display());
            }
            Err(e) => return Err(e.into()),
        }

        let root = RootDir::open(&base)?;

        let mut store = Self {
            config,
            base,
            root: Some(root),
            topics: BTreeMap::new(),
        };

        if let Err(e) = store.open_topics() {
            if let Err(close_err) = store.close() {
                tracing::warn!("Error closing partially opened store: {}", close_err);
            }
            return Err(e);
        }

        tracing::debug!(
            "Store ready at {} with topics {:?}",
            store.base.display(),
            store.topics.keys().collect::<Vec<_>>()
        );
        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Base directory of the store
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of a configured topic
    pub fn topic_path(&self, topic: &str) -> Result<&Path> {
        self.topics
            .get(topic)
            .map(RootDir::path)
            .ok_or_else(|| StoreError::UnknownTopic(topic.to_string()))
    }

    /// Names of the open topics
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    /// Manager for persistent files in `topic`
    pub fn permanent(&self, topic: &str) -> Result<PermanentFileManager> {
        Ok(PermanentFileManager::new(self.topic_root(topic)?))
    }

    /// Manager for cache slots in `topic`
    pub fn cache(&self, topic: &str) -> Result<DeferredFileManager> {
        Ok(DeferredFileManager::new(self.topic_root(topic)?))
    }

    /// Manager for scratch files directly in `topic`
    pub fn ephemeral(&self, topic: &str) -> Result<EphemeralFileManager> {
        Ok(EphemeralFileManager::new(self.topic_root(topic)?)
            .with_suffix_len(self.config.temp_suffix_len))
    }

    /// Create a uniquely named directory under the `tmp` topic
    ///
    /// The returned scope owns an EphemeralFileManager rooted at the new
    /// directory. Exiting the scope (or dropping it) closes the manager and
    /// removes the directory with everything in it.
    pub fn temporary_dir(&self, prefix: &str) -> Result<TemporaryDir> {
        let tmp = self.topic_path(TOPIC_TMP)?;

        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .rand_bytes(self.config.temp_suffix_len)
            .tempdir_in(tmp)?;
        let path = dir.keep();

        let root = match RootDir::open(&path) {
            Ok(root) => root,
            Err(e) => {
                if let Err(rm) = fs::remove_dir_all(&path) {
                    tracing::warn!(
                        "Unable to remove temporary directory {}: {}",
                        path.display(),
                        rm
                    );
                }
                return Err(e);
            }
        };

        let manager = EphemeralFileManager::new(root).with_suffix_len(self.config.temp_suffix_len);
        tracing::debug!("Entered temporary scope {}", path.display());
        Ok(TemporaryDir::new(path, manager))
    }

    /// Close every topic handle, then the base directory
    ///
    /// Only the base directory's close error is returned. Closing twice is
    /// a logged no-op.
    pub fn close(&mut self) -> Result<()> {
        for (topic, root) in std::mem::take(&mut self.topics) {
            if let Err(e) = root.close() {
                tracing::warn!("Error closing storage topic {}: {}", topic, e);
            }
        }

        let Some(root) = self.root.take() else {
            tracing::warn!("Store at {} is already closed", self.base.display());
            return Ok(());
        };

        root.close().map_err(|e| {
            tracing::warn!("There was an issue trying to close the local storage: {}", e);
            e
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn topic_root(&self, topic: &str) -> Result<RootDir> {
        RootDir::open(self.topic_path(topic)?)
    }

    /// Bootstrap every configured topic, collecting failures
    fn open_topics(&mut self) -> Result<()> {
        let mut failed = Vec::new();

        for topic in &self.config.topics {
            let path = self.base.join(topic);
            match bootstrap_topic(&path, self.config.dir_mode) {
                Ok(root) => {
                    self.topics.insert(topic.clone(), root);
                }
                Err(e) => {
                    tracing::error!("Unable to initialize store topic {}: {}", topic, e);
                    failed.push(topic.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Topics(failed))
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.root.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("Error closing store on drop: {}", e);
            }
        }
    }
}

/// Create (if needed), chmod and open one topic directory
fn bootstrap_topic(path: &Path, mode: u32) -> Result<RootDir> {
    match fs::metadata(path) {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Err(StoreError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir(path)?,
        Err(e) => return Err(e.into()),
    }

    set_mode(path, mode)?;
    RootDir::open(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
