//! Configuration for handlestore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Topic holding lazily materialized cache entries
pub const TOPIC_CACHE: &str = "cache";

/// Topic holding images
pub const TOPIC_IMAGES: &str = "images";

/// Topic holding permanent, adopted files
pub const TOPIC_GOLD: &str = "gold";

/// Topic under which temporary directories are created
pub const TOPIC_TMP: &str = "tmp";

/// Main configuration for a Store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all topics
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── cache/
    ///     ├── images/
    ///     ├── gold/
    ///     └── tmp/
    pub data_dir: PathBuf,

    /// Topic subdirectories bootstrapped on open
    pub topics: Vec<String>,

    /// Permission bits applied to the base and every topic directory (unix only)
    pub dir_mode: u32,

    // -------------------------------------------------------------------------
    // Temporary File Configuration
    // -------------------------------------------------------------------------
    /// Number of random characters appended to temporary file and directory names
    pub temp_suffix_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./handlestore_data"),
            topics: [TOPIC_CACHE, TOPIC_IMAGES, TOPIC_GOLD, TOPIC_TMP]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            dir_mode: 0o775,
            temp_suffix_len: 6,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.temp_suffix_len == 0 {
            return Err(StoreError::Config(
                "temp_suffix_len must be at least 1".to_string(),
            ));
        }

        for topic in &self.topics {
            if topic.is_empty()
                || topic.contains(|c: char| c == '/' || c == '\\')
                || topic == "."
                || topic == ".."
            {
                return Err(StoreError::Config(format!(
                    "Invalid topic name: {:?}",
                    topic
                )));
            }
        }

        if !self.topics.iter().any(|t| t == TOPIC_TMP) {
            return Err(StoreError::Config(format!(
                "The '{}' topic is required",
                TOPIC_TMP
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all topics)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Replace the list of topics
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single topic on top of the defaults
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        if !self.config.topics.contains(&topic) {
            self.config.topics.push(topic);
        }
        self
    }

    /// Set the directory permission bits
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.config.dir_mode = mode;
        self
    }

    /// Set the length of random temporary name suffixes
    pub fn temp_suffix_len(mut self, len: usize) -> Self {
        self.config.temp_suffix_len = len;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
