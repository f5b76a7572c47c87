//! Storage configuration.

use serde::Deserialize;

/// File table configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of files the table accepts
    pub max_files: usize,
    /// Bytes preallocated for each new file's content
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_files: 100,
            initial_capacity: 4096,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with the given file limit.
    pub fn with_max_files(max_files: usize) -> Self {
        Self {
            max_files,
            ..Default::default()
        }
    }
}
