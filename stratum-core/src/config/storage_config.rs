//! Storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where bundle files and the cross-repository index live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for bundle files and `xrepo.db`.
    pub root: PathBuf,

    /// Filename of the cross-repository index inside `root`.
    pub xrepo_filename: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".stratum"),
            xrepo_filename: "xrepo.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// Full path of the cross-repository index file.
    pub fn xrepo_path(&self) -> PathBuf {
        self.root.join(&self.xrepo_filename)
    }
}
