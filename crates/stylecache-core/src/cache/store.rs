use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CacheError, Result, CACHE_DIR_NAME};

/// Handle to a cache root directory.
///
/// Every namespace lives beneath the root. The store is a plain value, so
/// tests and separate builds can point at isolated roots instead of sharing
/// one process-wide location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open the store at `root`, creating the directory if it is absent
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| CacheError::io(&root, e))?;
        debug!("Opened cache store at {:?}", root);
        Ok(Self { root })
    }

    /// Open the default store for a project: `<project_root>/.build`
    pub fn in_project(project_root: &Path) -> Result<Self> {
        Self::open(project_root.join(CACHE_DIR_NAME))
    }

    /// Refer to a root without touching the file system
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
