//! Entry invalidation for changed sources
//!
//! The cache never checks whether an entry is stale. Whatever observes
//! source changes (the CLI's watch mode) reports changed paths here, and the
//! matching entries are removed so the next build recompiles them.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::cache::{ArtifactCache, CacheStore, Namespace, Result};
use crate::paths::{is_stylesheet, PathSet, ResolvedBuild};

/// Removes cache entries of one build when their sources change
#[derive(Debug, Clone)]
pub struct Invalidator {
    cache: ArtifactCache,
    namespace: Namespace,
    path_set: PathSet,
}

impl Invalidator {
    /// Invalidator for the cache location of `build`
    pub fn for_build(build: &ResolvedBuild, store: &CacheStore) -> Result<Self> {
        let (store, namespace) = build.identity.cache_target(store)?;
        Ok(Self {
            cache: ArtifactCache::new(store),
            namespace,
            path_set: build.path_set.clone(),
        })
    }

    /// Remove the entries for every changed source under the path set.
    ///
    /// A changed stylesheet drops its own entry. A path that no longer exists
    /// (a removed or renamed-away directory) also drops every entry recorded
    /// beneath it. Directories still on disk only report metadata changes and
    /// keep their entries. Paths outside the path set and other files are
    /// ignored. Returns the paths whose entries were removed.
    pub fn invalidate<I, P>(&self, changed: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut invalidated = Vec::new();
        for path in changed {
            let path = path.as_ref();
            if !self.path_set.contains(path) {
                continue;
            }
            if !path.exists() && self.cache.remove_tree(&self.namespace, path)? {
                info!("Invalidated everything under {:?}", path);
            } else if is_stylesheet(path) {
                self.cache.remove(&self.namespace, path)?;
                info!("Invalidated {:?}", path);
            } else {
                continue;
            }
            invalidated.push(path.to_path_buf());
        }
        Ok(invalidated)
    }

    /// Drop every entry of this build
    pub fn invalidate_all(&self) -> Result<()> {
        self.cache.clear_namespace(&self.namespace)
    }

    pub fn path_set(&self) -> &PathSet {
        &self.path_set
    }
}
