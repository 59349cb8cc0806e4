use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::namespace::is_entry_root;
use super::{CacheError, CacheStore, Namespace, Result};
use crate::nested::Nested;

/// A compiled stylesheet ready to be written to the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    /// Path of the source file the CSS was compiled from
    pub path: PathBuf,
    /// The compiled CSS
    pub css: String,
}

impl CacheItem {
    pub fn new(path: impl Into<PathBuf>, css: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            css: css.into(),
        }
    }
}

/// Reads and writes compiled CSS under a [`CacheStore`].
///
/// Calls are blocking and unsynchronized. Concurrent `set`s for the same
/// entry are last-writer-wins, and a `clear` racing with writes leaves the
/// store in an unspecified state; callers that need exclusivity must
/// serialize themselves.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    store: CacheStore,
}

impl ArtifactCache {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// On-disk location of the entry for `source` in `ns`
    pub fn entry_path(&self, ns: &Namespace, source: &Path) -> PathBuf {
        ns.entry_path(self.store.root(), source)
    }

    /// Read the cached CSS for `source`.
    ///
    /// Returns `Ok(None)` when nothing is cached; any other read failure is
    /// an error.
    pub fn get(&self, ns: &Namespace, source: &Path) -> Result<Option<String>> {
        let entry = self.entry_path(ns, source);
        match std::fs::read_to_string(&entry) {
            Ok(css) => Ok(Some(css)),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(CacheError::io(entry, e)),
        }
    }

    /// Write `css` for `source`, replacing any previous entry
    pub fn set(&self, ns: &Namespace, source: &Path, css: &str) -> Result<()> {
        let entry = self.entry_path(ns, source);
        if let Some(parent) = entry.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
        std::fs::write(&entry, css).map_err(|e| CacheError::io(&entry, e))?;
        debug!("Cached {:?} in namespace {}", source, ns);
        Ok(())
    }

    /// Delete the entry for `source`. Missing entries are not an error.
    pub fn remove(&self, ns: &Namespace, source: &Path) -> Result<()> {
        let entry = self.entry_path(ns, source);
        match std::fs::remove_file(&entry) {
            Ok(()) => {
                debug!("Removed cache entry {:?}", entry);
                Ok(())
            }
            Err(e) if is_absent(&e) => Ok(()),
            Err(e) => Err(CacheError::io(entry, e)),
        }
    }

    /// Delete every namespace and entry under the cache root.
    ///
    /// The root directory itself is kept so the store stays usable.
    pub fn clear(&self) -> Result<()> {
        let root = self.store.root();
        let children = match std::fs::read_dir(root) {
            Ok(children) => children,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(root, e)),
        };

        for child in children {
            let child = child.map_err(|e| CacheError::io(root, e))?;
            remove_path(&child.path())?;
        }

        info!("Cache cleared at {:?}", root);
        Ok(())
    }

    /// Delete one namespace and everything in it.
    ///
    /// For the root namespace only the entry trees directly under the store
    /// root are removed; other namespaces and files the cache did not write
    /// stay where they are.
    pub fn clear_namespace(&self, ns: &Namespace) -> Result<()> {
        if ns.is_root() {
            return self.clear_root_entries();
        }
        let dir = ns.dir(self.store.root());
        match remove_path(&dir) {
            Err(CacheError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }?;
        info!("Cleared cache namespace {}", ns);
        Ok(())
    }

    fn clear_root_entries(&self) -> Result<()> {
        let root = self.store.root();
        let children = match std::fs::read_dir(root) {
            Ok(children) => children,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(root, e)),
        };

        for child in children {
            let child = child.map_err(|e| CacheError::io(root, e))?;
            if is_entry_root(&child.file_name()) {
                remove_path(&child.path())?;
            }
        }

        info!("Cleared root namespace entries at {:?}", root);
        Ok(())
    }

    /// Delete every entry recorded beneath the source directory `source_dir`.
    ///
    /// Returns `false` when nothing under that directory is cached.
    pub fn remove_tree(&self, ns: &Namespace, source_dir: &Path) -> Result<bool> {
        let dir = self.entry_path(ns, source_dir);
        match std::fs::symlink_metadata(&dir) {
            Ok(metadata) if metadata.is_dir() => {
                std::fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
                debug!("Removed cache entries under {:?}", dir);
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) if is_absent(&e) => Ok(false),
            Err(e) => Err(CacheError::io(dir, e)),
        }
    }

    /// Return the paths, in input order, that already have a cached entry
    pub fn load(&self, ns: &Namespace, paths: impl Into<Nested<PathBuf>>) -> Result<Vec<PathBuf>> {
        let mut present = Vec::new();
        for path in paths.into().flatten() {
            if self.get(ns, &path)?.is_some() {
                present.push(path);
            }
        }
        Ok(present)
    }

    /// Write every item to the cache and hand the items back unchanged
    pub fn save(
        &self,
        ns: &Namespace,
        items: impl Into<Nested<CacheItem>>,
    ) -> Result<Vec<CacheItem>> {
        let items = items.into().flatten();
        for item in &items {
            self.set(ns, &item.path, &item.css)?;
        }
        Ok(items)
    }
}

fn is_absent(error: &std::io::Error) -> bool {
    error.kind() == ErrorKind::NotFound
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| CacheError::io(path, e))?;
    let removed = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| CacheError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, ArtifactCache) {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::open(temp_dir.path().join(".build")).unwrap();
        (temp_dir, ArtifactCache::new(store))
    }

    fn ns(name: &str) -> Namespace {
        Namespace::parse(name).unwrap()
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, cache) = cache();
        let source = Path::new("/project/css/mixin.styl");

        cache.set(&ns("build"), source, "body { color: red }").unwrap();

        assert_eq!(
            cache.get(&ns("build"), source).unwrap().as_deref(),
            Some("body { color: red }")
        );
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_dir, cache) = cache();
        assert_eq!(cache.get(&ns("build"), Path::new("/nope.css")).unwrap(), None);
    }

    #[test]
    fn test_empty_content_is_present() {
        let (_dir, cache) = cache();
        let source = Path::new("/empty.css");

        cache.set(&ns("build"), source, "").unwrap();

        assert_eq!(cache.get(&ns("build"), source).unwrap(), Some(String::new()));
    }

    #[test]
    fn test_set_overwrites() {
        let (_dir, cache) = cache();
        let source = Path::new("/a.css");

        cache.set(&ns("build"), source, "first").unwrap();
        cache.set(&ns("build"), source, "second").unwrap();

        assert_eq!(cache.get(&ns("build"), source).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let (_dir, cache) = cache();
        let source = Path::new("/a.css");

        cache.set(&ns("one"), source, "one").unwrap();

        assert_eq!(cache.get(&ns("two"), source).unwrap(), None);
        assert_eq!(cache.get(&ns("one"), source).unwrap().as_deref(), Some("one"));
    }

    #[test]
    fn test_remove_and_remove_missing() {
        let (_dir, cache) = cache();
        let source = Path::new("/a.css");

        cache.set(&ns("build"), source, "x").unwrap();
        cache.remove(&ns("build"), source).unwrap();
        assert_eq!(cache.get(&ns("build"), source).unwrap(), None);

        cache.remove(&ns("build"), source).unwrap();
        cache.remove(&ns("never"), Path::new("/never.css")).unwrap();
    }

    #[test]
    fn test_clear_keeps_root() {
        let (_dir, cache) = cache();
        cache.set(&ns("a"), Path::new("/a.css"), "a").unwrap();
        cache.set(&ns("b"), Path::new("/b.css"), "b").unwrap();

        cache.clear().unwrap();

        assert!(cache.store().root().is_dir());
        assert_eq!(std::fs::read_dir(cache.store().root()).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_namespace_only_touches_that_namespace() {
        let (_dir, cache) = cache();
        cache.set(&ns("a"), Path::new("/x.css"), "a").unwrap();
        cache.set(&ns("b"), Path::new("/x.css"), "b").unwrap();

        cache.clear_namespace(&ns("a")).unwrap();
        cache.clear_namespace(&ns("missing")).unwrap();

        assert_eq!(cache.get(&ns("a"), Path::new("/x.css")).unwrap(), None);
        assert_eq!(cache.get(&ns("b"), Path::new("/x.css")).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_load_and_save() {
        let (_dir, cache) = cache();
        let items = vec![CacheItem::new("/a.css", "a"), CacheItem::new("/c.css", "c")];

        let saved = cache.save(&ns("build"), items.clone()).unwrap();
        assert_eq!(saved, items);

        let loaded = cache
            .load(
                &ns("build"),
                vec![PathBuf::from("/a.css"), PathBuf::from("/b.css"), PathBuf::from("/c.css")],
            )
            .unwrap();
        assert_eq!(loaded, vec![PathBuf::from("/a.css"), PathBuf::from("/c.css")]);
    }

    #[test]
    fn test_get_on_directory_entry_is_an_error() {
        let (_dir, cache) = cache();
        cache.set(&ns("build"), Path::new("/dir/a.css"), "a").unwrap();

        // The entry for "/dir" is a directory holding "/dir/a.css".
        let result = cache.get(&ns("build"), Path::new("/dir"));

        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[test]
    fn test_clear_root_namespace_keeps_foreign_files() {
        let (_dir, cache) = cache();
        let root = cache.store().root().to_path_buf();
        std::fs::write(root.join("keep-me.txt"), "mine").unwrap();
        std::fs::create_dir(root.join("assets")).unwrap();
        cache.set(&Namespace::root(), Path::new("/a.css"), "a").unwrap();
        cache.set(&Namespace::root(), Path::new("rel.css"), "r").unwrap();
        cache.set(&ns("other"), Path::new("/a.css"), "other").unwrap();

        cache.clear_namespace(&Namespace::root()).unwrap();

        assert_eq!(cache.get(&Namespace::root(), Path::new("/a.css")).unwrap(), None);
        assert_eq!(cache.get(&Namespace::root(), Path::new("rel.css")).unwrap(), None);
        assert_eq!(
            cache.get(&ns("other"), Path::new("/a.css")).unwrap().as_deref(),
            Some("other")
        );
        assert_eq!(std::fs::read_to_string(root.join("keep-me.txt")).unwrap(), "mine");
        assert!(root.join("assets").is_dir());
    }

    #[test]
    fn test_remove_tree() {
        let (_dir, cache) = cache();
        cache.set(&ns("build"), Path::new("/css/child/a.styl"), "a").unwrap();
        cache.set(&ns("build"), Path::new("/css/child/deep/b.styl"), "b").unwrap();
        cache.set(&ns("build"), Path::new("/css/c.css"), "c").unwrap();

        assert!(cache.remove_tree(&ns("build"), Path::new("/css/child")).unwrap());
        assert!(!cache.remove_tree(&ns("build"), Path::new("/css/child")).unwrap());
        assert!(!cache.remove_tree(&ns("build"), Path::new("/css/c.css")).unwrap());

        assert_eq!(cache.get(&ns("build"), Path::new("/css/child/a.styl")).unwrap(), None);
        assert_eq!(cache.get(&ns("build"), Path::new("/css/child/deep/b.styl")).unwrap(), None);
        assert_eq!(cache.get(&ns("build"), Path::new("/css/c.css")).unwrap().as_deref(), Some("c"));
    }
}
