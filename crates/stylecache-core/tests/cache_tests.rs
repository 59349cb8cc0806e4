use std::path::{Path, PathBuf};
use stylecache_core::{ArtifactCache, CacheItem, CacheStore, Nested, Namespace};
use tempfile::TempDir;

fn open_cache() -> (TempDir, ArtifactCache) {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path().join(".build")).unwrap();
    (temp_dir, ArtifactCache::new(store))
}

#[test]
fn test_round_trip_per_namespace() {
    let (_dir, cache) = open_cache();
    let ns = Namespace::new(["builds", "dev"]).unwrap();
    let source = Path::new("/project/css/mixin.styl");

    cache.set(&ns, source, "body").unwrap();

    assert_eq!(cache.get(&ns, source).unwrap().as_deref(), Some("body"));
    assert!(cache
        .entry_path(&ns, source)
        .starts_with(cache.store().root().join("builds").join("dev")));
}

#[test]
fn test_entry_is_plain_compiled_text() {
    let (_dir, cache) = open_cache();
    let ns = Namespace::parse("abc").unwrap();
    let source = Path::new("/project/css/normalize.css");

    cache.set(&ns, source, "html{}").unwrap();

    let raw = std::fs::read_to_string(cache.entry_path(&ns, source)).unwrap();
    assert_eq!(raw, "html{}");
}

#[test]
fn test_presence_is_the_only_validity_signal() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("a.css");
    std::fs::write(&source, "old").unwrap();

    let store = CacheStore::open(temp_dir.path().join(".build")).unwrap();
    let cache = ArtifactCache::new(store);
    let ns = Namespace::parse("n").unwrap();
    cache.set(&ns, &source, "compiled old").unwrap();

    // Editing the source does not invalidate the entry.
    std::fs::write(&source, "new").unwrap();
    assert_eq!(
        cache.get(&ns, &source).unwrap().as_deref(),
        Some("compiled old")
    );

    cache.remove(&ns, &source).unwrap();
    assert_eq!(cache.get(&ns, &source).unwrap(), None);
}

#[test]
fn test_clear_empties_every_namespace() {
    let (_dir, cache) = open_cache();
    let first = Namespace::parse("first").unwrap();
    let second = Namespace::new(["second", "nested"]).unwrap();
    let sources = [Path::new("/a.css"), Path::new("/b/c.styl")];

    for source in sources {
        cache.set(&first, source, "x").unwrap();
        cache.set(&second, source, "y").unwrap();
    }
    cache.clear().unwrap();

    for source in sources {
        assert_eq!(cache.get(&first, source).unwrap(), None);
        assert_eq!(cache.get(&second, source).unwrap(), None);
    }
}

#[test]
fn test_clear_on_missing_root_is_ok() {
    let temp_dir = TempDir::new().unwrap();
    let cache = ArtifactCache::new(CacheStore::at(temp_dir.path().join("never-created")));

    cache.clear().unwrap();
}

#[test]
fn test_load_preserves_input_order() {
    let (_dir, cache) = open_cache();
    let ns = Namespace::parse("n").unwrap();
    cache.set(&ns, Path::new("/p2.css"), "2").unwrap();
    cache.set(&ns, Path::new("/p1.css"), "1").unwrap();

    let loaded = cache
        .load(
            &ns,
            vec![
                PathBuf::from("/p1.css"),
                PathBuf::from("/missing.css"),
                PathBuf::from("/p2.css"),
            ],
        )
        .unwrap();

    assert_eq!(loaded, vec![PathBuf::from("/p1.css"), PathBuf::from("/p2.css")]);
}

#[test]
fn test_load_flattens_nested_paths() {
    let (_dir, cache) = open_cache();
    let ns = Namespace::parse("n").unwrap();
    cache.set(&ns, Path::new("/a.css"), "a").unwrap();

    let input: Nested<PathBuf> = Nested::Many(vec![
        vec![PathBuf::from("/a.css")].into(),
        Nested::Empty,
        vec![vec![PathBuf::from("/a.css")]].into(),
    ]);
    let loaded = cache.load(&ns, input).unwrap();

    assert_eq!(loaded, vec![PathBuf::from("/a.css"), PathBuf::from("/a.css")]);
}

#[test]
fn test_save_passes_items_through() {
    let (_dir, cache) = open_cache();
    let ns = Namespace::parse("n").unwrap();
    let items = vec![
        CacheItem::new("/x/a.styl", ".a{}"),
        CacheItem::new("/x/b.css", ".b{}"),
    ];

    let saved = cache.save(&ns, items.clone()).unwrap();

    assert_eq!(saved, items);
    for item in &items {
        assert_eq!(cache.get(&ns, &item.path).unwrap().as_deref(), Some(item.css.as_str()));
    }
}

#[test]
fn test_distinct_sources_get_distinct_locations() {
    let (_dir, cache) = open_cache();
    let ns = Namespace::parse("n").unwrap();
    let sources = [
        "/a/b.css",
        "a/b.css",
        "../a/b.css",
        "@up/a/b.css",
        "/@root/a/b.css",
        "/a/@b.css",
        "/a/b.css.css",
    ];

    let mut locations: Vec<PathBuf> = sources
        .iter()
        .map(|s| cache.entry_path(&ns, Path::new(s)))
        .collect();
    locations.sort();
    locations.dedup();

    assert_eq!(locations.len(), sources.len());
}

#[cfg(unix)]
#[test]
fn test_write_failure_is_reported() {
    use std::os::unix::fs::PermissionsExt;
    use stylecache_core::CacheError;

    let (_dir, cache) = open_cache();
    let ns = Namespace::parse("locked").unwrap();
    let dir = ns.dir(cache.store().root());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o500)).unwrap();

    let result = cache.set(&ns, Path::new("/a.css"), "x");

    std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)).unwrap();
    // Root ignores permission bits; only assert when the write was refused.
    if let Err(err) = result {
        assert!(matches!(err, CacheError::Io { .. }));
    }
}
