//! Cache-aware build driver
//!
//! Given a [`ResolvedBuild`], reuse every source that already has a cache
//! entry, compile the rest in parallel, and write the new results back.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::cache::{ArtifactCache, CacheItem, CacheStore, Result};
use crate::compile::StyleCompiler;
use crate::errors::CompileError;
use crate::paths::ResolvedBuild;

/// One source file's CSS in the final output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSource {
    pub path: PathBuf,
    pub css: String,
    /// True when the CSS came from the cache instead of the compiler
    pub from_cache: bool,
}

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct BuildReport {
    /// Successful outputs in source-file order
    pub outputs: Vec<CompiledSource>,
    /// Sources the compiler rejected
    pub failed: Vec<(PathBuf, CompileError)>,
    /// Directory holding this build's cache entries
    pub location: PathBuf,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn reused(&self) -> impl Iterator<Item = &PathBuf> {
        self.outputs.iter().filter(|o| o.from_cache).map(|o| &o.path)
    }

    pub fn compiled(&self) -> impl Iterator<Item = &PathBuf> {
        self.outputs.iter().filter(|o| !o.from_cache).map(|o| &o.path)
    }

    /// All CSS concatenated in source-file order
    pub fn css(&self) -> String {
        self.outputs
            .iter()
            .map(|o| o.css.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs builds against a shared cache store
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    store: CacheStore,
    use_cache: bool,
}

impl BuildPipeline {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            use_cache: true,
        }
    }

    /// Compile everything and leave the cache untouched
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Build every source in `build`.
    ///
    /// Outside watch mode the build's namespace is cleared first, since
    /// nothing else would invalidate entries whose sources changed since the
    /// last run. In watch mode entries are kept and the watcher is trusted to
    /// remove stale ones.
    ///
    /// Compiler failures are collected in the report; only cache I/O aborts
    /// the run.
    pub fn run(&self, build: &ResolvedBuild, compiler: &dyn StyleCompiler) -> Result<BuildReport> {
        let (store, ns) = build.identity.cache_target(&self.store)?;
        let location = ns.dir(store.root());
        let cache = ArtifactCache::new(store);

        let mut cached: FxHashMap<PathBuf, String> = FxHashMap::default();
        if self.use_cache {
            if !build.options.watch {
                cache.clear_namespace(&ns)?;
            }
            for path in &build.source_files {
                if let Some(css) = cache.get(&ns, path)? {
                    cached.insert(path.clone(), css);
                }
            }
        }

        let stale: Vec<&PathBuf> = build
            .source_files
            .iter()
            .filter(|path| !cached.contains_key(*path))
            .collect();

        info!(
            "Building {} source file(s): {} cached, {} to compile",
            build.source_files.len(),
            cached.len(),
            stale.len()
        );

        let results: Vec<(PathBuf, std::result::Result<String, CompileError>)> = stale
            .par_iter()
            .map(|path| ((*path).clone(), compiler.compile(path)))
            .collect();

        let mut fresh = Vec::new();
        let mut failed = Vec::new();
        for (path, result) in results {
            match result {
                Ok(css) => fresh.push(CacheItem::new(path, css)),
                Err(e) => {
                    warn!("Failed to compile {:?}: {}", path, e);
                    failed.push((path, e));
                }
            }
        }

        let fresh = if self.use_cache {
            cache.save(&ns, fresh)?
        } else {
            fresh
        };
        debug!("Compiled {} source file(s)", fresh.len());

        let mut fresh: FxHashMap<PathBuf, String> =
            fresh.into_iter().map(|item| (item.path, item.css)).collect();
        let failed_paths: FxHashSet<&PathBuf> = failed.iter().map(|(path, _)| path).collect();

        let mut outputs = Vec::with_capacity(build.source_files.len());
        for path in &build.source_files {
            if failed_paths.contains(path) {
                continue;
            }
            if let Some(css) = cached.remove(path) {
                outputs.push(CompiledSource {
                    path: path.clone(),
                    css,
                    from_cache: true,
                });
            } else if let Some(css) = fresh.remove(path) {
                outputs.push(CompiledSource {
                    path: path.clone(),
                    css,
                    from_cache: false,
                });
            }
        }

        Ok(BuildReport {
            outputs,
            failed,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::paths::PathResolver;
    use crate::PlainCssCompiler;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathResolver, BuildPipeline) {
        let temp_dir = TempDir::new().unwrap();
        let css = temp_dir.path().join("css");
        std::fs::create_dir(&css).unwrap();
        std::fs::write(css.join("a.css"), "a {}").unwrap();
        std::fs::write(css.join("b.css"), "b {}").unwrap();

        let resolver = PathResolver::with_cwd(temp_dir.path());
        let store = CacheStore::open(temp_dir.path().join(".build")).unwrap();
        (temp_dir, resolver, BuildPipeline::new(store))
    }

    #[test]
    fn test_first_run_compiles_everything() {
        let (_dir, resolver, pipeline) = setup();
        let build = resolver.resolve("./css", &BuildOptions::default()).unwrap();

        let report = pipeline.run(&build, &PlainCssCompiler).unwrap();

        assert!(report.is_success());
        assert_eq!(report.compiled().count(), 2);
        assert_eq!(report.reused().count(), 0);
        assert_eq!(report.css(), "a {}\nb {}");
        assert!(report.location.is_dir());
    }

    #[test]
    fn test_watch_mode_reuses_entries() {
        let (_dir, resolver, pipeline) = setup();
        let options = BuildOptions::default().with_watch(true);
        let build = resolver.resolve("./css", &options).unwrap();

        pipeline.run(&build, &PlainCssCompiler).unwrap();
        let report = pipeline.run(&build, &PlainCssCompiler).unwrap();

        assert_eq!(report.reused().count(), 2);
        assert_eq!(report.compiled().count(), 0);
    }

    #[test]
    fn test_non_watch_mode_starts_fresh() {
        let (_dir, resolver, pipeline) = setup();
        let build = resolver.resolve("./css", &BuildOptions::default()).unwrap();

        pipeline.run(&build, &PlainCssCompiler).unwrap();
        let report = pipeline.run(&build, &PlainCssCompiler).unwrap();

        assert_eq!(report.compiled().count(), 2);
        assert_eq!(report.reused().count(), 0);
    }

    #[test]
    fn test_without_cache_writes_nothing() {
        let (_dir, resolver, pipeline) = setup();
        let pipeline = pipeline.without_cache();
        let build = resolver.resolve("./css", &BuildOptions::default()).unwrap();

        let report = pipeline.run(&build, &PlainCssCompiler).unwrap();

        assert_eq!(report.outputs.len(), 2);
        assert!(!report.location.exists());
    }
}
