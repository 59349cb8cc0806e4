//! Path resolution for stylesheet builds
//!
//! Turns user-supplied path input into a validated [`PathSet`], discovers
//! the stylesheet sources beneath it, and derives the [`BuildIdentity`] that
//! names the build's cache namespace.

use indexmap::IndexSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::cache::{CacheStore, Namespace};
use crate::config::BuildOptions;
use crate::nested::Nested;

/// File extensions picked up by discovery: preprocessed and plain CSS
pub const STYLESHEET_EXTENSIONS: &[&str] = &["styl", "css"];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No stylesheet folder path was specified")]
    InvalidInput,

    #[error("The stylesheet folder path '{}' does not exist", .path.display())]
    PathNotFound { path: PathBuf },

    #[error("The stylesheet folder path '{}' is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("Cannot access '{}': {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list '{}': {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(
        "The build path '{}' overlaps the stylesheet folder '{}'",
        .build_path.display(),
        .member.display()
    )]
    BuildPathOverlap { build_path: PathBuf, member: PathBuf },

    #[error("Failed to determine the working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

/// Validated, deduplicated, absolute input directories in first-seen order.
///
/// Only [`PathResolver`] builds one, so every member is known to exist and
/// to be a directory, and the set is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    paths: Vec<PathBuf>,
}

impl PathSet {
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// True when `path` is one of the members or lies beneath one
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|dir| path.starts_with(dir))
    }

    /// Digest of the members in order.
    ///
    /// Each member is framed by its byte length so that no two different
    /// sets feed the hasher the same byte stream.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for path in &self.paths {
            let bytes = path.as_os_str().as_encoded_bytes();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Names the cache location of one build
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildIdentity {
    /// Hex digest of the path set, used as a directory under the cache root
    Digest(String),
    /// Caller-supplied absolute build directory
    Custom(PathBuf),
}

impl BuildIdentity {
    /// Directory where this build's entries live
    pub fn location(&self, store: &CacheStore) -> PathBuf {
        match self {
            BuildIdentity::Digest(hash) => store.root().join(hash),
            BuildIdentity::Custom(path) => path.clone(),
        }
    }

    /// Store and namespace to use for this build's cache entries.
    ///
    /// Digest identities share `store` and get their own namespace. A custom
    /// build path becomes a store of its own with the root namespace, so
    /// clearing it never reaches into the shared cache root.
    pub fn cache_target(&self, store: &CacheStore) -> crate::cache::Result<(CacheStore, Namespace)> {
        match self {
            BuildIdentity::Digest(hash) => Ok((store.clone(), Namespace::parse(hash)?)),
            BuildIdentity::Custom(path) => Ok((CacheStore::open(path)?, Namespace::root())),
        }
    }
}

impl fmt::Display for BuildIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildIdentity::Digest(hash) => write!(f, "{}", hash),
            BuildIdentity::Custom(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Everything a build driver needs from resolution
#[derive(Debug, Clone)]
pub struct ResolvedBuild {
    pub path_set: PathSet,
    pub source_files: Vec<PathBuf>,
    pub identity: BuildIdentity,
    pub options: BuildOptions,
}

/// Resolves path input relative to a fixed working directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    cwd: PathBuf,
}

impl PathResolver {
    /// Resolver for the process working directory
    pub fn new() -> Result<Self, ResolveError> {
        let cwd = std::env::current_dir().map_err(ResolveError::WorkingDirectory)?;
        Ok(Self::with_cwd(cwd))
    }

    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: normalize_lexically(&cwd.into()),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Normalize, validate and discover.
    ///
    /// Fails before touching any source file if the input is empty or any
    /// path is missing or not a directory. A custom build path may not be,
    /// contain, or sit inside a stylesheet folder.
    pub fn resolve(
        &self,
        input: impl Into<Nested<PathBuf>>,
        options: &BuildOptions,
    ) -> Result<ResolvedBuild, ResolveError> {
        let path_set = self.path_set(input)?;

        let identity = match options.build_path.as_deref() {
            Some(build_path) if !build_path.as_os_str().is_empty() => {
                let build_path = self.resolve_path(build_path);
                check_build_path(&build_path, &path_set)?;
                BuildIdentity::Custom(build_path)
            }
            _ => BuildIdentity::Digest(path_set.digest()),
        };

        let source_files = discover(&path_set)?;

        debug!(
            "Resolved {} path(s), {} source file(s), identity {}",
            path_set.len(),
            source_files.len(),
            identity
        );

        Ok(ResolvedBuild {
            path_set,
            source_files,
            identity,
            options: options.clone(),
        })
    }

    /// Normalize and validate input into a [`PathSet`] without discovery
    pub fn path_set(&self, input: impl Into<Nested<PathBuf>>) -> Result<PathSet, ResolveError> {
        let paths = self.normalize(input);
        if paths.is_empty() {
            return Err(ResolveError::InvalidInput);
        }
        for path in &paths {
            validate_directory(path)?;
        }
        Ok(PathSet { paths })
    }

    /// Flatten, drop holes, make absolute, dedupe (first occurrence wins)
    pub fn normalize(&self, input: impl Into<Nested<PathBuf>>) -> Vec<PathBuf> {
        input
            .into()
            .flatten()
            .iter()
            .map(|raw| self.resolve_path(raw))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Absolute, lexically clean form of `path`.
    ///
    /// Relative paths (`./css`, `css`, `../shared`) resolve against the
    /// working directory. `.` and `..` components are folded without
    /// touching the file system.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.cwd.join(path))
        }
    }
}

fn validate_directory(path: &Path) -> Result<(), ResolveError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ResolveError::NotADirectory {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ResolveError::PathNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ResolveError::Inaccessible {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// Entries written into a stylesheet folder would be discovered as sources on
// the next run, and a folder inside the build path shares its tree with the
// cache entries.
fn check_build_path(build_path: &Path, path_set: &PathSet) -> Result<(), ResolveError> {
    match path_set
        .iter()
        .find(|member| member.starts_with(build_path) || build_path.starts_with(member))
    {
        Some(member) => Err(ResolveError::BuildPathOverlap {
            build_path: build_path.to_path_buf(),
            member: member.clone(),
        }),
        None => Ok(()),
    }
}

/// Recursively list stylesheet sources under every member of `path_set`.
///
/// Members are walked in order; inside a member, entries are sorted by file
/// name at each level so the result does not depend on directory order.
pub fn discover(path_set: &PathSet) -> Result<Vec<PathBuf>, ResolveError> {
    let mut sources = Vec::new();

    for dir in path_set {
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| ResolveError::Discovery {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone()),
                source: e,
            })?;

            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if is_file && is_stylesheet(entry.path()) {
                sources.push(entry.into_path());
            }
        }
    }

    Ok(sources)
}

/// True when the file extension is one of [`STYLESHEET_EXTENSIONS`]
pub fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| STYLESHEET_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` above the root stays at the root
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
