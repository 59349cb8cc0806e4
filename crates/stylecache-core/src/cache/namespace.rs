use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use super::{CacheError, Result, MARKER};

const ROOT_SEGMENT: &str = "@root";
const RELATIVE_SEGMENT: &str = "@rel";
const PARENT_SEGMENT: &str = "@up";
const DRIVE_PREFIX: &str = "@drive-";

/// A cache partition key: an ordered list of directory segments under the
/// cache root.
///
/// Literal segments that start with the marker character are escaped the
/// same way entry components are, so the first unescaped marker segment
/// always starts the entry part of a location. Two different namespaces
/// therefore never share an entry location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    /// The empty namespace: entries live directly under the store root
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a namespace from segments.
    ///
    /// Segments containing path separators are split, empty pieces are
    /// skipped, and `.`/`..` are rejected so a namespace can never point
    /// outside the store root.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = Vec::new();
        for segment in segments {
            for piece in segment.as_ref().split(['/', '\\']) {
                match piece {
                    "" => continue,
                    "." | ".." => {
                        return Err(CacheError::InvalidNamespace {
                            segment: piece.to_string(),
                        })
                    }
                    _ => parts.push(piece.to_string()),
                }
            }
        }
        Ok(Self { segments: parts })
    }

    /// Parse a single `/`-separated namespace string
    pub fn parse(value: &str) -> Result<Self> {
        Self::new([value])
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Directory holding every entry of this namespace
    pub fn dir(&self, cache_root: &Path) -> PathBuf {
        let mut dir = cache_root.to_path_buf();
        for segment in &self.segments {
            dir.push(escape_segment(OsStr::new(segment)));
        }
        dir
    }

    /// On-disk location of the entry for `source` in this namespace
    pub fn entry_path(&self, cache_root: &Path, source: &Path) -> PathBuf {
        self.dir(cache_root).join(entry_relative_path(source))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

/// Turn a source path into a relative, collision-free path for the cache.
///
/// - absolute paths start with `@root` (and `@drive-<prefix>` on Windows)
/// - relative paths start with `@rel`
/// - `..` becomes `@up`, `.` is dropped
/// - literal components starting with `@` get a second `@`
pub fn entry_relative_path(source: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut components = source.components().peekable();

    if !matches!(
        components.peek(),
        Some(Component::Prefix(_)) | Some(Component::RootDir)
    ) {
        out.push(RELATIVE_SEGMENT);
    }

    for component in components {
        match component {
            Component::Prefix(prefix) => {
                out.push(format!("{}{}", DRIVE_PREFIX, sanitize_prefix(prefix.as_os_str())))
            }
            Component::RootDir => out.push(ROOT_SEGMENT),
            Component::CurDir => {}
            Component::ParentDir => out.push(PARENT_SEGMENT),
            Component::Normal(name) => out.push(escape_segment(name)),
        }
    }

    out
}

/// True for the directory names that start an entry path (`@root`, `@rel`,
/// `@drive-*`). Namespace directories and foreign files never match.
pub(crate) fn is_entry_root(name: &OsStr) -> bool {
    match name.to_str() {
        Some(name) => {
            name == ROOT_SEGMENT || name == RELATIVE_SEGMENT || name.starts_with(DRIVE_PREFIX)
        }
        None => false,
    }
}

fn escape_segment(name: &OsStr) -> OsString {
    if name.as_encoded_bytes().first() == Some(&(MARKER as u8)) {
        let mut escaped = OsString::from(MARKER.to_string());
        escaped.push(name);
        escaped
    } else {
        name.to_os_string()
    }
}

fn sanitize_prefix(prefix: &OsStr) -> String {
    prefix
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
