//! Flattening of arbitrarily nested inputs.
//!
//! Path inputs and the bulk cache operations both accept "one value, or a
//! sequence of values, possibly nested, possibly with holes". [`Nested`]
//! models that shape once so every entry point normalizes the same way.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::cache::CacheItem;

/// A value, a missing value, or a nested sequence of either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nested<T> {
    /// A hole in the input (`null`/`undefined` upstream). Dropped on flatten.
    Empty,
    One(T),
    Many(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Flattens depth-first, preserving order and dropping [`Nested::Empty`].
    pub fn flatten(self) -> Vec<T> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<T>) {
        match self {
            Nested::Empty => {}
            Nested::One(value) => out.push(value),
            Nested::Many(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl<T> Default for Nested<T> {
    fn default() -> Self {
        Nested::Empty
    }
}

impl<T, U> From<Vec<U>> for Nested<T>
where
    U: Into<Nested<T>>,
{
    fn from(items: Vec<U>) -> Self {
        Nested::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<T, U> From<Option<U>> for Nested<T>
where
    U: Into<Nested<T>>,
{
    fn from(value: Option<U>) -> Self {
        value.map(Into::into).unwrap_or(Nested::Empty)
    }
}

impl<T, U, const N: usize> From<[U; N]> for Nested<T>
where
    U: Into<Nested<T>>,
{
    fn from(items: [U; N]) -> Self {
        Nested::Many(items.into_iter().map(Into::into).collect())
    }
}

// Path inputs. Empty paths count as holes; nothing is converted through
// UTF-8, so non-Unicode paths reach the resolver unchanged.

impl From<PathBuf> for Nested<PathBuf> {
    fn from(value: PathBuf) -> Self {
        if value.as_os_str().is_empty() {
            Nested::Empty
        } else {
            Nested::One(value)
        }
    }
}

impl From<&PathBuf> for Nested<PathBuf> {
    fn from(value: &PathBuf) -> Self {
        Nested::from(value.clone())
    }
}

impl From<&Path> for Nested<PathBuf> {
    fn from(value: &Path) -> Self {
        Nested::from(value.to_path_buf())
    }
}

impl From<OsString> for Nested<PathBuf> {
    fn from(value: OsString) -> Self {
        Nested::from(PathBuf::from(value))
    }
}

impl From<&OsStr> for Nested<PathBuf> {
    fn from(value: &OsStr) -> Self {
        Nested::from(PathBuf::from(value))
    }
}

impl From<&str> for Nested<PathBuf> {
    fn from(value: &str) -> Self {
        Nested::from(PathBuf::from(value))
    }
}

impl From<String> for Nested<PathBuf> {
    fn from(value: String) -> Self {
        Nested::from(PathBuf::from(value))
    }
}

impl From<&String> for Nested<PathBuf> {
    fn from(value: &String) -> Self {
        Nested::from(value.as_str())
    }
}

impl From<CacheItem> for Nested<CacheItem> {
    fn from(value: CacheItem) -> Self {
        Nested::One(value)
    }
}
