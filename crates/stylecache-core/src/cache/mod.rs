//! On-disk artifact cache for compiled stylesheets
//!
//! Compiled CSS is stored as one plain file per source path, grouped under a
//! namespace directory. There is no manifest and no content hash: a file
//! being present is the only validity signal, so callers must invalidate
//! entries themselves (see [`crate::invalidation`]) when sources change.

mod artifact;
mod error;
mod namespace;
mod store;

pub use artifact::{ArtifactCache, CacheItem};
pub use error::{CacheError, Result};
pub use namespace::{entry_relative_path, Namespace};
pub use store::CacheStore;

/// Default cache directory name, created under the project root
pub const CACHE_DIR_NAME: &str = ".build";

/// Marker character for synthetic path segments in the entry layout
pub const MARKER: char = '@';
