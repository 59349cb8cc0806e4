use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;
use crate::paths::ResolveError;

/// Failure of the external stylesheet compiler for one source file
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run preprocessor '{program}': {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Compilation of {} failed: {message}", .path.display())]
    Failed { path: PathBuf, message: String },
}

/// Any failure surfaced by a build invocation
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
