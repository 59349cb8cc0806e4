//! Path resolution and on-disk artifact caching for stylesheet builds.
//!
//! A build starts from one or more input directories. The [`paths`] module
//! turns them into a validated [`PathSet`], the list of stylesheet sources
//! beneath them, and a deterministic [`BuildIdentity`]. The [`cache`] module
//! stores compiled CSS per source file under a namespace derived from that
//! identity, so repeated builds can skip recompilation.

pub mod cache;
pub mod compile;
pub mod config;
pub mod errors;
pub mod invalidation;
pub mod nested;
pub mod paths;
pub mod pipeline;

pub use cache::{ArtifactCache, CacheError, CacheItem, CacheStore, Namespace};
pub use compile::{CommandCompiler, ExtensionCompiler, PlainCssCompiler, StyleCompiler};
pub use config::{BuildOptions, CliOverrides, ProjectConfig};
pub use errors::{BuildError, CompileError};
pub use invalidation::Invalidator;
pub use nested::Nested;
pub use paths::{BuildIdentity, PathResolver, PathSet, ResolveError, ResolvedBuild};
pub use pipeline::{BuildPipeline, BuildReport, CompiledSource};
