//! Test utilities and fixtures for stylecache
//!
//! Shared by the integration tests of every crate in the workspace.

pub mod fixtures;
pub mod mocks;

pub use fixtures::SampleTree;
pub use mocks::{CountingCompiler, FailingCompiler};
