//! Adapters for the external stylesheet compiler
//!
//! The build pipeline treats compilation as opaque: a source path goes in,
//! CSS text or an error comes out. [`StyleCompiler`] is that seam.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::errors::CompileError;

/// Compiles one stylesheet source into CSS
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, source: &Path) -> Result<String, CompileError>;
}

/// Plain CSS is its own compiled form
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCssCompiler;

impl StyleCompiler for PlainCssCompiler {
    fn compile(&self, source: &Path) -> Result<String, CompileError> {
        std::fs::read_to_string(source).map_err(|e| CompileError::Io {
            path: source.to_path_buf(),
            source: e,
        })
    }
}

/// Runs an external preprocessor and captures its stdout.
///
/// The source path is appended as the last argument, so a command line like
/// `stylus --print` becomes `stylus --print /abs/path/mixin.styl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line. Returns `None` when blank.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl StyleCompiler for CommandCompiler {
    fn compile(&self, source: &Path) -> Result<String, CompileError> {
        debug!("Running {} on {:?}", self.program, source);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .output()
            .map_err(|e| CompileError::Command {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(CompileError::Failed {
                path: source.to_path_buf(),
                message,
            });
        }

        String::from_utf8(output.stdout).map_err(|_| CompileError::Failed {
            path: source.to_path_buf(),
            message: format!("'{}' produced output that is not UTF-8", self.program),
        })
    }
}

/// Picks a compiler by file extension
#[derive(Default)]
pub struct ExtensionCompiler {
    compilers: FxHashMap<String, Box<dyn StyleCompiler>>,
}

impl ExtensionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `css` files pass through, `styl` files go to `preprocessor`
    pub fn standard(preprocessor: impl StyleCompiler + 'static) -> Self {
        Self::new()
            .with("css", PlainCssCompiler)
            .with("styl", preprocessor)
    }

    pub fn with(mut self, extension: &str, compiler: impl StyleCompiler + 'static) -> Self {
        self.compilers
            .insert(extension.to_string(), Box::new(compiler));
        self
    }
}

impl StyleCompiler for ExtensionCompiler {
    fn compile(&self, source: &Path) -> Result<String, CompileError> {
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        match self.compilers.get(extension) {
            Some(compiler) => compiler.compile(source),
            None => Err(CompileError::Failed {
                path: PathBuf::from(source),
                message: format!("no compiler registered for '.{}' files", extension),
            }),
        }
    }
}
