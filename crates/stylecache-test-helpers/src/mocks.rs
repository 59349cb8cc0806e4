//! Mock compilers for testing

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use stylecache_core::{CompileError, StyleCompiler};

/// Records every source it compiles and returns `/* <file name> */`
#[derive(Debug, Default)]
pub struct CountingCompiler {
    calls: Mutex<Vec<PathBuf>>,
}

impl CountingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        let mut calls = self.calls.lock().unwrap().clone();
        // Compilation runs in parallel, so call order is not meaningful.
        calls.sort();
        calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn output_for(path: &Path) -> String {
        format!(
            "/* {} */",
            path.file_name().unwrap_or_default().to_string_lossy()
        )
    }
}

impl StyleCompiler for CountingCompiler {
    fn compile(&self, source: &Path) -> Result<String, CompileError> {
        self.calls.lock().unwrap().push(source.to_path_buf());
        Ok(Self::output_for(source))
    }
}

/// Fails for sources whose file name is in the list, compiles the rest
/// like [`CountingCompiler`]
#[derive(Debug, Default)]
pub struct FailingCompiler {
    failing: Vec<String>,
}

impl FailingCompiler {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl StyleCompiler for FailingCompiler {
    fn compile(&self, source: &Path) -> Result<String, CompileError> {
        let name = source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        if self.failing.contains(&name) {
            Err(CompileError::Failed {
                path: source.to_path_buf(),
                message: format!("mock failure for {}", name),
            })
        } else {
            Ok(CountingCompiler::output_for(source))
        }
    }
}
