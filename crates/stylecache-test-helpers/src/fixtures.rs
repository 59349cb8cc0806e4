//! Test fixtures - a sample stylesheet tree on disk

use indoc::indoc;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn mixin_styl() -> &'static str {
    indoc! {"
        border-radius(n)
          -webkit-border-radius n
          border-radius n
    "}
}

pub fn common_mixin_styl() -> &'static str {
    indoc! {"
        clearfix()
          &:after
            content ''
            display table
            clear both
    "}
}

pub fn normalize_css() -> &'static str {
    indoc! {"
        html {
          font-family: sans-serif;
        }
    "}
}

pub fn child_styl() -> &'static str {
    indoc! {"
        .child
          color red
    "}
}

pub fn colors_styl() -> &'static str {
    "primary = #336699\n"
}

/// A temporary project holding a `samples/` tree:
///
/// ```text
/// samples/
///   .foo
///   foo.js
///   css/
///     common.mixin.styl
///     mixin.styl
///     normalize.css
///     foo.js
///     child/child.styl
///   mixins/
///     colors.styl
///   empty/
/// ```
pub struct SampleTree {
    dir: TempDir,
}

impl SampleTree {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let samples = dir.path().join("samples");

        write(&samples.join(".foo"), "hidden");
        write(&samples.join("foo.js"), "module.exports = {};\n");
        write(&samples.join("css/common.mixin.styl"), common_mixin_styl());
        write(&samples.join("css/mixin.styl"), mixin_styl());
        write(&samples.join("css/normalize.css"), normalize_css());
        write(&samples.join("css/foo.js"), "console.log('not css');\n");
        write(&samples.join("css/child/child.styl"), child_styl());
        write(&samples.join("mixins/colors.styl"), colors_styl());
        fs::create_dir_all(samples.join("empty")).expect("failed to create empty dir");

        Self { dir }
    }

    /// Project root; use it as the resolver's working directory
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a file or directory under `samples/`
    pub fn sample(&self, relative: &str) -> PathBuf {
        self.dir.path().join("samples").join(relative)
    }

    /// Cache root inside the project
    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join(".build")
    }
}

impl Default for SampleTree {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create fixture dir");
    }
    fs::write(path, content).expect("failed to write fixture");
}
