use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::BuildError;

/// Default project configuration file name
pub const CONFIG_FILE_NAME: &str = "stylecache.json";

/// Options recognized by a single build invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    /// Use this directory as the cache location instead of a digest of the
    /// input paths. Relative paths resolve against the working directory.
    #[serde(default)]
    pub build_path: Option<PathBuf>,

    /// Keep cached entries between runs and rely on external invalidation
    /// (default: false). The caller decides the default from its runtime
    /// mode; this crate never inspects the environment for it.
    #[serde(default)]
    pub watch: bool,
}

impl BuildOptions {
    pub fn with_build_path(mut self, build_path: impl Into<PathBuf>) -> Self {
        self.build_path = Some(build_path.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

/// Project configuration, usually loaded from `stylecache.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Stylesheet directories to build
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Cache location override, see [`BuildOptions::build_path`]
    #[serde(default)]
    pub build_path: Option<PathBuf>,

    /// Watch mode, if set. Takes precedence over the runtime-mode default
    /// but not over the command line. Only an explicit `true` starts the
    /// file watcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<bool>,

    /// Cache root directory (default: `.build` in the project root)
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Command used to compile `.styl` sources; the source path is appended
    #[serde(default = "default_preprocessor")]
    pub preprocessor: String,

    /// Write the concatenated CSS here instead of stdout
    #[serde(default)]
    pub out_file: Option<String>,
}

fn default_preprocessor() -> String {
    "stylus --print".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("./css")],
            build_path: None,
            watch: None,
            cache_dir: None,
            preprocessor: default_preprocessor(),
            out_file: None,
        }
    }
}

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub paths: Option<Vec<PathBuf>>,
    pub build_path: Option<PathBuf>,
    pub watch: Option<bool>,
    pub cache_dir: Option<String>,
    pub preprocessor: Option<String>,
    pub out_file: Option<String>,
}

impl ProjectConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path)?;
        let config: ProjectConfig = serde_json::from_str(&content)
            .map_err(|e| BuildError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Create a default configuration and write it to a file
    pub fn init_file(path: &Path) -> Result<(), BuildError> {
        let config = ProjectConfig::default();
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| BuildError::ConfigError(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Merge command-line overrides into this configuration
    pub fn merge(&mut self, overrides: &CliOverrides) {
        if let Some(ref paths) = overrides.paths {
            self.paths = paths.clone();
        }
        if let Some(ref build_path) = overrides.build_path {
            self.build_path = Some(build_path.clone());
        }
        if let Some(watch) = overrides.watch {
            self.watch = Some(watch);
        }
        if let Some(ref cache_dir) = overrides.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(ref preprocessor) = overrides.preprocessor {
            self.preprocessor = preprocessor.clone();
        }
        if let Some(ref out_file) = overrides.out_file {
            self.out_file = Some(out_file.clone());
        }
    }

    /// Final build options, with `watch` falling back to `default_watch`
    /// when neither the command line nor the file set it.
    ///
    /// The fallback only decides whether cache entries survive between
    /// runs; see [`ProjectConfig::watcher_requested`].
    pub fn resolved_options(&self, default_watch: bool) -> BuildOptions {
        BuildOptions {
            build_path: self.build_path.clone(),
            watch: self.watch.unwrap_or(default_watch),
        }
    }

    /// True when watch mode was asked for explicitly, on the command line
    /// or in the file. A runtime-mode default never starts a watcher.
    pub fn watcher_requested(&self) -> bool {
        self.watch == Some(true)
    }
}
