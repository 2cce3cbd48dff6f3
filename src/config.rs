//! Compile options and environment-driven settings.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Knobs for one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub debug: bool,
    /// Directories searched for `-f`, `-i` and `@include` names not found as given.
    pub include_path: Vec<PathBuf>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn include_path(mut self, path: Vec<PathBuf>) -> Self {
        self.include_path = path;
        self
    }
}

/// Settings read from the environment by the `awkpy` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interpreter used to run generated programs.
    pub python: String,
    /// Directory holding `awkpy_runtime.py`, prepended to `PYTHONPATH`.
    pub runtime_dir: Option<PathBuf>,
    pub include_path: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            runtime_dir: None,
            include_path: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("AWKPY_PYTHON").ok(),
            env::var_os("AWKPY_RUNTIME_DIR"),
            env::var_os("AWKPATH"),
        )
    }

    fn from_vars(python: Option<String>, runtime_dir: Option<OsString>, awkpath: Option<OsString>) -> Self {
        let defaults = Self::default();
        Self {
            python: python.filter(|p| !p.is_empty()).unwrap_or(defaults.python),
            runtime_dir: runtime_dir.filter(|d| !d.is_empty()).map(PathBuf::from),
            include_path: awkpath
                .map(|p| env::split_paths(&p).filter(|d| !d.as_os_str().is_empty()).collect())
                .unwrap_or_default(),
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::new().include_path(self.include_path.clone())
    }
}
