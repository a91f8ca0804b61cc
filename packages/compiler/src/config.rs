//! Project-wide compiler configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Configuration for a compile invocation. Mirrors the CLI flags; every
/// field has an environment-variable equivalent under the `GOTY_` prefix.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the emitted TypeScript tree is written to.
    pub output_path: PathBuf,
    /// Working directory used to resolve package patterns. Empty means the
    /// process working directory.
    pub dir: Option<PathBuf>,
    /// Build tags passed through to the loader front end.
    pub build_flags: Vec<String>,
    /// Compile the whole transitive dependency closure, not just the roots.
    pub all_dependencies: bool,
    /// Suppress copying the bundled `builtin` overlay into the output tree.
    pub disable_emit_builtin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_path: PathBuf::from("./output"),
            dir: None,
            build_flags: Vec::new(),
            all_dependencies: false,
            disable_emit_builtin: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Config("output path must not be empty".to_string()));
        }
        Ok(())
    }
}
