//! Compiler error types.

use std::path::PathBuf;

/// All errors surfaced by the compiler. Every variant names the package,
/// path or construct it failed on so the CLI can print a single useful
/// diagnostic line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Loading the typed package set failed.
    #[error("failed to load package {package}: {message}")]
    Load { package: String, message: String },

    /// An overlay directory or its meta.json is malformed.
    #[error("overlay error in {path}: {message}")]
    Overlay { path: String, message: String },

    /// The emitter hit a syntax-tree shape it does not handle. This is a
    /// bug in the compiler or the export front end; the node is dumped
    /// verbatim.
    #[error("cannot emit {construct} in package {package}: {detail}")]
    Emit {
        package: String,
        construct: &'static str,
        detail: String,
    },

    /// Filesystem failure while writing output or copying overlays.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
