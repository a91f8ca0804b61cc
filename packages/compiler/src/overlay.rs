//! Hand-written TypeScript overlays.
//!
//! Certain source packages (the runtime `builtin`, standard-library
//! packages with no sensible transpilation) ship as hand-written
//! TypeScript. The tree lives on a read-only filesystem keyed by
//! `gs/<pkg-path>`; each overlay directory may carry a `meta.json` sidecar
//! declaring further overlay dependencies and the async bits of its
//! methods, which seed the async analysis for packages that are never
//! transpiled.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Read-only filesystem the overlay tree lives on. The production binary
/// binds this to a directory shipped alongside it; tests use [`MemOverlays`].
pub trait OverlayFs: Send + Sync {
    /// Lists entry names directly under `path`. `Ok(None)` means the
    /// directory does not exist (which is not an error: most packages have
    /// no overlay).
    fn read_dir(&self, path: &str) -> Result<Option<Vec<OverlayEntry>>>;

    /// Reads a file. `Ok(None)` when it does not exist.
    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Sidecar metadata of one overlay directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayMeta {
    /// Package paths whose overlays must be copied alongside this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// `"Type.Method"` (or `"Function"`) names mapped to their async bit.
    #[serde(default, rename = "asyncMethods")]
    pub async_methods: HashMap<String, bool>,
}

/// Returns the overlay source path for a package.
pub fn overlay_path(pkg_path: &str) -> String {
    format!("gs/{pkg_path}")
}

/// True if a hand-written overlay exists for the package.
pub fn has_overlay(fs: &dyn OverlayFs, pkg_path: &str) -> bool {
    matches!(fs.read_dir(&overlay_path(pkg_path)), Ok(Some(_)))
}

/// Reads the overlay metadata for a package. A missing `meta.json` yields
/// empty metadata; a malformed one is an error naming the overlay.
pub fn read_meta(fs: &dyn OverlayFs, pkg_path: &str) -> Result<OverlayMeta> {
    let path = format!("{}/meta.json", overlay_path(pkg_path));
    match fs.read_file(&path)? {
        None => Ok(OverlayMeta::default()),
        Some(content) => serde_json::from_slice(&content).map_err(|e| Error::Overlay {
            path,
            message: format!("malformed meta.json: {e}"),
        }),
    }
}

/// Decides whether an overlay file is copied into the output tree. Only
/// TypeScript sources travel; tests never do.
pub fn should_copy_entry(name: &str) -> bool {
    name.ends_with(".ts") && !name.ends_with(".test.ts")
}

/// Directory-backed overlay filesystem used by the CLI.
pub struct DirOverlays {
    root: PathBuf,
}

impl DirOverlays {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirOverlays { root: root.into() }
    }
}

impl OverlayFs for DirOverlays {
    fn read_dir(&self, path: &str) -> Result<Option<Vec<OverlayEntry>>> {
        let full = self.root.join(path);
        if !full.is_dir() {
            return Ok(None);
        }
        let mut entries = Vec::new();
        let iter = fs::read_dir(&full).map_err(|e| Error::io(&full, e))?;
        for entry in iter {
            let entry = entry.map_err(|e| Error::io(&full, e))?;
            entries.push(OverlayEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.path().is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(entries))
    }

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.root.join(path);
        if !full.is_file() {
            return Ok(None);
        }
        fs::read(&full).map(Some).map_err(|e| Error::io(&full, e))
    }
}

/// In-memory overlay filesystem for tests and embedding.
#[derive(Default)]
pub struct MemOverlays {
    files: HashMap<String, Vec<u8>>,
}

impl MemOverlays {
    pub fn new() -> Self {
        MemOverlays::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl OverlayFs for MemOverlays {
    fn read_dir(&self, path: &str) -> Result<Option<Vec<OverlayEntry>>> {
        let prefix = format!("{path}/");
        let mut entries: Vec<OverlayEntry> = Vec::new();
        for key in self.files.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let (name, is_dir) = match rest.split_once('/') {
                    Some((dir, _)) => (dir.to_string(), true),
                    None => (rest.to_string(), false),
                };
                if !entries.iter().any(|e| e.name == name) {
                    entries.push(OverlayEntry { name, is_dir });
                }
            }
        }
        if entries.is_empty() {
            return Ok(None);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(entries))
    }

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }
}

/// Recursively copies one overlay tree into `dest`, creating directories as
/// needed and filtering with [`should_copy_entry`].
pub fn copy_tree(fs_in: &dyn OverlayFs, src: &str, dest: &Path) -> Result<()> {
    let entries = fs_in.read_dir(src)?.ok_or_else(|| Error::Overlay {
        path: src.to_string(),
        message: "overlay directory does not exist".to_string(),
    })?;
    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    for entry in entries {
        let src_entry = format!("{src}/{}", entry.name);
        let dest_entry = dest.join(&entry.name);
        if entry.is_dir {
            copy_tree(fs_in, &src_entry, &dest_entry)?;
        } else {
            if !should_copy_entry(&entry.name) {
                continue;
            }
            let content = fs_in.read_file(&src_entry)?.ok_or_else(|| Error::Overlay {
                path: src_entry.clone(),
                message: "listed file could not be read".to_string(),
            })?;
            fs::write(&dest_entry, content).map_err(|e| Error::io(&dest_entry, e))?;
        }
    }
    Ok(())
}
