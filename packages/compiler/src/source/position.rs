//! File-position table shared by all files of a package set.

use serde::{Deserialize, Serialize};

/// A byte offset into the concatenated file space of a program. Offset `0`
/// means "no position".
pub type Pos = u32;

pub const NO_POS: Pos = 0;

/// A resolved source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// Line table for a single source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name as reported by the front end (usually package-relative).
    pub name: String,
    /// First byte offset assigned to this file.
    pub base: Pos,
    /// Total size of the file in bytes.
    pub size: u32,
    /// Byte offsets (relative to `base`) of each line start. Line 1 starts
    /// at offset 0.
    pub lines: Vec<u32>,
}

impl FileInfo {
    fn contains(&self, pos: Pos) -> bool {
        pos >= self.base && pos < self.base + self.size.max(1)
    }

    fn line_of(&self, pos: Pos) -> u32 {
        let rel = pos - self.base;
        match self.lines.binary_search(&rel) {
            Ok(i) => i as u32 + 1,
            Err(i) => i as u32,
        }
    }
}

/// Position table for the whole loaded program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSet {
    pub files: Vec<FileInfo>,
}

impl FileSet {
    pub fn file(&self, pos: Pos) -> Option<&FileInfo> {
        if pos == NO_POS {
            return None;
        }
        self.files.iter().find(|f| f.contains(pos))
    }

    /// Resolves an offset to its line number, if the offset is valid.
    pub fn line(&self, pos: Pos) -> Option<u32> {
        self.file(pos).map(|f| f.line_of(pos))
    }

    pub fn position(&self, pos: Pos) -> Option<Position> {
        let file = self.file(pos)?;
        let line = file.line_of(pos);
        let line_start = file.lines.get(line as usize - 1).copied().unwrap_or(0);
        Some(Position {
            file: file.name.clone(),
            line,
            column: pos - file.base - line_start + 1,
        })
    }
}
