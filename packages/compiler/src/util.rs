//! Small shared helpers: identifier sanitizing, output path mapping and
//! deterministic position-derived identifiers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::source::position::FileSet;
use crate::source::Pos;

/// TypeScript reserved words and common global names that a Go identifier
/// must not collide with. Sanitized identifiers get a `_` suffix.
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "arguments",
        "await",
        "boolean",
        "break",
        "case",
        "catch",
        "class",
        "const",
        "continue",
        "debugger",
        "default",
        "delete",
        "do",
        "else",
        "enum",
        "eval",
        "export",
        "extends",
        "false",
        "finally",
        "for",
        "function",
        "if",
        "implements",
        "import",
        "in",
        "instanceof",
        "interface",
        "let",
        "new",
        "null",
        "number",
        "object",
        "package",
        "private",
        "protected",
        "public",
        "return",
        "static",
        "string",
        "super",
        "switch",
        "symbol",
        "this",
        "throw",
        "true",
        "try",
        "typeof",
        "undefined",
        "var",
        "void",
        "while",
        "with",
        "yield",
    ]
    .into_iter()
    .collect()
});

static LEGAL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][0-9A-Za-z_$]*$").expect("identifier pattern"));

/// Rewrites a Go identifier so it is legal in TypeScript. Reserved words
/// get a trailing underscore; characters outside the legal identifier
/// alphabet are replaced.
pub fn sanitize_identifier(name: &str) -> String {
    if RESERVED_WORDS.contains(name) {
        return format!("{name}_");
    }
    if LEGAL_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// Computes the output directory for a package: `<output>/@goty/<pkg-path>`.
pub fn compute_module_path(output_root: &Path, pkg_path: &str) -> PathBuf {
    output_root.join("@goty").join(pkg_path)
}

/// Maps a Go source file name inside a package to its emitted TypeScript
/// file name (`foo.go` becomes `foo.gs.ts`).
pub fn translate_source_file_name(go_file: &str) -> String {
    let base = go_file.strip_suffix(".go").unwrap_or(go_file);
    format!("{base}.gs.ts")
}

/// Derives a reproducible four-hex-digit identifier from a source position.
/// Hashes `package-path:base-filename:line:column` with SHA-256 and keeps
/// the last four hex digits, so emitted temporaries depend only on source
/// position, never on wall-clock or memory addresses.
pub fn deterministic_id(fset: &FileSet, pkg_path: &str, pos: Pos) -> String {
    let (file, line, column) = match fset.position(pos) {
        Some(p) => (p.file, p.line, p.column),
        None => return "0000".to_string(),
    };
    let base = Path::new(&file)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    let pkg = if pkg_path.is_empty() { "main" } else { pkg_path };
    let input = format!("{pkg}:{base}:{line}:{column}");
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[hex.len() - 4..].to_string()
}
