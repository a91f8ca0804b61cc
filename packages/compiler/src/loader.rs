//! Package loading.
//!
//! The type checker lives outside this compiler: an export front end
//! (`goty-export`, overridable via `GOTY_EXPORT_BIN`) runs the Go toolchain
//! for the js/wasm target and prints a JSON typed-AST export of the whole
//! transitive import closure. The loader invokes it, deserializes the
//! export and surfaces per-package load errors. Tests and embedders can
//! also build a [`Program`] directly from a parsed export.

use std::collections::HashMap;
use std::process::Command;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::source::position::FileSet;
use crate::source::{ast, Expr, NodeId};
use crate::types::{Object, ObjectId, Type, TypeId, TypeInfo};

const DEFAULT_EXPORT_BIN: &str = "goty-export";

static INVALID_TYPE: Type = Type::Invalid;

/// One compiled source file of a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Base file name, e.g. `main.go`.
    pub name: String,
    pub ast: ast::File,
}

/// A loaded package with full syntax and type information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Stable dotted import path.
    pub path: String,
    /// Display name from the package clause.
    pub name: String,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    /// Direct imports, in declaration order.
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub info: TypeInfo,
    /// Load or type-check errors reported by the front end. Any entry is
    /// fatal for a package that must be transpiled.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// The deserialized export: the transitive closure with global arenas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Export {
    /// Package paths the requested patterns resolved to.
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub types: Vec<Type>,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub fset: FileSet,
}

/// The in-memory program: every package of the closure plus the shared
/// type/object arenas and position table. Owned by the orchestrator for
/// the duration of one compile; analysis and emission borrow it immutably.
#[derive(Debug)]
pub struct Program {
    pub packages: IndexMap<String, Package>,
    pub roots: Vec<String>,
    types: Vec<Type>,
    objects: Vec<Object>,
    pub fset: FileSet,
}

impl Program {
    pub fn from_export(export: Export) -> Self {
        let mut packages = IndexMap::new();
        for pkg in export.packages {
            packages.insert(pkg.path.clone(), pkg);
        }
        Program {
            packages,
            roots: export.roots,
            types: export.types,
            objects: export.objects,
            fset: export.fset,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let export: Export = serde_json::from_str(json).map_err(|e| Error::Load {
            package: "<export>".to_string(),
            message: format!("malformed typed-AST export: {e}"),
        })?;
        Ok(Program::from_export(export))
    }

    pub fn package(&self, path: &str) -> Option<&Package> {
        self.packages.get(path)
    }

    pub fn typ(&self, id: TypeId) -> &Type {
        self.types.get(id.0 as usize).unwrap_or(&INVALID_TYPE)
    }

    pub fn obj(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0 as usize)
    }

    /// Resolves through named types and type parameters to the underlying
    /// structural type.
    pub fn underlying(&self, id: TypeId) -> &Type {
        let mut current = id;
        for _ in 0..64 {
            match self.typ(current) {
                Type::Named { underlying, .. } => current = *underlying,
                other => return other,
            }
        }
        &INVALID_TYPE
    }

    /// The id of the underlying structural type.
    pub fn underlying_id(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..64 {
            match self.typ(current) {
                Type::Named { underlying, .. } => current = *underlying,
                _ => return current,
            }
        }
        current
    }

    /// Object an identifier refers to, in the given package.
    pub fn object_of(&self, pkg: &Package, ident: &ast::Ident) -> Option<ObjectId> {
        pkg.info.object_of(ident.id)
    }

    /// Resolved type of an expression node, in the given package.
    pub fn type_of(&self, pkg: &Package, expr: &Expr) -> Option<TypeId> {
        pkg.info.type_of(expr.id())
    }

    /// Iterates all objects with their ids.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u32), o))
    }

    /// Iterates all types with their ids.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (TypeId(i as u32), t))
    }

    /// Maps each package-level object of `pkg` to the base name of the file
    /// that declares it. Used for intra-package auto-imports.
    pub fn declaring_files(&self, pkg: &Package) -> HashMap<ObjectId, String> {
        let mut out = HashMap::new();
        for file in &pkg.files {
            for decl in &file.ast.decls {
                let mut record = |id: NodeId| {
                    if let Some(obj) = pkg.info.defs.get(&id) {
                        out.insert(*obj, file.name.clone());
                    }
                };
                match decl {
                    ast::Decl::Func(f) => record(f.name.id),
                    ast::Decl::Gen(g) => {
                        for spec in &g.specs {
                            match spec {
                                ast::Spec::Value(v) => {
                                    for name in &v.names {
                                        record(name.id);
                                    }
                                }
                                ast::Spec::Type(t) => record(t.name.id),
                                ast::Spec::Import(_) => {}
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// Invokes the export front end and loads the resulting program.
///
/// Environment overrides for the target platform (`GOOS=js GOARCH=wasm`)
/// and the configured build tags are passed through to the front end, which
/// is responsible for resolving the patterns against the working directory.
pub fn load(config: &Config, patterns: &[String]) -> Result<Program> {
    if patterns.is_empty() {
        return Err(Error::Config("package(s) must be specified".to_string()));
    }

    let bin = std::env::var("GOTY_EXPORT_BIN").unwrap_or_else(|_| DEFAULT_EXPORT_BIN.to_string());
    let mut cmd = Command::new(&bin);
    cmd.args(patterns);
    if let Some(dir) = &config.dir {
        cmd.arg("--dir").arg(dir);
    }
    if !config.build_flags.is_empty() {
        cmd.arg("--tags").arg(config.build_flags.join(","));
    }
    cmd.env("GOOS", "js").env("GOARCH", "wasm");

    debug!(frontend = %bin, ?patterns, "loading typed package export");

    let output = cmd.output().map_err(|e| Error::Load {
        package: patterns.join(", "),
        message: format!("failed to run export front end `{bin}`: {e}"),
    })?;
    if !output.status.success() {
        return Err(Error::Load {
            package: patterns.join(", "),
            message: format!(
                "export front end failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let json = String::from_utf8(output.stdout).map_err(|e| Error::Load {
        package: patterns.join(", "),
        message: format!("export is not valid utf-8: {e}"),
    })?;
    let program = Program::from_json(&json)?;
    if program.packages.is_empty() {
        return Err(Error::Load {
            package: patterns.join(", "),
            message: "patterns resolved to no packages".to_string(),
        });
    }
    Ok(program)
}
