//! Syntax-directed TypeScript emission.
//!
//! A single-pass walk over each file's syntax tree, consuming the analysis
//! annotation table and the type information. The walker produces text
//! directly (rather than building a target AST) because the emitted text is
//! the contract: semicolon guards, template escaping and blank-line
//! structure are controlled at the text layer.

mod assign;
mod call;
mod decl;
mod expr;
mod selector;
mod stmt;
mod type_desc;
pub mod writer;

use std::collections::BTreeMap;

use crate::analysis::{Analysis, AsyncInfo};
use crate::error::{Error, Result};
use crate::loader::{Package, Program};
use crate::source::{ast, Expr};
use crate::types::{ConstValue, ObjectId, Type, TypeId};
use crate::util::sanitize_identifier;
use writer::CodeWriter;

/// Per-file inputs computed by the package orchestrator: which symbols
/// must be auto-imported from sibling files of the same package, keyed by
/// the sibling's emitted module name.
#[derive(Debug, Default, Clone)]
pub struct FileImports {
    pub symbols_by_file: BTreeMap<String, Vec<String>>,
}

/// Renders one source file to TypeScript: generated banner, runtime and
/// package imports, intra-package auto-imports, then every declaration.
pub fn emit_file(
    program: &Program,
    pkg: &Package,
    analysis: &Analysis,
    async_info: &AsyncInfo,
    file: &ast::File,
    file_name: &str,
    imports: &FileImports,
) -> Result<String> {
    let mut emitter = TsEmitter::new(program, pkg, analysis, async_info, file);

    emitter
        .w
        .write_line("// Generated by goty. DO NOT EDIT.");
    emitter
        .w
        .write_line(&format!("// Source: {}/{}", pkg.path, file_name));
    emitter
        .w
        .write_line("import * as $ from \"@goty/builtin/index.js\"");

    // Cross-package imports, namespace-style, honoring local renames.
    for spec in &file.imports {
        let local = spec
            .name
            .as_ref()
            .map(|n| n.name.clone())
            .or_else(|| program.package(&spec.path).map(|p| p.name.clone()))
            .unwrap_or_else(|| {
                spec.path
                    .rsplit('/')
                    .next()
                    .unwrap_or(&spec.path)
                    .to_string()
            });
        if local == "_" {
            continue;
        }
        let local = sanitize_identifier(&local);
        emitter.w.write_line(&format!(
            "import * as {local} from \"@goty/{}/index.js\"",
            spec.path
        ));
    }

    // Auto-imports from sibling files of the same package.
    for (sibling, symbols) in &imports.symbols_by_file {
        if symbols.is_empty() {
            continue;
        }
        let mut sorted: Vec<String> = symbols.iter().map(|s| sanitize_identifier(s)).collect();
        sorted.sort();
        sorted.dedup();
        emitter.w.write_line(&format!(
            "import {{ {} }} from \"./{sibling}.js\"",
            sorted.join(", ")
        ));
    }

    emitter.w.write_line("");
    emitter.write_decls(&file.decls)?;
    Ok(emitter.into_source())
}

/// The tree-walking emitter for one source file.
pub struct TsEmitter<'a> {
    pub(crate) w: CodeWriter,
    pub(crate) program: &'a Program,
    pub(crate) pkg: &'a Package,
    pub(crate) analysis: &'a Analysis,
    pub(crate) async_info: &'a AsyncInfo,
    pub(crate) file: &'a ast::File,
    /// Shadowing substitution stack: objects temporarily renamed while a
    /// short-scope initializer is emitted.
    subst: Vec<(ObjectId, String)>,
    /// Result-type stack of the function currently being emitted.
    pub(crate) result_types: Vec<Vec<Option<TypeId>>>,
    /// Comment groups already written, by index into `file.comments`.
    consumed_comments: Vec<bool>,
}

impl<'a> TsEmitter<'a> {
    pub fn new(
        program: &'a Program,
        pkg: &'a Package,
        analysis: &'a Analysis,
        async_info: &'a AsyncInfo,
        file: &'a ast::File,
    ) -> Self {
        TsEmitter {
            w: CodeWriter::new(),
            program,
            pkg,
            analysis,
            async_info,
            file,
            subst: Vec::new(),
            result_types: Vec::new(),
            consumed_comments: vec![false; file.comments.len()],
        }
    }

    pub fn into_source(self) -> String {
        self.w.finish()
    }

    // --- shared lookups ---

    pub(crate) fn err(&self, construct: &'static str, detail: impl Into<String>) -> Error {
        Error::Emit {
            package: self.pkg.path.clone(),
            construct,
            detail: detail.into(),
        }
    }

    pub(crate) fn obj_of(&self, ident: &ast::Ident) -> Option<ObjectId> {
        self.pkg.info.object_of(ident.id)
    }

    pub(crate) fn type_of(&self, expr: &Expr) -> Option<TypeId> {
        self.pkg.info.type_of(expr.id())
    }

    pub(crate) fn underlying_of(&self, expr: &Expr) -> Option<&'a Type> {
        self.type_of(expr).map(|t| self.program.underlying(t))
    }

    pub(crate) fn is_map(&self, expr: &Expr) -> bool {
        let Some(t) = self.type_of(expr) else {
            return false;
        };
        if matches!(self.program.underlying(t), Type::Map { .. }) {
            return true;
        }
        // A type parameter constrained to a map gets map treatment too.
        if let Type::TypeParam { constraint } = self.program.typ(t) {
            return matches!(self.program.underlying(*constraint), Type::Map { .. });
        }
        false
    }

    pub(crate) fn is_pointer(&self, expr: &Expr) -> bool {
        self.type_of(expr)
            .is_some_and(|t| matches!(self.program.typ(t), Type::Pointer { .. }))
    }

    pub(crate) fn is_interface_value(&self, expr: &Expr) -> bool {
        matches!(self.underlying_of(expr), Some(Type::Interface { .. }))
    }

    /// Struct-typed value (not a pointer to struct) whose assignment must
    /// clone to preserve value semantics. Composite literals and calls
    /// produce fresh values and are exempt.
    pub(crate) fn should_apply_clone(&self, expr: &Expr) -> bool {
        if matches!(expr.unparen(), Expr::CompositeLit(_) | Expr::Call(_)) {
            return false;
        }
        matches!(self.underlying_of(expr), Some(Type::Struct { .. }))
    }

    pub(crate) fn sanitize(&self, name: &str) -> String {
        sanitize_identifier(name)
    }

    // --- shadowing substitution ---

    pub(crate) fn push_subst(&mut self, obj: ObjectId, temp: String) {
        self.subst.push((obj, temp));
    }

    pub(crate) fn pop_subst(&mut self, n: usize) {
        for _ in 0..n {
            self.subst.pop();
        }
    }

    fn subst_for(&self, obj: ObjectId) -> Option<&str> {
        self.subst
            .iter()
            .rev()
            .find(|(o, _)| *o == obj)
            .map(|(_, t)| t.as_str())
    }

    pub(crate) fn subst_depth(&self) -> usize {
        self.subst.len()
    }

    pub(crate) fn truncate_subst(&mut self, depth: usize) {
        self.subst.truncate(depth);
    }

    /// Emitted name of a declaration-site identifier, honoring rebind
    /// renames.
    pub(crate) fn local_binding_name(&self, ident: &ast::Ident) -> String {
        if let Some(obj) = self.pkg.info.defs.get(&ident.id) {
            if let Some(temp) = self.subst_for(*obj) {
                return temp.to_string();
            }
        }
        self.sanitize(&ident.name)
    }

    // --- identifiers and constants ---

    /// Writes an identifier used as a value. `nil` becomes `null`;
    /// current-package and predeclared constants expand to their literal
    /// values; a reified variable accessed as a value gets `!.value`.
    pub(crate) fn write_ident(&mut self, ident: &ast::Ident, access_var_ref: bool) {
        if ident.name == "nil" {
            self.w.write_literally("null");
            return;
        }

        let obj_id = self.obj_of(ident);

        // Predeclared booleans pass through as literals unless a binding
        // shadows them.
        if obj_id.is_none() && (ident.name == "true" || ident.name == "false") {
            self.w.write_literally(&ident.name);
            return;
        }

        if let Some(obj_id) = obj_id {
            if let Some(temp) = self.subst_for(obj_id) {
                let temp = temp.to_string();
                self.w.write_literally(&temp);
                return;
            }
            if let Some(obj) = self.program.obj(obj_id) {
                if let Some(value) = obj.const_value() {
                    // Inline predeclared constants and constants of the
                    // current package; imported constants stay qualified.
                    let inline = match obj.pkg.as_deref() {
                        None => true,
                        Some(pkg) => pkg == self.pkg.path,
                    };
                    if inline {
                        let value = value.clone();
                        self.write_constant_value(&value);
                        return;
                    }
                }
            }
        }

        let name = self.sanitize(&ident.name);
        self.w.write_literally(&name);

        if access_var_ref {
            if let Some(obj_id) = obj_id {
                if self.analysis.needs_var_ref(obj_id) {
                    self.w.write_literally("!.value");
                }
            }
        }
    }

    pub(crate) fn write_constant_value(&mut self, value: &ConstValue) {
        match value {
            ConstValue::Int(v) => self.w.write_literally(&v.to_string()),
            ConstValue::Float(v) => {
                let text = if v.fract() == 0.0 && v.is_finite() {
                    format!("{v:.1}")
                } else {
                    v.to_string()
                };
                self.w.write_literally(&text);
            }
            ConstValue::Str(s) => {
                let quoted = serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"));
                self.w.write_literally(&quoted);
            }
            ConstValue::Bool(b) => self.w.write_literally(if *b { "true" } else { "false" }),
            ConstValue::Complex(repr) => {
                self.w
                    .write_literally(&format!("/* complex constant: {repr} */"));
            }
        }
    }

    // --- comments ---

    /// Writes one comment group, preserving line/block style.
    pub(crate) fn write_doc(&mut self, doc: &ast::CommentGroup) {
        for comment in doc.comments.clone() {
            if let Some(body) = comment.strip_prefix("/*") {
                let body = body.strip_suffix("*/").unwrap_or(body);
                if body.contains('\n') {
                    self.w.write_line("/*");
                    for line in body.split('\n') {
                        self.w.write_line(&format!(" *{line}"));
                    }
                    self.w.write_line(" */");
                } else {
                    self.w.write_line(&format!("/*{body}*/"));
                }
            } else {
                self.w.write_line(&comment);
            }
        }
    }

    /// Emits any not-yet-written comment groups lying between the last
    /// emitted line and `before_pos`, returning the last source line
    /// written.
    pub(crate) fn flush_comments_before(
        &mut self,
        before_pos: crate::source::Pos,
        mut last_line: u32,
    ) -> u32 {
        let groups: Vec<(usize, ast::CommentGroup)> = self
            .file
            .comments
            .iter()
            .enumerate()
            .filter(|(i, g)| {
                !self.consumed_comments[*i] && g.pos != 0 && g.pos < before_pos
            })
            .map(|(i, g)| (i, g.clone()))
            .collect();
        for (i, group) in groups {
            let group_line = self.program.fset.line(group.pos).unwrap_or(0);
            if last_line > 0 && group_line > last_line + 1 {
                self.w.write_line("");
            }
            self.write_doc(&group);
            self.consumed_comments[i] = true;
            last_line = group_line + group.comments.len().saturating_sub(1) as u32;
        }
        last_line
    }
}
