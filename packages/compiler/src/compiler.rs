//! Package orchestration: the root compiler, the per-package compiler and
//! the re-export index generator.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::analysis::{self, AsyncInfo, AsyncSeeds};
use crate::codegen::{self, FileImports};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::{self, Package, Program, SourceFile};
use crate::overlay::{self, OverlayFs};
use crate::source::{ast, Expr, Stmt};
use crate::types::{ObjectId, ObjectKind, Type};
use crate::util::{compute_module_path, sanitize_identifier, translate_source_file_name};

/// What a compile invocation produced.
#[derive(Debug, Default, Clone)]
pub struct CompilationResult {
    /// Packages transpiled to TypeScript.
    pub compiled_packages: Vec<String>,
    /// Packages copied verbatim from hand-written overlays.
    pub copied_packages: Vec<String>,
    /// Packages the requested patterns resolved to.
    pub original_packages: Vec<String>,
}

/// The root compiler for a project. Owns the configuration and the overlay
/// filesystem; one instance serves one or more compile invocations.
pub struct Compiler {
    config: Config,
    overlays: Arc<dyn OverlayFs>,
}

impl Compiler {
    pub fn new(config: Config, overlays: Arc<dyn OverlayFs>) -> Result<Self> {
        config.validate()?;
        Ok(Compiler { config, overlays })
    }

    /// Loads the requested patterns through the export front end and
    /// compiles them.
    pub fn compile_packages(&self, patterns: &[String]) -> Result<CompilationResult> {
        let program = loader::load(&self.config, patterns)?;
        self.compile_program(&program)
    }

    /// Compiles an already-loaded program. The requested root set comes
    /// from the program itself.
    pub fn compile_program(&self, program: &Program) -> Result<CompilationResult> {
        let requested: Vec<String> = program.roots.clone();
        let mut result = CompilationResult {
            original_packages: requested.clone(),
            ..CompilationResult::default()
        };

        let targets = self.collect_targets(program, &requested);

        // Whole-closure async fixed point, seeded from overlay metadata.
        let seeds = self.collect_async_seeds(program, &targets)?;
        let async_info = analysis::analyze_async(program, seeds);

        if !self.config.disable_emit_builtin {
            debug!("copying builtin overlay into the output tree");
            let dest = compute_module_path(&self.config.output_path, "builtin");
            overlay::copy_tree(self.overlays.as_ref(), "gs/builtin", &dest)?;
            result.copied_packages.push("builtin".to_string());
        }

        let mut processed_overlays: HashSet<String> = HashSet::new();

        for path in &targets {
            let is_requested = requested.iter().any(|r| r == path);
            if overlay::has_overlay(self.overlays.as_ref(), path) && !is_requested {
                if self.config.disable_emit_builtin {
                    result.copied_packages.push(path.clone());
                } else {
                    self.copy_overlay_with_dependencies(path, &mut processed_overlays, &mut result)?;
                }
                continue;
            }

            let Some(pkg) = program.package(path) else {
                return Err(Error::Load {
                    package: path.clone(),
                    message: "package missing from the loaded closure".to_string(),
                });
            };
            if !pkg.errors.is_empty() {
                return Err(Error::Load {
                    package: path.clone(),
                    message: pkg.errors.join("; "),
                });
            }

            let pkg_compiler = PackageCompiler::new(&self.config, program, pkg, &async_info);
            pkg_compiler.compile()?;
            info!(package = %path, "compiled");
            result.compiled_packages.push(path.clone());
        }

        Ok(result)
    }

    /// The ordered set of packages to process: the roots, and with
    /// all-dependencies enabled the transitive closure, not descending
    /// into overlay packages and eliding protobuf-only dependencies.
    fn collect_targets(&self, program: &Program, requested: &[String]) -> Vec<String> {
        if !self.config.all_dependencies {
            return requested.to_vec();
        }
        let mut visited: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut stack: Vec<String> = requested.to_vec();
        while let Some(path) = stack.pop() {
            if !visited.insert(path.clone()) {
                continue;
            }
            order.push(path.clone());
            if overlay::has_overlay(self.overlays.as_ref(), &path) {
                continue;
            }
            let Some(pkg) = program.package(&path) else {
                continue;
            };
            for dep in &pkg.imports {
                if is_protobuf_only(pkg, dep) {
                    continue;
                }
                if !visited.contains(dep) {
                    stack.push(dep.clone());
                }
            }
        }
        order
    }

    /// Gathers `asyncMethods` seeds from the overlay metadata of every
    /// package reachable from the compile set.
    fn collect_async_seeds(&self, program: &Program, targets: &[String]) -> Result<AsyncSeeds> {
        let mut seeds = AsyncSeeds::default();
        let mut paths: HashSet<String> = targets.iter().cloned().collect();
        for pkg in program.packages.values() {
            paths.insert(pkg.path.clone());
            for dep in &pkg.imports {
                paths.insert(dep.clone());
            }
        }
        for path in paths {
            if !overlay::has_overlay(self.overlays.as_ref(), &path) {
                continue;
            }
            let meta = overlay::read_meta(self.overlays.as_ref(), &path)?;
            for (key, is_async) in meta.async_methods {
                seeds.insert(path.clone(), key, is_async);
            }
        }
        Ok(seeds)
    }

    /// Copies one overlay package plus, recursively, the overlay
    /// dependencies its metadata declares.
    fn copy_overlay_with_dependencies(
        &self,
        path: &str,
        processed: &mut HashSet<String>,
        result: &mut CompilationResult,
    ) -> Result<()> {
        if !processed.insert(path.to_string()) {
            return Ok(());
        }
        if !overlay::has_overlay(self.overlays.as_ref(), path) {
            debug!(package = %path, "overlay does not exist, skipping");
            return Ok(());
        }
        let meta = overlay::read_meta(self.overlays.as_ref(), path)?;
        for dep in &meta.dependencies {
            self.copy_overlay_with_dependencies(dep, processed, result)?;
        }
        let dest = compute_module_path(&self.config.output_path, path);
        overlay::copy_tree(self.overlays.as_ref(), &overlay::overlay_path(path), &dest)?;
        result.copied_packages.push(path.to_string());
        Ok(())
    }
}

/// True iff every source file of `parent` importing `dep` is a generated
/// protobuf file. Such dependencies are elided because the hand-written
/// `.pb.ts` siblings are copied verbatim instead of being transpiled.
pub fn is_protobuf_only(parent: &Package, dep: &str) -> bool {
    let mut any = false;
    for file in &parent.files {
        if file.ast.imports.iter().any(|i| i.path == dep) {
            any = true;
            if !file.name.ends_with(".pb.go") {
                return false;
            }
        }
    }
    any
}

/// Compiles a single package: runs the per-package analysis, emits every
/// file (in parallel, each into its own sink) and writes the re-export
/// index.
pub struct PackageCompiler<'a> {
    config: &'a Config,
    program: &'a Program,
    pkg: &'a Package,
    async_info: &'a AsyncInfo,
}

impl<'a> PackageCompiler<'a> {
    pub fn new(
        config: &'a Config,
        program: &'a Program,
        pkg: &'a Package,
        async_info: &'a AsyncInfo,
    ) -> Self {
        PackageCompiler {
            config,
            program,
            pkg,
            async_info,
        }
    }

    pub fn compile(&self) -> Result<()> {
        let analysis = analysis::analyze_package(self.program, self.pkg, self.async_info);
        let auto_imports = self.cross_file_imports();

        let out_dir = compute_module_path(&self.config.output_path, &self.pkg.path);
        fs::create_dir_all(&out_dir).map_err(|e| Error::io(&out_dir, e))?;

        let mut compiled_files: Vec<String> = Vec::new();
        let mut to_emit: Vec<&SourceFile> = Vec::new();

        for file in &self.pkg.files {
            if file.name.ends_with(".pb.go") {
                if let Some(pb_ts) = self.find_protobuf_sibling(file) {
                    debug!(file = %file.name, "copying hand-written protobuf sibling");
                    let base = file.name.trim_end_matches(".pb.go");
                    let dest = out_dir.join(format!("{base}.pb.ts"));
                    fs::copy(&pb_ts, &dest).map_err(|e| Error::io(&dest, e))?;
                    compiled_files.push(format!("{base}.pb"));
                    continue;
                }
            }
            debug!(file = %file.name, "emitting");
            let stem = translate_source_file_name(&file.name);
            compiled_files.push(stem.trim_end_matches(".ts").to_string());
            to_emit.push(file);
        }

        // Emission reads only frozen analysis and type tables; files fan
        // out, each rendering into its own sink.
        let rendered: Vec<Result<(String, String)>> = to_emit
            .par_iter()
            .map(|file| {
                let empty = FileImports::default();
                let imports = auto_imports.get(&file.name).unwrap_or(&empty);
                let source = codegen::emit_file(
                    self.program,
                    self.pkg,
                    &analysis,
                    self.async_info,
                    &file.ast,
                    &file.name,
                    imports,
                )?;
                Ok((translate_source_file_name(&file.name), source))
            })
            .collect();

        for entry in rendered {
            let (name, source) = entry?;
            let dest = out_dir.join(&name);
            fs::write(&dest, source).map_err(|e| Error::io(&dest, e))?;
        }

        self.generate_index_file(&out_dir, &compiled_files)
    }

    /// Looks next to the original source file for a hand-written
    /// `.pb.ts` replacement.
    fn find_protobuf_sibling(&self, file: &SourceFile) -> Option<std::path::PathBuf> {
        let pos_file = self.program.fset.file(file.ast.pos)?;
        let source_path = Path::new(&pos_file.name);
        let dir = source_path.parent()?;
        let base = file.name.trim_end_matches(".pb.go");
        let candidate = dir.join(format!("{base}.pb.ts"));
        candidate.is_file().then_some(candidate)
    }

    /// Which symbols each file uses from sibling files of the same
    /// package, for auto-import generation. Keyed by source file name;
    /// inner keys are the sibling's emitted module stem.
    fn cross_file_imports(&self) -> HashMap<String, FileImports> {
        let declaring = self.program.declaring_files(self.pkg);
        let mut out: HashMap<String, FileImports> = HashMap::new();

        for file in &self.pkg.files {
            let mut idents: Vec<&ast::Ident> = Vec::new();
            collect_file_idents(&file.ast, &mut idents);

            let mut per_file: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for ident in idents {
                let Some(obj_id) = self.pkg.info.uses.get(&ident.id).copied() else {
                    continue;
                };
                let Some((symbol, declared_in)) = self.importable_symbol(obj_id, &declaring) else {
                    continue;
                };
                if declared_in == file.name {
                    continue;
                }
                let stem = translate_source_file_name(&declared_in);
                let stem = stem.trim_end_matches(".ts").to_string();
                per_file.entry(stem).or_default().push(symbol);
            }

            out.insert(
                file.name.clone(),
                FileImports {
                    symbols_by_file: per_file,
                },
            );
        }
        out
    }

    /// The emitted symbol and declaring file for a package-level object,
    /// if it is importable across files. Methods resolve to the standalone
    /// `Type_Method` functions that live in their type's file.
    fn importable_symbol(
        &self,
        obj_id: ObjectId,
        declaring: &HashMap<ObjectId, String>,
    ) -> Option<(String, String)> {
        let object = self.program.obj(obj_id)?;
        if object.pkg.as_deref() != Some(self.pkg.path.as_str()) {
            return None;
        }
        match &object.kind {
            ObjectKind::Func { recv: Some(recv) } => {
                let mut t = *recv;
                if let Type::Pointer { elem } = self.program.typ(t) {
                    t = *elem;
                }
                let Type::Named {
                    name,
                    obj,
                    underlying,
                    ..
                } = self.program.typ(t)
                else {
                    return None;
                };
                match self.program.underlying(*underlying) {
                    Type::Struct { .. } | Type::Interface { .. } | Type::Basic { .. } => None,
                    _ => {
                        let type_file = declaring.get(&(*obj)?)?.clone();
                        Some((
                            format!(
                                "{}_{}",
                                sanitize_identifier(name),
                                sanitize_identifier(&object.name)
                            ),
                            type_file,
                        ))
                    }
                }
            }
            ObjectKind::Func { recv: None }
            | ObjectKind::Var { .. }
            | ObjectKind::Const { .. }
            | ObjectKind::TypeName => {
                let file = declaring.get(&obj_id)?.clone();
                Some((sanitize_identifier(&object.name), file))
            }
            _ => None,
        }
    }

    /// Writes the package index: value re-exports for functions, vars,
    /// consts and struct classes; type-only re-exports for the rest;
    /// verbatim stanzas for protobuf files.
    fn generate_index_file(&self, out_dir: &Path, compiled_files: &[String]) -> Result<()> {
        let index_path = out_dir.join("index.ts");
        let mut content = String::new();

        for stem in compiled_files {
            if stem.ends_with(".pb") {
                content.push_str(&format!("export * from \"./{stem}.js\"\n"));
                continue;
            }

            let Some(file) = self
                .pkg
                .files
                .iter()
                .find(|f| translate_source_file_name(&f.name).trim_end_matches(".ts") == stem.as_str())
            else {
                continue;
            };

            let (mut values, mut types) = (Vec::new(), Vec::new());
            for decl in &file.ast.decls {
                match decl {
                    ast::Decl::Func(f) => {
                        if f.recv.is_none() && f.name.is_exported() {
                            values.push(sanitize_identifier(&f.name.name));
                        } else if let Some(symbol) = self.exported_method_symbol(f) {
                            values.push(symbol);
                        }
                    }
                    ast::Decl::Gen(g) => {
                        for spec in &g.specs {
                            match spec {
                                ast::Spec::Type(t) if t.name.is_exported() => {
                                    if matches!(t.typ, Expr::StructType(_)) {
                                        values.push(sanitize_identifier(&t.name.name));
                                    } else {
                                        types.push(sanitize_identifier(&t.name.name));
                                    }
                                }
                                ast::Spec::Value(v) => {
                                    for name in &v.names {
                                        if name.is_exported() {
                                            values.push(sanitize_identifier(&name.name));
                                        }
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
            }

            values.sort();
            values.dedup();
            types.sort();
            types.dedup();
            if !values.is_empty() {
                content.push_str(&format!(
                    "export {{ {} }} from \"./{stem}.js\"\n",
                    values.join(", ")
                ));
            }
            if !types.is_empty() {
                content.push_str(&format!(
                    "export type {{ {} }} from \"./{stem}.js\"\n",
                    types.join(", ")
                ));
            }
        }

        fs::write(&index_path, content).map_err(|e| Error::io(&index_path, e))
    }

    /// Methods on exported named non-struct, non-primitive types surface
    /// in the index under their standalone `Type_Method` name, attributed
    /// to the file that declares the method.
    fn exported_method_symbol(&self, f: &ast::FuncDecl) -> Option<String> {
        if !f.name.is_exported() {
            return None;
        }
        let recv = f.recv.as_ref()?;
        let mut t = self.pkg.info.type_of(recv.typ.id())?;
        if let Type::Pointer { elem } = self.program.typ(t) {
            t = *elem;
        }
        let Type::Named {
            name,
            obj,
            underlying,
            ..
        } = self.program.typ(t)
        else {
            return None;
        };
        let exported = obj
            .and_then(|o| self.program.obj(o))
            .is_some_and(|o| o.is_exported());
        if !exported {
            return None;
        }
        match self.program.underlying(*underlying) {
            Type::Struct { .. } | Type::Interface { .. } | Type::Basic { .. } => None,
            _ => Some(format!(
                "{}_{}",
                sanitize_identifier(name),
                sanitize_identifier(&f.name.name)
            )),
        }
    }
}

/// Collects every identifier occurrence in a file, including those inside
/// type expressions.
fn collect_file_idents<'f>(file: &'f ast::File, out: &mut Vec<&'f ast::Ident>) {
    fn expr<'f>(e: &'f Expr, out: &mut Vec<&'f ast::Ident>) {
        match e {
            Expr::Ident(i) => out.push(i),
            Expr::BasicLit(_) => {}
            Expr::CompositeLit(c) => {
                if let Some(t) = &c.typ {
                    expr(t, out);
                }
                c.elts.iter().for_each(|x| expr(x, out));
            }
            Expr::FuncLit(l) => {
                func_type(&l.typ, out);
                block(&l.body, out);
            }
            Expr::Paren(p) => expr(&p.x, out),
            Expr::Selector(s) => {
                expr(&s.x, out);
                out.push(&s.sel);
            }
            Expr::Index(i) => {
                expr(&i.x, out);
                expr(&i.index, out);
            }
            Expr::Slice(s) => {
                expr(&s.x, out);
                for part in [&s.low, &s.high, &s.max].into_iter().flatten() {
                    expr(part, out);
                }
            }
            Expr::TypeAssert(t) => {
                expr(&t.x, out);
                expr(&t.typ, out);
            }
            Expr::Call(c) => {
                expr(&c.fun, out);
                c.args.iter().for_each(|a| expr(a, out));
            }
            Expr::Star(s) => expr(&s.x, out),
            Expr::Unary(u) => expr(&u.x, out),
            Expr::Binary(b) => {
                expr(&b.x, out);
                expr(&b.y, out);
            }
            Expr::KeyValue(kv) => {
                expr(&kv.key, out);
                expr(&kv.value, out);
            }
            Expr::ArrayType(a) => {
                if let Some(len) = &a.len {
                    expr(len, out);
                }
                expr(&a.elem, out);
            }
            Expr::StructType(s) => field_list(&s.fields, out),
            Expr::FuncType(f) => func_type(f, out),
            Expr::InterfaceType(i) => field_list(&i.methods, out),
            Expr::MapType(m) => {
                expr(&m.key, out);
                expr(&m.value, out);
            }
            Expr::ChanType(c) => expr(&c.elem, out),
        }
    }

    fn field_list<'f>(fields: &'f ast::FieldList, out: &mut Vec<&'f ast::Ident>) {
        for field in &fields.list {
            expr(&field.typ, out);
        }
    }

    fn func_type<'f>(t: &'f ast::FuncTypeExpr, out: &mut Vec<&'f ast::Ident>) {
        field_list(&t.params, out);
        if let Some(results) = &t.results {
            field_list(results, out);
        }
    }

    fn block<'f>(b: &'f ast::BlockStmt, out: &mut Vec<&'f ast::Ident>) {
        b.stmts.iter().for_each(|s| stmt(s, out));
    }

    fn stmt<'f>(s: &'f Stmt, out: &mut Vec<&'f ast::Ident>) {
        match s {
            Stmt::Block(b) => block(b, out),
            Stmt::Assign(a) => a.lhs.iter().chain(a.rhs.iter()).for_each(|e| expr(e, out)),
            Stmt::Return(r) => r.results.iter().for_each(|e| expr(e, out)),
            Stmt::Defer(d) => expr(&d.call, out),
            Stmt::Go(g) => expr(&g.call, out),
            Stmt::If(i) => {
                if let Some(init) = &i.init {
                    stmt(init, out);
                }
                expr(&i.cond, out);
                block(&i.body, out);
                if let Some(els) = &i.els {
                    stmt(els, out);
                }
            }
            Stmt::Expr(e) => expr(&e.x, out),
            Stmt::Decl(d) => {
                for spec in &d.decl.specs {
                    match spec {
                        ast::Spec::Value(v) => {
                            if let Some(t) = &v.typ {
                                expr(t, out);
                            }
                            v.values.iter().for_each(|e| expr(e, out));
                        }
                        ast::Spec::Type(t) => expr(&t.typ, out),
                        ast::Spec::Import(_) => {}
                    }
                }
            }
            Stmt::For(f) => {
                if let Some(init) = &f.init {
                    stmt(init, out);
                }
                if let Some(c) = &f.cond {
                    expr(c, out);
                }
                if let Some(p) = &f.post {
                    stmt(p, out);
                }
                block(&f.body, out);
            }
            Stmt::Range(r) => {
                expr(&r.x, out);
                block(&r.body, out);
            }
            Stmt::Switch(sw) => {
                if let Some(init) = &sw.init {
                    stmt(init, out);
                }
                if let Some(tag) = &sw.tag {
                    expr(tag, out);
                }
                for case in &sw.cases {
                    case.list.iter().for_each(|e| expr(e, out));
                    case.body.iter().for_each(|st| stmt(st, out));
                }
            }
            Stmt::TypeSwitch(ts) => {
                if let Some(init) = &ts.init {
                    stmt(init, out);
                }
                expr(&ts.subject, out);
                for case in &ts.cases {
                    case.list.iter().for_each(|e| expr(e, out));
                    case.body.iter().for_each(|st| stmt(st, out));
                }
            }
            Stmt::IncDec(i) => expr(&i.x, out),
            Stmt::Send(se) => {
                expr(&se.chan, out);
                expr(&se.value, out);
            }
            Stmt::Select(sel) => {
                for case in &sel.cases {
                    if let Some(comm) = &case.comm {
                        stmt(comm, out);
                    }
                    case.body.iter().for_each(|st| stmt(st, out));
                }
            }
            Stmt::Branch(_) | Stmt::Empty(_) => {}
            Stmt::Labeled(l) => stmt(&l.stmt, out),
        }
    }

    for decl in &file.decls {
        match decl {
            ast::Decl::Func(f) => {
                if let Some(recv) = &f.recv {
                    expr(&recv.typ, out);
                }
                func_type(&f.typ, out);
                if let Some(body) = &f.body {
                    block(body, out);
                }
            }
            ast::Decl::Gen(g) => {
                for spec in &g.specs {
                    match spec {
                        ast::Spec::Value(v) => {
                            if let Some(t) = &v.typ {
                                expr(t, out);
                            }
                            v.values.iter().for_each(|e| expr(e, out));
                        }
                        ast::Spec::Type(t) => expr(&t.typ, out),
                        ast::Spec::Import(_) => {}
                    }
                }
            }
        }
    }
}
