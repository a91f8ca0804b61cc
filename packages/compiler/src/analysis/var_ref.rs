//! Reference-cell (var-ref) analysis.
//!
//! The target language has no address operator, so every variable whose
//! address is taken is reified into a `$.varRef` cell. The pass walks each
//! file once, flagging:
//!
//! - `&v` operands (variables and struct fields),
//! - variables mutated from within a capturing function literal,
//! - pointer variables that alias a reified variable (`p := &v`), which
//!   drives the extra `.value` hop on dereferencing selectors.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::analysis::{Analysis, ObjectFlags, Walker};
use crate::loader::{Package, Program};
use crate::source::{ast, Expr, Stmt, UnaryOp};
use crate::types::ObjectId;

pub fn analyze(program: &Program, pkg: &Package, analysis: &mut Analysis) {
    let package_level: HashSet<ObjectId> =
        program.declaring_files(pkg).keys().copied().collect();

    for file in &pkg.files {
        for decl in &file.ast.decls {
            match decl {
                ast::Decl::Func(f) => {
                    if let Some(body) = &f.body {
                        scan_block(program, pkg, body, analysis);
                    }
                }
                ast::Decl::Gen(g) => {
                    for spec in &g.specs {
                        if let ast::Spec::Value(v) = spec {
                            for value in &v.values {
                                scan_expr(program, pkg, value, analysis);
                            }
                        }
                    }
                }
            }
        }
    }

    // Second walk: closure mutation captures and alias propagation need the
    // address-of flags from the first walk.
    for file in &pkg.files {
        for decl in &file.ast.decls {
            if let ast::Decl::Func(f) = decl {
                if let Some(body) = &f.body {
                    scan_captures(program, pkg, body, &package_level, analysis);
                    scan_aliases(program, pkg, body, analysis);
                }
            }
        }
    }
}

fn scan_block(
    program: &Program,
    pkg: &Package,
    block: &ast::BlockStmt,
    analysis: &mut Analysis,
) {
    let mut on_stmt = |_: &Stmt| true;
    let mut on_expr = |expr: &Expr| {
        if let Expr::Unary(u) = expr {
            if u.op == UnaryOp::Addr {
                flag_address_taken(program, pkg, &u.x, analysis);
            }
        }
        true
    };
    let mut walker = Walker {
        on_stmt: &mut on_stmt,
        on_expr: &mut on_expr,
    };
    walker.block(block);
}

fn scan_expr(program: &Program, pkg: &Package, expr: &Expr, analysis: &mut Analysis) {
    let mut on_stmt = |_: &Stmt| true;
    let mut on_expr = |e: &Expr| {
        if let Expr::Unary(u) = e {
            if u.op == UnaryOp::Addr {
                flag_address_taken(program, pkg, &u.x, analysis);
            }
        }
        true
    };
    let mut walker = Walker {
        on_stmt: &mut on_stmt,
        on_expr: &mut on_expr,
    };
    walker.expr(expr);
}

/// Marks the operand of `&x` for reification. Composite literals are
/// already fresh heap values and stay unflagged.
fn flag_address_taken(program: &Program, pkg: &Package, operand: &Expr, analysis: &mut Analysis) {
    match operand.unparen() {
        Expr::Ident(ident) => {
            if let Some(obj_id) = program.object_of(pkg, ident) {
                if let Some(obj) = program.obj(obj_id) {
                    if obj.is_var() {
                        analysis.set_object_flag(obj_id, ObjectFlags::NEEDS_VAR_REF);
                    }
                }
            }
        }
        Expr::Selector(sel) => {
            // &x.F reifies the field object so the class emits a cell-backed
            // accessor for it.
            if let Some(field_id) = pkg.info.uses.get(&sel.sel.id) {
                if program.obj(*field_id).is_some_and(|o| o.is_var()) {
                    analysis.set_object_flag(*field_id, ObjectFlags::NEEDS_VAR_REF);
                }
            }
        }
        _ => {}
    }
}

/// Flags variables of the enclosing function that a function literal
/// mutates: the shared binding must become a cell so both sides observe
/// writes through the same box.
fn scan_captures(
    program: &Program,
    pkg: &Package,
    body: &ast::BlockStmt,
    package_level: &HashSet<ObjectId>,
    analysis: &mut Analysis,
) {
    let mut lits: Vec<&ast::FuncLit> = Vec::new();
    collect_func_lits(body, &mut lits);

    for lit in lits {
        let mut inner_defs = defs_in_block(pkg, &lit.body);
        for field in &lit.typ.params.list {
            for name in &field.names {
                if let Some(obj) = pkg.info.defs.get(&name.id) {
                    inner_defs.insert(*obj);
                }
            }
        }
        let mut on_stmt = |stmt: &Stmt| {
            let mut flag_target = |target: &Expr| {
                if let Expr::Ident(ident) = target.unparen() {
                    if let Some(obj_id) = pkg.info.uses.get(&ident.id).copied() {
                        let is_outer_local = !inner_defs.contains(&obj_id)
                            && !package_level.contains(&obj_id)
                            && program.obj(obj_id).is_some_and(|o| o.is_var());
                        if is_outer_local {
                            analysis.set_object_flag(obj_id, ObjectFlags::NEEDS_VAR_REF);
                        }
                    }
                }
            };
            match stmt {
                Stmt::Assign(assign) if assign.tok != crate::source::AssignOp::Define => {
                    for lhs in &assign.lhs {
                        flag_target(lhs);
                    }
                }
                Stmt::IncDec(incdec) => flag_target(&incdec.x),
                _ => {}
            }
            true
        };
        let mut on_expr = |_: &Expr| true;
        let mut walker = Walker {
            on_stmt: &mut on_stmt,
            on_expr: &mut on_expr,
        };
        walker.block(&lit.body);
    }
}

/// Records pointer variables assigned the address of a reified variable.
fn scan_aliases(program: &Program, pkg: &Package, body: &ast::BlockStmt, analysis: &mut Analysis) {
    let mut pending: SmallVec<[(ObjectId, ObjectId); 8]> = SmallVec::new();
    let mut on_stmt = |stmt: &Stmt| {
        if let Stmt::Assign(assign) = stmt {
            for (lhs, rhs) in assign.lhs.iter().zip(assign.rhs.iter()) {
                let (Expr::Ident(p), Expr::Unary(u)) = (lhs.unparen(), rhs.unparen()) else {
                    continue;
                };
                if u.op != UnaryOp::Addr {
                    continue;
                }
                let Expr::Ident(v) = u.x.unparen() else {
                    continue;
                };
                let (Some(p_obj), Some(v_obj)) = (
                    pkg.info.object_of(p.id),
                    program.object_of(pkg, v),
                ) else {
                    continue;
                };
                pending.push((p_obj, v_obj));
            }
        }
        true
    };
    let mut on_expr = |_: &Expr| true;
    let mut walker = Walker {
        on_stmt: &mut on_stmt,
        on_expr: &mut on_expr,
    };
    walker.block(body);

    for (p_obj, v_obj) in pending {
        if analysis.needs_var_ref(v_obj) {
            analysis.set_object_flag(p_obj, ObjectFlags::VAR_REF_ALIAS);
        }
    }
}

fn collect_func_lits<'a>(block: &'a ast::BlockStmt, out: &mut Vec<&'a ast::FuncLit>) {
    // The walker hands out short-lived references, so function literals are
    // gathered through raw recursion instead.
    struct Finder<'a> {
        out: Vec<&'a ast::FuncLit>,
    }
    impl<'a> Finder<'a> {
        fn block(&mut self, b: &'a ast::BlockStmt) {
            for s in &b.stmts {
                self.stmt(s);
            }
        }
        fn stmt(&mut self, s: &'a Stmt) {
            match s {
                Stmt::Block(b) => self.block(b),
                Stmt::Assign(a) => {
                    for e in a.lhs.iter().chain(a.rhs.iter()) {
                        self.expr(e);
                    }
                }
                Stmt::Return(r) => r.results.iter().for_each(|e| self.expr(e)),
                Stmt::Defer(d) => self.expr(&d.call),
                Stmt::Go(g) => self.expr(&g.call),
                Stmt::If(i) => {
                    if let Some(init) = &i.init {
                        self.stmt(init);
                    }
                    self.expr(&i.cond);
                    self.block(&i.body);
                    if let Some(els) = &i.els {
                        self.stmt(els);
                    }
                }
                Stmt::Expr(e) => self.expr(&e.x),
                Stmt::Decl(d) => {
                    for spec in &d.decl.specs {
                        if let ast::Spec::Value(v) = spec {
                            v.values.iter().for_each(|e| self.expr(e));
                        }
                    }
                }
                Stmt::For(f) => {
                    if let Some(init) = &f.init {
                        self.stmt(init);
                    }
                    if let Some(c) = &f.cond {
                        self.expr(c);
                    }
                    if let Some(p) = &f.post {
                        self.stmt(p);
                    }
                    self.block(&f.body);
                }
                Stmt::Range(r) => {
                    self.expr(&r.x);
                    self.block(&r.body);
                }
                Stmt::Switch(sw) => {
                    for c in &sw.cases {
                        c.list.iter().for_each(|e| self.expr(e));
                        c.body.iter().for_each(|st| self.stmt(st));
                    }
                }
                Stmt::TypeSwitch(ts) => {
                    self.expr(&ts.subject);
                    for c in &ts.cases {
                        c.body.iter().for_each(|st| self.stmt(st));
                    }
                }
                Stmt::IncDec(i) => self.expr(&i.x),
                Stmt::Send(s) => {
                    self.expr(&s.chan);
                    self.expr(&s.value);
                }
                Stmt::Select(sel) => {
                    for c in &sel.cases {
                        if let Some(comm) = &c.comm {
                            self.stmt(comm);
                        }
                        c.body.iter().for_each(|st| self.stmt(st));
                    }
                }
                Stmt::Labeled(l) => self.stmt(&l.stmt),
                Stmt::Branch(_) | Stmt::Empty(_) => {}
            }
        }
        fn expr(&mut self, e: &'a Expr) {
            match e {
                Expr::FuncLit(lit) => {
                    self.out.push(lit);
                    self.block(&lit.body);
                }
                Expr::CompositeLit(c) => c.elts.iter().for_each(|x| self.expr(x)),
                Expr::Paren(p) => self.expr(&p.x),
                Expr::Selector(s) => self.expr(&s.x),
                Expr::Index(i) => {
                    self.expr(&i.x);
                    self.expr(&i.index);
                }
                Expr::Slice(s) => {
                    self.expr(&s.x);
                    for part in [&s.low, &s.high, &s.max].into_iter().flatten() {
                        self.expr(part);
                    }
                }
                Expr::TypeAssert(t) => self.expr(&t.x),
                Expr::Call(c) => {
                    self.expr(&c.fun);
                    c.args.iter().for_each(|a| self.expr(a));
                }
                Expr::Star(s) => self.expr(&s.x),
                Expr::Unary(u) => self.expr(&u.x),
                Expr::Binary(b) => {
                    self.expr(&b.x);
                    self.expr(&b.y);
                }
                Expr::KeyValue(kv) => {
                    self.expr(&kv.key);
                    self.expr(&kv.value);
                }
                _ => {}
            }
        }
    }
    let mut finder = Finder { out: Vec::new() };
    finder.block(block);
    out.extend(finder.out);
}

/// All objects defined (declared) within a block, function literals
/// included.
fn defs_in_block(pkg: &Package, block: &ast::BlockStmt) -> HashSet<ObjectId> {
    let mut defs = HashSet::new();
    let mut on_stmt = |stmt: &Stmt| {
        match stmt {
            Stmt::Assign(a) if a.tok == crate::source::AssignOp::Define => {
                for lhs in &a.lhs {
                    if let Expr::Ident(ident) = lhs {
                        if let Some(obj) = pkg.info.defs.get(&ident.id) {
                            defs.insert(*obj);
                        }
                    }
                }
            }
            Stmt::Decl(d) => {
                for spec in &d.decl.specs {
                    if let ast::Spec::Value(v) = spec {
                        for name in &v.names {
                            if let Some(obj) = pkg.info.defs.get(&name.id) {
                                defs.insert(*obj);
                            }
                        }
                    }
                }
            }
            Stmt::Range(r) => {
                for target in [&r.key, &r.value].into_iter().flatten() {
                    if let Expr::Ident(ident) = target {
                        if let Some(obj) = pkg.info.defs.get(&ident.id) {
                            defs.insert(*obj);
                        }
                    }
                }
            }
            _ => {}
        }
        true
    };
    let mut on_expr = |_: &Expr| true;
    let mut walker = Walker {
        on_stmt: &mut on_stmt,
        on_expr: &mut on_expr,
    };
    walker.block(block);
    defs
}
