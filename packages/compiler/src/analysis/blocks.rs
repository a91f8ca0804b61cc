//! Per-block analysis: defer stacks, async-context marking, bare returns,
//! receiver usage and short-scope shadowing.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::analysis::{Analysis, AsyncInfo, NodeFlags, ObjectFlags, ShadowedVar, ShadowingInfo};
use crate::loader::{Package, Program};
use crate::source::{ast, AssignOp, Expr, Stmt};
use crate::util::deterministic_id;

pub fn analyze(program: &Program, pkg: &Package, async_info: &AsyncInfo, analysis: &mut Analysis) {
    for file in &pkg.files {
        for decl in &file.ast.decls {
            let ast::Decl::Func(f) = decl else { continue };
            let Some(body) = &f.body else { continue };

            let obj = pkg.info.defs.get(&f.name.id).copied();
            let is_async = obj.is_some_and(|o| async_info.is_async_func(program, o))
                || (f.name.name == "main" && pkg.name == "main" && f.recv.is_none());
            let named = named_results(&f.typ);

            analyze_unit(program, pkg, async_info, body, is_async, &named, analysis);

            if let (Some(method_obj), Some(recv)) = (obj, &f.recv) {
                if let Some(recv_ident) = recv.names.first() {
                    if !recv_ident.is_blank() && receiver_used(pkg, recv_ident, body) {
                        analysis.set_object_flag(method_obj, ObjectFlags::RECEIVER_USED);
                    }
                }
            }
        }
    }
}

fn named_results(typ: &ast::FuncTypeExpr) -> SmallVec<[String; 4]> {
    let mut names = SmallVec::new();
    if let Some(results) = &typ.results {
        for field in &results.list {
            for name in &field.names {
                names.push(name.name.clone());
            }
        }
    }
    names
}

/// Analyzes one function body. Nested function literals are their own
/// units: defer stacks and async context never leak across them.
fn analyze_unit(
    program: &Program,
    pkg: &Package,
    async_info: &AsyncInfo,
    body: &ast::BlockStmt,
    is_async: bool,
    named: &[String],
    analysis: &mut Analysis,
) {
    if contains_defer(body) {
        analysis.set_node_flag(body.id, NodeFlags::NEEDS_DEFER_STACK);
    }
    walk_unit(program, pkg, async_info, body, is_async, named, analysis);
    if is_async {
        analysis.set_node_flag(body.id, NodeFlags::IN_ASYNC_CONTEXT);
    }
}

/// True if the block (or a nested block that does not open a new function)
/// contains a defer statement.
fn contains_defer(block: &ast::BlockStmt) -> bool {
    block.stmts.iter().any(stmt_contains_defer)
}

fn stmt_contains_defer(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Defer(_) => true,
        Stmt::Block(b) => contains_defer(b),
        Stmt::If(s) => {
            s.init.as_deref().is_some_and(stmt_contains_defer)
                || contains_defer(&s.body)
                || s.els.as_deref().is_some_and(stmt_contains_defer)
        }
        Stmt::For(s) => contains_defer(&s.body),
        Stmt::Range(s) => contains_defer(&s.body),
        Stmt::Switch(s) => s
            .cases
            .iter()
            .any(|c| c.body.iter().any(stmt_contains_defer)),
        Stmt::TypeSwitch(s) => s
            .cases
            .iter()
            .any(|c| c.body.iter().any(stmt_contains_defer)),
        Stmt::Select(s) => s
            .cases
            .iter()
            .any(|c| c.body.iter().any(stmt_contains_defer)),
        Stmt::Labeled(s) => stmt_contains_defer(&s.stmt),
        _ => false,
    }
}

fn walk_unit(
    program: &Program,
    pkg: &Package,
    async_info: &AsyncInfo,
    block: &ast::BlockStmt,
    is_async: bool,
    named: &[String],
    analysis: &mut Analysis,
) {
    if is_async {
        analysis.set_node_flag(block.id, NodeFlags::IN_ASYNC_CONTEXT);
    }
    for stmt in &block.stmts {
        walk_stmt(program, pkg, async_info, stmt, is_async, named, analysis);
    }
}

fn walk_stmt(
    program: &Program,
    pkg: &Package,
    async_info: &AsyncInfo,
    stmt: &Stmt,
    is_async: bool,
    named: &[String],
    analysis: &mut Analysis,
) {
    let mut walk_block =
        |b: &ast::BlockStmt, a: &mut Analysis| walk_unit(program, pkg, async_info, b, is_async, named, a);

    match stmt {
        Stmt::Return(r) => {
            if r.results.is_empty() && !named.is_empty() {
                analysis.set_bare_return(r.id, named.to_vec());
            }
        }
        Stmt::Assign(a) => {
            // A plain rebind inside a block renames the fresh binding;
            // lifting the outer one here would land inside the same scope
            // and read the new binding before its declaration.
            if a.tok == AssignOp::Define {
                if let Some(info) = detect_shadowing(program, pkg, a) {
                    let renames = info
                        .entries
                        .iter()
                        .filter_map(|(name, var)| {
                            let new_obj = a.lhs.iter().find_map(|lhs| {
                                let ident = lhs.as_ident()?;
                                if ident.name == *name {
                                    pkg.info.defs.get(&ident.id).copied()
                                } else {
                                    None
                                }
                            })?;
                            Some((new_obj, var.temp.clone()))
                        })
                        .collect::<Vec<_>>();
                    if !renames.is_empty() {
                        analysis.set_rebinds(a.id, renames);
                    }
                }
            }
            for e in a.lhs.iter().chain(a.rhs.iter()) {
                walk_expr(program, pkg, async_info, e, analysis);
            }
        }
        Stmt::If(s) => {
            if let Some(init) = &s.init {
                match init.as_ref() {
                    Stmt::Assign(a) => {
                        if a.tok == AssignOp::Define {
                            if let Some(info) = detect_shadowing(program, pkg, a) {
                                analysis.set_shadowing(s.id, info);
                            }
                        }
                        for e in a.lhs.iter().chain(a.rhs.iter()) {
                            walk_expr(program, pkg, async_info, e, analysis);
                        }
                    }
                    other => {
                        walk_stmt(program, pkg, async_info, other, is_async, named, analysis)
                    }
                }
            }
            walk_expr(program, pkg, async_info, &s.cond, analysis);
            walk_block(&s.body, analysis);
            if let Some(els) = &s.els {
                walk_stmt(program, pkg, async_info, els, is_async, named, analysis);
            }
        }
        Stmt::Switch(s) => {
            if let Some(init) = &s.init {
                match init.as_ref() {
                    Stmt::Assign(a) => {
                        if a.tok == AssignOp::Define {
                            if let Some(info) = detect_shadowing(program, pkg, a) {
                                analysis.set_shadowing(s.id, info);
                            }
                        }
                        for e in a.lhs.iter().chain(a.rhs.iter()) {
                            walk_expr(program, pkg, async_info, e, analysis);
                        }
                    }
                    other => {
                        walk_stmt(program, pkg, async_info, other, is_async, named, analysis)
                    }
                }
            }
            if let Some(tag) = &s.tag {
                walk_expr(program, pkg, async_info, tag, analysis);
            }
            for case in &s.cases {
                for st in &case.body {
                    walk_stmt(program, pkg, async_info, st, is_async, named, analysis);
                }
            }
        }
        Stmt::TypeSwitch(s) => {
            if let Some(init) = &s.init {
                match init.as_ref() {
                    Stmt::Assign(a) => {
                        if a.tok == AssignOp::Define {
                            if let Some(info) = detect_shadowing(program, pkg, a) {
                                analysis.set_shadowing(s.id, info);
                            }
                        }
                        for e in a.lhs.iter().chain(a.rhs.iter()) {
                            walk_expr(program, pkg, async_info, e, analysis);
                        }
                    }
                    other => {
                        walk_stmt(program, pkg, async_info, other, is_async, named, analysis)
                    }
                }
            }
            walk_expr(program, pkg, async_info, &s.subject, analysis);
            for case in &s.cases {
                for st in &case.body {
                    walk_stmt(program, pkg, async_info, st, is_async, named, analysis);
                }
            }
        }
        Stmt::Block(b) => walk_block(b, analysis),
        Stmt::For(s) => {
            if let Some(init) = &s.init {
                walk_stmt(program, pkg, async_info, init, is_async, named, analysis);
            }
            if let Some(cond) = &s.cond {
                walk_expr(program, pkg, async_info, cond, analysis);
            }
            if let Some(post) = &s.post {
                walk_stmt(program, pkg, async_info, post, is_async, named, analysis);
            }
            walk_block(&s.body, analysis);
        }
        Stmt::Range(s) => {
            walk_expr(program, pkg, async_info, &s.x, analysis);
            walk_block(&s.body, analysis);
        }
        Stmt::Select(s) => {
            for case in &s.cases {
                if let Some(comm) = &case.comm {
                    walk_stmt(program, pkg, async_info, comm, is_async, named, analysis);
                }
                for st in &case.body {
                    walk_stmt(program, pkg, async_info, st, is_async, named, analysis);
                }
            }
        }
        Stmt::Labeled(s) => walk_stmt(program, pkg, async_info, &s.stmt, is_async, named, analysis),
        Stmt::Expr(s) => walk_expr(program, pkg, async_info, &s.x, analysis),
        Stmt::Go(s) => walk_expr(program, pkg, async_info, &s.call, analysis),
        Stmt::Defer(s) => walk_expr(program, pkg, async_info, &s.call, analysis),
        Stmt::Send(s) => {
            walk_expr(program, pkg, async_info, &s.chan, analysis);
            walk_expr(program, pkg, async_info, &s.value, analysis);
        }
        Stmt::IncDec(s) => walk_expr(program, pkg, async_info, &s.x, analysis),
        Stmt::Decl(d) => {
            for spec in &d.decl.specs {
                if let ast::Spec::Value(v) = spec {
                    for value in &v.values {
                        walk_expr(program, pkg, async_info, value, analysis);
                    }
                }
            }
        }
        Stmt::Branch(_) | Stmt::Empty(_) => {}
    }
}

/// Descends into expressions only to find function literals, which start
/// fresh units with their own async context and named results.
fn walk_expr(
    program: &Program,
    pkg: &Package,
    async_info: &AsyncInfo,
    expr: &Expr,
    analysis: &mut Analysis,
) {
    let mut on_stmt = |_: &Stmt| true;
    let mut lits: Vec<ast::FuncLit> = Vec::new();
    let mut on_expr = |e: &Expr| {
        if let Expr::FuncLit(lit) = e {
            lits.push(lit.clone());
            return false;
        }
        true
    };
    let mut walker = crate::analysis::Walker {
        on_stmt: &mut on_stmt,
        on_expr: &mut on_expr,
    };
    walker.expr(expr);

    for lit in lits {
        let lit_async = async_info.is_func_lit_async(lit.id);
        let lit_named = named_results(&lit.typ);
        analyze_unit(
            program,
            pkg,
            async_info,
            &lit.body,
            lit_async,
            &lit_named,
            analysis,
        );
    }
}

/// True if the method body references the receiver binding.
fn receiver_used(pkg: &Package, recv: &ast::Ident, body: &ast::BlockStmt) -> bool {
    let Some(recv_obj) = pkg.info.defs.get(&recv.id).copied() else {
        return false;
    };
    let mut used = false;
    let mut on_stmt = |_: &Stmt| true;
    let mut on_expr = |e: &Expr| {
        if let Expr::Ident(ident) = e {
            if pkg.info.uses.get(&ident.id) == Some(&recv_obj) {
                used = true;
            }
        }
        !used
    };
    let mut walker = crate::analysis::Walker {
        on_stmt: &mut on_stmt,
        on_expr: &mut on_expr,
    };
    walker.block(body);
    used
}

/// Detects `v, err := f(err)`-style rebinds where a short declaration
/// re-binds a name whose outer binding is still read by the initializer.
fn detect_shadowing(program: &Program, pkg: &Package, assign: &ast::AssignStmt) -> Option<ShadowingInfo> {
    let mut entries: IndexMap<String, ShadowedVar> = IndexMap::new();

    for lhs in &assign.lhs {
        let Expr::Ident(ident) = lhs else { continue };
        if ident.is_blank() {
            continue;
        }
        let Some(new_obj) = pkg.info.defs.get(&ident.id).copied() else {
            continue;
        };

        for rhs in &assign.rhs {
            let mut found = None;
            let mut on_stmt = |_: &Stmt| true;
            let mut on_expr = |e: &Expr| {
                if let Expr::Ident(use_ident) = e {
                    if use_ident.name == ident.name {
                        if let Some(outer) = pkg.info.uses.get(&use_ident.id).copied() {
                            if outer != new_obj {
                                found = Some(outer);
                            }
                        }
                    }
                }
                found.is_none()
            };
            let mut walker = crate::analysis::Walker {
                on_stmt: &mut on_stmt,
                on_expr: &mut on_expr,
            };
            walker.expr(rhs);

            if let Some(outer) = found {
                let temp = format!(
                    "_tmp_{}_{}",
                    ident.name,
                    deterministic_id(&program.fset, &pkg.path, assign.pos)
                );
                entries.insert(
                    ident.name.clone(),
                    ShadowedVar { outer, temp },
                );
                break;
            }
        }
    }

    if entries.is_empty() {
        None
    } else {
        Some(ShadowingInfo { entries })
    }
}
