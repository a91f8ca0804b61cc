//! Generic pre-order syntax walker shared by the analysis passes.

use crate::source::{ast, Expr, Stmt};

/// Pre-order walker over statements and expressions. The callbacks return
/// `true` to descend into the node's children, which lets passes stop at
/// function-literal boundaries.
pub struct Walker<'f> {
    pub on_stmt: &'f mut dyn FnMut(&Stmt) -> bool,
    pub on_expr: &'f mut dyn FnMut(&Expr) -> bool,
}

impl Walker<'_> {
    pub fn block(&mut self, block: &ast::BlockStmt) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
    }

    pub fn stmt(&mut self, stmt: &Stmt) {
        if !(self.on_stmt)(stmt) {
            return;
        }
        match stmt {
            Stmt::Block(b) => self.block(b),
            Stmt::Assign(s) => {
                for e in s.lhs.iter().chain(s.rhs.iter()) {
                    self.expr(e);
                }
            }
            Stmt::Return(s) => {
                for e in &s.results {
                    self.expr(e);
                }
            }
            Stmt::Defer(s) => self.expr(&s.call),
            Stmt::If(s) => {
                if let Some(init) = &s.init {
                    self.stmt(init);
                }
                self.expr(&s.cond);
                self.block(&s.body);
                if let Some(els) = &s.els {
                    self.stmt(els);
                }
            }
            Stmt::Expr(s) => self.expr(&s.x),
            Stmt::Decl(s) => {
                for spec in &s.decl.specs {
                    if let ast::Spec::Value(v) = spec {
                        for e in &v.values {
                            self.expr(e);
                        }
                    }
                }
            }
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    self.stmt(init);
                }
                if let Some(cond) = &s.cond {
                    self.expr(cond);
                }
                if let Some(post) = &s.post {
                    self.stmt(post);
                }
                self.block(&s.body);
            }
            Stmt::Range(s) => {
                if let Some(k) = &s.key {
                    self.expr(k);
                }
                if let Some(v) = &s.value {
                    self.expr(v);
                }
                self.expr(&s.x);
                self.block(&s.body);
            }
            Stmt::Switch(s) => {
                if let Some(init) = &s.init {
                    self.stmt(init);
                }
                if let Some(tag) = &s.tag {
                    self.expr(tag);
                }
                for case in &s.cases {
                    for e in &case.list {
                        self.expr(e);
                    }
                    for st in &case.body {
                        self.stmt(st);
                    }
                }
            }
            Stmt::TypeSwitch(s) => {
                if let Some(init) = &s.init {
                    self.stmt(init);
                }
                self.expr(&s.subject);
                for case in &s.cases {
                    for st in &case.body {
                        self.stmt(st);
                    }
                }
            }
            Stmt::IncDec(s) => self.expr(&s.x),
            Stmt::Send(s) => {
                self.expr(&s.chan);
                self.expr(&s.value);
            }
            Stmt::Go(s) => self.expr(&s.call),
            Stmt::Select(s) => {
                for case in &s.cases {
                    if let Some(comm) = &case.comm {
                        self.stmt(comm);
                    }
                    for st in &case.body {
                        self.stmt(st);
                    }
                }
            }
            Stmt::Branch(_) | Stmt::Empty(_) => {}
            Stmt::Labeled(s) => self.stmt(&s.stmt),
        }
    }

    pub fn expr(&mut self, expr: &Expr) {
        if !(self.on_expr)(expr) {
            return;
        }
        match expr {
            Expr::Ident(_) | Expr::BasicLit(_) => {}
            Expr::CompositeLit(e) => {
                for elt in &e.elts {
                    self.expr(elt);
                }
            }
            Expr::FuncLit(e) => self.block(&e.body),
            Expr::Paren(e) => self.expr(&e.x),
            Expr::Selector(e) => self.expr(&e.x),
            Expr::Index(e) => {
                self.expr(&e.x);
                self.expr(&e.index);
            }
            Expr::Slice(e) => {
                self.expr(&e.x);
                for part in [&e.low, &e.high, &e.max].into_iter().flatten() {
                    self.expr(part);
                }
            }
            Expr::TypeAssert(e) => self.expr(&e.x),
            Expr::Call(e) => {
                self.expr(&e.fun);
                for arg in &e.args {
                    self.expr(arg);
                }
            }
            Expr::Star(e) => self.expr(&e.x),
            Expr::Unary(e) => self.expr(&e.x),
            Expr::Binary(e) => {
                self.expr(&e.x);
                self.expr(&e.y);
            }
            Expr::KeyValue(e) => {
                self.expr(&e.key);
                self.expr(&e.value);
            }
            Expr::ArrayType(_)
            | Expr::StructType(_)
            | Expr::FuncType(_)
            | Expr::InterfaceType(_)
            | Expr::MapType(_)
            | Expr::ChanType(_) => {}
        }
    }
}
