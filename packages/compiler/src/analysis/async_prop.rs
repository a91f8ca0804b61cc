//! Async-propagation analysis.
//!
//! Channel operations are the suspension points of the emitted code, and a
//! function that transitively performs one must be emitted `async` with
//! every call site awaited. The source language has no async marker, so
//! this pass computes a least fixed point over the call graph of the whole
//! loaded closure:
//!
//! 1. seed functions whose bodies syntactically contain a channel send,
//!    receive, select or range-over-channel,
//! 2. propagate through call sites until stable,
//! 3. close over interface satisfaction: if any implementation of any
//!    method of an interface is async, every implementation of every
//!    method of that interface (across all satisfying types) is async.
//!
//! Goroutine spawns and deferred calls do not infect the spawning
//! function. Overlay packages that are never transpiled contribute their
//! async bits through `meta.json` seeds.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::loader::{Package, Program};
use crate::source::{ast, Expr, NodeId, Stmt, UnaryOp};
use crate::types::{ObjectId, ObjectKind, Type, TypeId};

/// Async bits seeded from overlay metadata, keyed by package path and
/// `"Type.Method"` (or bare function) name.
#[derive(Debug, Clone, Default)]
pub struct AsyncSeeds {
    entries: HashMap<(String, String), bool>,
}

impl AsyncSeeds {
    pub fn insert(&mut self, pkg: impl Into<String>, key: impl Into<String>, is_async: bool) {
        self.entries.insert((pkg.into(), key.into()), is_async);
    }

    pub fn lookup(&self, pkg: &str, key: &str) -> Option<bool> {
        self.entries.get(&(pkg.to_string(), key.to_string())).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of the program-wide fixed point.
#[derive(Debug, Default)]
pub struct AsyncInfo {
    async_objs: HashSet<ObjectId>,
    async_lits: HashSet<NodeId>,
    /// `(package, receiver type name, method name)` bits, covering both
    /// computed methods and overlay seeds. Receiver name is empty for
    /// plain functions.
    methods: HashMap<(String, String, String), bool>,
    seeds: AsyncSeeds,
}

impl AsyncInfo {
    /// Whether calls to this function or method object must be awaited.
    pub fn is_async_func(&self, program: &Program, obj: ObjectId) -> bool {
        self.async_objs.contains(&obj) || self.seeded(program, obj)
    }

    pub fn is_func_lit_async(&self, lit: NodeId) -> bool {
        self.async_lits.contains(&lit)
    }

    /// Cross-package query by name triple; answers overlay-seeded packages
    /// without their syntax being loaded.
    pub fn is_method_async(&self, pkg: &str, recv: &str, name: &str) -> bool {
        let key = (pkg.to_string(), recv.to_string(), name.to_string());
        if let Some(bit) = self.methods.get(&key) {
            return *bit;
        }
        let seed_key = if recv.is_empty() {
            name.to_string()
        } else {
            format!("{recv}.{name}")
        };
        self.seeds.lookup(pkg, &seed_key).unwrap_or(false)
    }

    fn seeded(&self, program: &Program, obj: ObjectId) -> bool {
        let Some(object) = program.obj(obj) else {
            return false;
        };
        let Some(pkg) = object.pkg.as_deref() else {
            return false;
        };
        let key = match &object.kind {
            ObjectKind::Func { recv: Some(recv) } => {
                let recv_name = receiver_type_name(program, *recv);
                if recv_name.is_empty() {
                    object.name.clone()
                } else {
                    format!("{recv_name}.{}", object.name)
                }
            }
            ObjectKind::Func { recv: None } => object.name.clone(),
            _ => return false,
        };
        self.seeds.lookup(pkg, &key).unwrap_or(false)
    }
}

/// Name of the receiver's named type, looking through one pointer level.
pub fn receiver_type_name(program: &Program, recv: TypeId) -> String {
    let mut id = recv;
    if let Type::Pointer { elem } = program.typ(id) {
        id = *elem;
    }
    match program.typ(id) {
        Type::Named { name, .. } => name.clone(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum UnitKey {
    Obj(ObjectId),
    Lit(NodeId),
}

struct UnitData {
    key: UnitKey,
    direct: bool,
    calls: Vec<UnitKey>,
}

/// Runs the whole-program fixed point.
pub fn analyze_async(program: &Program, seeds: AsyncSeeds) -> AsyncInfo {
    let mut collector = Collector {
        program,
        units: Vec::new(),
    };
    for pkg in program.packages.values() {
        for file in &pkg.files {
            for decl in &file.ast.decls {
                if let ast::Decl::Func(f) = decl {
                    let Some(body) = &f.body else { continue };
                    let Some(obj) = pkg.info.defs.get(&f.name.id).copied() else {
                        continue;
                    };
                    let unit = collector.push_unit(UnitKey::Obj(obj));
                    collector.block(pkg, body, unit);
                }
            }
        }
    }

    let units = collector.units;
    let mut info = AsyncInfo {
        seeds,
        ..AsyncInfo::default()
    };

    // Seed: directly-async units plus the program entry point.
    for unit in &units {
        if unit.direct {
            mark(&mut info, unit.key);
        }
    }
    for (id, obj) in program.objects() {
        if obj.name == "main" && obj.is_func() && !obj.is_method() {
            let in_main_pkg = obj
                .pkg
                .as_deref()
                .and_then(|p| program.package(p))
                .is_some_and(|p| p.name == "main");
            if in_main_pkg {
                info.async_objs.insert(id);
            }
        }
    }

    let ifaces = collect_interfaces(program);
    let impls = collect_concrete_methods(program);

    // Least fixed point over calls and interface satisfaction together.
    loop {
        let mut changed = false;

        for unit in &units {
            if is_marked(&info, unit.key) {
                continue;
            }
            let any_async_callee = unit.calls.iter().any(|callee| match callee {
                UnitKey::Obj(obj) => info.is_async_func(program, *obj),
                UnitKey::Lit(lit) => info.async_lits.contains(lit),
            });
            if any_async_callee {
                mark(&mut info, unit.key);
                changed = true;
            }
        }

        for iface in &ifaces {
            let mut members: Vec<ObjectId> = iface.slots.clone();
            for concrete in &impls {
                if satisfies(concrete, &iface.method_names) {
                    for name in &iface.method_names {
                        if let Some(m) = concrete.methods.get(name) {
                            members.push(*m);
                        }
                    }
                }
            }
            let any_async = members
                .iter()
                .any(|m| info.is_async_func(program, *m));
            if any_async {
                for m in members {
                    if info.async_objs.insert(m) {
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    // Publish the cross-package method table (seeded bits included).
    let mut published = Vec::new();
    for (id, obj) in program.objects() {
        if let ObjectKind::Func { recv } = &obj.kind {
            let pkg = obj.pkg.clone().unwrap_or_default();
            let recv_name = recv
                .map(|r| receiver_type_name(program, r))
                .unwrap_or_default();
            published.push((
                (pkg, recv_name, obj.name.clone()),
                info.is_async_func(program, id),
            ));
        }
    }
    for (key, bit) in published {
        info.methods.insert(key, bit);
    }

    debug!(
        async_funcs = info.async_objs.len(),
        async_lits = info.async_lits.len(),
        "async propagation fixed point reached"
    );
    info
}

fn mark(info: &mut AsyncInfo, key: UnitKey) {
    match key {
        UnitKey::Obj(o) => {
            info.async_objs.insert(o);
        }
        UnitKey::Lit(n) => {
            info.async_lits.insert(n);
        }
    }
}

fn is_marked(info: &AsyncInfo, key: UnitKey) -> bool {
    match key {
        UnitKey::Obj(o) => info.async_objs.contains(&o),
        UnitKey::Lit(n) => info.async_lits.contains(&n),
    }
}

struct InterfaceSet {
    method_names: Vec<String>,
    /// Interface method slot objects, when the interface is a named type.
    slots: Vec<ObjectId>,
}

struct ConcreteMethods {
    methods: HashMap<String, ObjectId>,
}

fn satisfies(concrete: &ConcreteMethods, iface_names: &[String]) -> bool {
    !iface_names.is_empty() && iface_names.iter().all(|n| concrete.methods.contains_key(n))
}

fn collect_interfaces(program: &Program) -> Vec<InterfaceSet> {
    let mut out = Vec::new();
    for (_, typ) in program.types() {
        if let Type::Named {
            underlying,
            methods,
            ..
        } = typ
        {
            if let Type::Interface {
                methods: iface_methods,
            } = program.typ(*underlying)
            {
                if iface_methods.is_empty() {
                    continue;
                }
                out.push(InterfaceSet {
                    method_names: iface_methods.iter().map(|m| m.name.clone()).collect(),
                    slots: methods.clone(),
                });
            }
        }
    }
    out
}

fn collect_concrete_methods(program: &Program) -> Vec<ConcreteMethods> {
    let mut out = Vec::new();
    for (_, typ) in program.types() {
        if let Type::Named {
            underlying,
            methods,
            ..
        } = typ
        {
            if program.typ(*underlying).is_interface() {
                continue;
            }
            if methods.is_empty() {
                continue;
            }
            let mut map = HashMap::new();
            for m in methods {
                if let Some(obj) = program.obj(*m) {
                    map.insert(obj.name.clone(), *m);
                }
            }
            out.push(ConcreteMethods { methods: map });
        }
    }
    out
}

struct Collector<'p> {
    program: &'p Program,
    units: Vec<UnitData>,
}

impl<'p> Collector<'p> {
    fn push_unit(&mut self, key: UnitKey) -> usize {
        self.units.push(UnitData {
            key,
            direct: false,
            calls: Vec::new(),
        });
        self.units.len() - 1
    }

    fn block(&mut self, pkg: &Package, block: &ast::BlockStmt, unit: usize) {
        for stmt in &block.stmts {
            self.stmt(pkg, stmt, unit);
        }
    }

    fn stmt(&mut self, pkg: &Package, stmt: &Stmt, unit: usize) {
        match stmt {
            Stmt::Send(s) => {
                self.units[unit].direct = true;
                self.expr(pkg, &s.chan, unit);
                self.expr(pkg, &s.value, unit);
            }
            Stmt::Select(s) => {
                self.units[unit].direct = true;
                for case in &s.cases {
                    if let Some(comm) = &case.comm {
                        self.stmt(pkg, comm, unit);
                    }
                    for st in &case.body {
                        self.stmt(pkg, st, unit);
                    }
                }
            }
            Stmt::Range(s) => {
                if self.is_channel(pkg, &s.x) {
                    self.units[unit].direct = true;
                }
                self.expr(pkg, &s.x, unit);
                self.block(pkg, &s.body, unit);
            }
            Stmt::Go(s) => self.go_call(pkg, &s.call, unit),
            Stmt::Defer(s) => self.defer_call(pkg, &s.call, unit),
            Stmt::Block(b) => self.block(pkg, b, unit),
            Stmt::Assign(a) => {
                for e in a.lhs.iter().chain(a.rhs.iter()) {
                    self.expr(pkg, e, unit);
                }
            }
            Stmt::Return(r) => {
                for e in &r.results {
                    self.expr(pkg, e, unit);
                }
            }
            Stmt::If(i) => {
                if let Some(init) = &i.init {
                    self.stmt(pkg, init, unit);
                }
                self.expr(pkg, &i.cond, unit);
                self.block(pkg, &i.body, unit);
                if let Some(els) = &i.els {
                    self.stmt(pkg, els, unit);
                }
            }
            Stmt::Expr(e) => self.expr(pkg, &e.x, unit),
            Stmt::Decl(d) => {
                for spec in &d.decl.specs {
                    if let ast::Spec::Value(v) = spec {
                        for value in &v.values {
                            self.expr(pkg, value, unit);
                        }
                    }
                }
            }
            Stmt::For(f) => {
                if let Some(init) = &f.init {
                    self.stmt(pkg, init, unit);
                }
                if let Some(cond) = &f.cond {
                    self.expr(pkg, cond, unit);
                }
                if let Some(post) = &f.post {
                    self.stmt(pkg, post, unit);
                }
                self.block(pkg, &f.body, unit);
            }
            Stmt::Switch(s) => {
                if let Some(init) = &s.init {
                    self.stmt(pkg, init, unit);
                }
                if let Some(tag) = &s.tag {
                    self.expr(pkg, tag, unit);
                }
                for case in &s.cases {
                    for e in &case.list {
                        self.expr(pkg, e, unit);
                    }
                    for st in &case.body {
                        self.stmt(pkg, st, unit);
                    }
                }
            }
            Stmt::TypeSwitch(s) => {
                if let Some(init) = &s.init {
                    self.stmt(pkg, init, unit);
                }
                self.expr(pkg, &s.subject, unit);
                for case in &s.cases {
                    for st in &case.body {
                        self.stmt(pkg, st, unit);
                    }
                }
            }
            Stmt::IncDec(s) => self.expr(pkg, &s.x, unit),
            Stmt::Labeled(s) => self.stmt(pkg, &s.stmt, unit),
            Stmt::Branch(_) | Stmt::Empty(_) => {}
        }
    }

    /// Goroutine targets run as independent microtasks; the spawned
    /// callee's async bit never infects the spawning function. Argument
    /// expressions still evaluate inline and are scanned.
    fn go_call(&mut self, pkg: &Package, call: &Expr, unit: usize) {
        if let Expr::Call(call) = call.unparen() {
            if let Expr::FuncLit(lit) = call.fun.unparen() {
                let inner = self.push_unit(UnitKey::Lit(lit.id));
                self.block(pkg, &lit.body, inner);
            }
            for arg in &call.args {
                self.expr(pkg, arg, unit);
            }
        }
    }

    /// Deferred calls release through the scoped disposable stack, and an
    /// asynchronous disposal must be awaited at block exit, so an async
    /// defer target does pull its enclosing function async.
    fn defer_call(&mut self, pkg: &Package, call: &Expr, unit: usize) {
        if let Expr::Call(call) = call.unparen() {
            match call.fun.unparen() {
                Expr::FuncLit(lit) => {
                    let lit_id = lit.id;
                    let inner = self.push_unit(UnitKey::Lit(lit_id));
                    self.block(pkg, &lit.body, inner);
                    self.units[unit].calls.push(UnitKey::Lit(lit_id));
                }
                other => {
                    if let Some(callee) = self.callee_object(pkg, other) {
                        self.units[unit].calls.push(UnitKey::Obj(callee));
                    }
                }
            }
            for arg in &call.args {
                self.expr(pkg, arg, unit);
            }
        }
    }

    fn expr(&mut self, pkg: &Package, expr: &Expr, unit: usize) {
        match expr {
            Expr::Unary(u) => {
                if u.op == UnaryOp::Recv {
                    self.units[unit].direct = true;
                }
                self.expr(pkg, &u.x, unit);
            }
            Expr::Call(c) => {
                if let Some(callee) = self.callee_object(pkg, &c.fun) {
                    self.units[unit].calls.push(UnitKey::Obj(callee));
                }
                self.expr(pkg, &c.fun, unit);
                for arg in &c.args {
                    self.expr(pkg, arg, unit);
                }
            }
            Expr::FuncLit(lit) => {
                let inner = self.push_unit(UnitKey::Lit(lit.id));
                self.block(pkg, &lit.body, inner);
            }
            Expr::Paren(p) => self.expr(pkg, &p.x, unit),
            Expr::Selector(s) => self.expr(pkg, &s.x, unit),
            Expr::Index(i) => {
                self.expr(pkg, &i.x, unit);
                self.expr(pkg, &i.index, unit);
            }
            Expr::Slice(s) => {
                self.expr(pkg, &s.x, unit);
                for part in [&s.low, &s.high, &s.max].into_iter().flatten() {
                    self.expr(pkg, part, unit);
                }
            }
            Expr::TypeAssert(t) => self.expr(pkg, &t.x, unit),
            Expr::Star(s) => self.expr(pkg, &s.x, unit),
            Expr::Binary(b) => {
                self.expr(pkg, &b.x, unit);
                self.expr(pkg, &b.y, unit);
            }
            Expr::KeyValue(kv) => {
                self.expr(pkg, &kv.key, unit);
                self.expr(pkg, &kv.value, unit);
            }
            Expr::CompositeLit(c) => {
                for elt in &c.elts {
                    self.expr(pkg, elt, unit);
                }
            }
            _ => {}
        }
    }

    fn callee_object(&self, pkg: &Package, fun: &Expr) -> Option<ObjectId> {
        match fun.unparen() {
            Expr::Ident(ident) => {
                let obj = pkg.info.uses.get(&ident.id).copied()?;
                self.program.obj(obj)?.is_func().then_some(obj)
            }
            Expr::Selector(sel) => {
                let obj = pkg.info.uses.get(&sel.sel.id).copied()?;
                self.program.obj(obj)?.is_func().then_some(obj)
            }
            _ => None,
        }
    }

    fn is_channel(&self, pkg: &Package, expr: &Expr) -> bool {
        pkg.info
            .type_of(expr.id())
            .is_some_and(|t| matches!(self.program.underlying(t), Type::Chan { .. }))
    }
}
