//! Programmatic construction of typed programs.
//!
//! The loader normally receives packages from the export front end; this
//! module builds the same structures in memory, which is how the test
//! suites assemble small typed programs without running the external
//! toolchain.

use std::collections::HashMap;

use crate::loader::{Export, Package, Program, SourceFile};
use crate::source::ast::{self, LitKind};
use crate::source::position::{FileInfo, FileSet};
use crate::source::{AssignOp, Expr, NodeId, Pos, Stmt};
use crate::types::{
    BasicKind, ConstValue, Object, ObjectId, ObjectKind, Type, TypeAndValue, TypeId, TypeInfo,
};

/// Accumulates arenas, type info and synthetic positions for one package.
pub struct Builder {
    pub types: Vec<Type>,
    pub objects: Vec<Object>,
    pub info: TypeInfo,
    pub pkg_path: String,
    basics: HashMap<BasicKind, TypeId>,
    next_node: u32,
}

impl Builder {
    pub fn new(pkg_path: &str) -> Self {
        Builder {
            types: vec![Type::Invalid],
            objects: Vec::new(),
            info: TypeInfo::default(),
            pkg_path: pkg_path.to_string(),
            basics: HashMap::new(),
            next_node: 1,
        }
    }

    pub fn node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    /// Synthetic nodes share one position (line 1 of the synthetic file),
    /// which keeps blank-line reconstruction quiet and temporary names
    /// deterministic across runs.
    pub fn pos(&mut self) -> Pos {
        1
    }

    pub fn add_type(&mut self, t: Type) -> TypeId {
        self.types.push(t);
        TypeId(self.types.len() as u32 - 1)
    }

    pub fn add_object(&mut self, o: Object) -> ObjectId {
        self.objects.push(o);
        ObjectId(self.objects.len() as u32 - 1)
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        if let Some(t) = self.basics.get(&kind) {
            return *t;
        }
        let t = self.add_type(Type::Basic { basic: kind });
        self.basics.insert(kind, t);
        t
    }

    pub fn int(&mut self) -> TypeId {
        self.basic(BasicKind::Int)
    }

    pub fn string(&mut self) -> TypeId {
        self.basic(BasicKind::String)
    }

    pub fn bool(&mut self) -> TypeId {
        self.basic(BasicKind::Bool)
    }

    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Pointer { elem })
    }

    pub fn chan_of(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Chan {
            dir: crate::source::ChanDir::Both,
            elem,
        })
    }

    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        self.add_type(Type::Slice { elem })
    }

    pub fn signature(&mut self, params: Vec<TypeId>, results: Vec<TypeId>) -> TypeId {
        self.add_type(Type::Signature {
            recv: None,
            params,
            results,
            variadic: false,
        })
    }

    pub fn local_var(&mut self, name: &str, typ: TypeId) -> ObjectId {
        self.add_object(Object {
            name: name.to_string(),
            pkg: Some(self.pkg_path.clone()),
            typ,
            kind: ObjectKind::Var {
                param: false,
                field: false,
            },
        })
    }

    pub fn func_object(&mut self, name: &str, sig: TypeId) -> ObjectId {
        self.add_object(Object {
            name: name.to_string(),
            pkg: Some(self.pkg_path.clone()),
            typ: sig,
            kind: ObjectKind::Func { recv: None },
        })
    }

    pub fn method_object(&mut self, name: &str, sig: TypeId, recv: TypeId) -> ObjectId {
        self.add_object(Object {
            name: name.to_string(),
            pkg: Some(self.pkg_path.clone()),
            typ: sig,
            kind: ObjectKind::Func { recv: Some(recv) },
        })
    }

    // --- syntax helpers; every node gets typed as instructed ---

    /// Identifier that defines `obj` (a declaration site).
    pub fn def_ident(&mut self, name: &str, obj: ObjectId, typ: TypeId) -> ast::Ident {
        let ident = self.raw_ident(name);
        self.info.defs.insert(ident.id, obj);
        self.set_type(ident.id, typ);
        ident
    }

    /// Identifier that uses `obj`.
    pub fn use_ident(&mut self, name: &str, obj: ObjectId, typ: TypeId) -> ast::Ident {
        let ident = self.raw_ident(name);
        self.info.uses.insert(ident.id, obj);
        self.set_type(ident.id, typ);
        ident
    }

    /// Unresolved identifier (`nil`, blank, predeclared names).
    pub fn raw_ident(&mut self, name: &str) -> ast::Ident {
        ast::Ident {
            id: self.node(),
            pos: self.pos(),
            name: name.to_string(),
        }
    }

    pub fn set_type(&mut self, node: NodeId, typ: TypeId) {
        self.info.types.insert(node, TypeAndValue { typ, value: None });
    }

    pub fn set_const(&mut self, node: NodeId, typ: TypeId, value: ConstValue) {
        self.info.types.insert(
            node,
            TypeAndValue {
                typ,
                value: Some(value),
            },
        );
    }

    pub fn int_lit(&mut self, value: i64) -> Expr {
        let id = self.node();
        let int = self.int();
        self.set_const(id, int, ConstValue::Int(value));
        Expr::BasicLit(ast::BasicLit {
            id,
            pos: self.pos(),
            kind: LitKind::Int,
            raw: value.to_string(),
        })
    }

    pub fn string_lit(&mut self, value: &str) -> Expr {
        let id = self.node();
        let string = self.string();
        self.set_const(id, string, ConstValue::Str(value.to_string()));
        Expr::BasicLit(ast::BasicLit {
            id,
            pos: self.pos(),
            kind: LitKind::String,
            raw: format!("{value:?}"),
        })
    }

    pub fn addr_of(&mut self, operand: Expr, result: TypeId) -> Expr {
        let id = self.node();
        self.set_type(id, result);
        Expr::Unary(ast::UnaryExpr {
            id,
            pos: self.pos(),
            op: crate::source::UnaryOp::Addr,
            x: Box::new(operand),
        })
    }

    pub fn recv_from(&mut self, chan: Expr, elem: TypeId) -> Expr {
        let id = self.node();
        self.set_type(id, elem);
        Expr::Unary(ast::UnaryExpr {
            id,
            pos: self.pos(),
            op: crate::source::UnaryOp::Recv,
            x: Box::new(chan),
        })
    }

    pub fn star(&mut self, pointer: Expr, elem: TypeId) -> Expr {
        let id = self.node();
        self.set_type(id, elem);
        Expr::Star(ast::StarExpr {
            id,
            pos: self.pos(),
            x: Box::new(pointer),
        })
    }

    pub fn call(&mut self, fun: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(ast::CallExpr {
            id: self.node(),
            pos: self.pos(),
            fun: Box::new(fun),
            args,
            has_ellipsis: false,
        })
    }

    pub fn assign(&mut self, lhs: Vec<Expr>, tok: AssignOp, rhs: Vec<Expr>) -> Stmt {
        Stmt::Assign(ast::AssignStmt {
            id: self.node(),
            pos: self.pos(),
            lhs,
            tok,
            rhs,
        })
    }

    pub fn define(&mut self, lhs: Expr, rhs: Expr) -> Stmt {
        self.assign(vec![lhs], AssignOp::Define, vec![rhs])
    }

    pub fn expr_stmt(&mut self, x: Expr) -> Stmt {
        Stmt::Expr(ast::ExprStmt {
            id: self.node(),
            pos: self.pos(),
            x,
        })
    }

    pub fn send(&mut self, chan: Expr, value: Expr) -> Stmt {
        Stmt::Send(ast::SendStmt {
            id: self.node(),
            pos: self.pos(),
            chan,
            value,
        })
    }

    pub fn block(&mut self, stmts: Vec<Stmt>) -> ast::BlockStmt {
        ast::BlockStmt {
            id: self.node(),
            pos: self.pos(),
            end_pos: self.pos(),
            stmts,
        }
    }

    pub fn func_type(&mut self) -> ast::FuncTypeExpr {
        ast::FuncTypeExpr {
            id: self.node(),
            pos: self.pos(),
            type_params: None,
            params: ast::FieldList::default(),
            results: None,
        }
    }

    /// Function declaration with a pre-registered object.
    pub fn func_decl(
        &mut self,
        name: &str,
        obj: ObjectId,
        sig: TypeId,
        body: ast::BlockStmt,
    ) -> ast::Decl {
        let name = self.def_ident(name, obj, sig);
        let typ = self.func_type();
        ast::Decl::Func(ast::FuncDecl {
            id: self.node(),
            pos: self.pos(),
            doc: None,
            recv: None,
            name,
            typ,
            body: Some(body),
        })
    }

    pub fn file(&mut self, pkg_name: &str, decls: Vec<ast::Decl>) -> ast::File {
        ast::File {
            id: self.node(),
            pos: self.pos(),
            name: pkg_name.to_string(),
            imports: Vec::new(),
            decls,
            comments: Vec::new(),
        }
    }

    /// Assembles the single-package program. The synthetic file covers the
    /// whole position space so line lookups stay valid.
    pub fn program(self, pkg_name: &str, file_name: &str, files: Vec<ast::File>) -> Program {
        let fset = FileSet {
            files: vec![FileInfo {
                name: file_name.to_string(),
                base: 1,
                size: 2,
                lines: vec![0],
            }],
        };
        let package = Package {
            path: self.pkg_path.clone(),
            name: pkg_name.to_string(),
            files: files
                .into_iter()
                .map(|ast| SourceFile {
                    name: file_name.to_string(),
                    ast,
                })
                .collect(),
            imports: Vec::new(),
            info: self.info,
            errors: Vec::new(),
        };
        Program::from_export(Export {
            roots: vec![self.pkg_path],
            packages: vec![package],
            types: self.types,
            objects: self.objects,
            fset,
        })
    }
}
