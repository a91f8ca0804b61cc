//! Declaration emission tests.

use goty_compiler::analysis::{analyze_async, analyze_package, AsyncSeeds};
use goty_compiler::codegen::{emit_file, FileImports};
use goty_compiler::source::{ast, Expr};
use goty_compiler::testing::Builder;
use goty_compiler::types::{Object, ObjectKind, StructField, Type};
use goty_compiler::Program;

const PKG: &str = "example/lib";

fn emit(program: &Program) -> String {
    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(program, AsyncSeeds::default());
    let analysis = analyze_package(program, pkg, &async_info);
    emit_file(
        program,
        pkg,
        &analysis,
        &async_info,
        &pkg.files[0].ast,
        "lib.go",
        &FileImports::default(),
    )
    .unwrap()
}

fn type_spec(b: &mut Builder, name: &str, obj: goty_compiler::types::ObjectId, named: goty_compiler::types::TypeId, typ: Expr) -> ast::Decl {
    let name_ident = b.def_ident(name, obj, named);
    ast::Decl::Gen(ast::GenDecl {
        id: b.node(),
        pos: 1,
        doc: None,
        tok: goty_compiler::source::DeclTok::Type,
        specs: vec![ast::Spec::Type(ast::TypeSpec {
            id: b.node(),
            pos: 1,
            doc: None,
            name: name_ident,
            alias: false,
            typ,
        })],
    })
}

#[test]
fn struct_becomes_class_with_clone_and_descriptor() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let struct_t = b.add_type(Type::Struct {
        fields: vec![StructField {
            name: "X".to_string(),
            typ: int,
            embedded: false,
            exported: true,
        }],
    });
    let named = b.add_type(Type::Named {
        name: "Point".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: struct_t,
        methods: vec![],
    });
    let type_obj = b.add_object(Object {
        name: "Point".to_string(),
        pkg: Some(PKG.to_string()),
        typ: named,
        kind: ObjectKind::TypeName,
    });

    let x_field_obj = b.add_object(Object {
        name: "X".to_string(),
        pkg: Some(PKG.to_string()),
        typ: int,
        kind: ObjectKind::Var {
            param: false,
            field: true,
        },
    });
    let x_ident = b.def_ident("X", x_field_obj, int);
    let int_type_expr = Expr::Ident(b.raw_ident("int"));
    b.set_type(int_type_expr.id(), int);
    let struct_expr = Expr::StructType(ast::StructTypeExpr {
        id: b.node(),
        pos: 1,
        fields: ast::FieldList {
            list: vec![ast::Field {
                id: b.node(),
                pos: 1,
                doc: None,
                names: vec![x_ident],
                typ: int_type_expr,
            }],
        },
    });

    let decl = type_spec(&mut b, "Point", type_obj, named, struct_expr);
    let file = b.file("lib", vec![decl]);
    let program = b.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(out.contains("export class Point {"), "got:\n{out}");
    assert!(out.contains("public X: number = 0"), "got:\n{out}");
    assert!(out.contains("public clone(): Point {"), "got:\n{out}");
    assert!(
        out.contains("$.registerStructType('example/lib.Point', Point, [])"),
        "got:\n{out}"
    );
}

#[test]
fn methods_live_inside_the_class() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![int]);
    let struct_t = b.add_type(Type::Struct { fields: vec![] });
    let named = b.add_type(Type::Named {
        name: "Counter".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: struct_t,
        methods: vec![],
    });
    let type_obj = b.add_object(Object {
        name: "Counter".to_string(),
        pkg: Some(PKG.to_string()),
        typ: named,
        kind: ObjectKind::TypeName,
    });
    let m_obj = b.method_object("Value", sig, named);
    if let Type::Named { methods, .. } = &mut b.types[named.0 as usize] {
        methods.push(m_obj);
    }

    let struct_expr = Expr::StructType(ast::StructTypeExpr {
        id: b.node(),
        pos: 1,
        fields: ast::FieldList::default(),
    });
    let class_decl = type_spec(&mut b, "Counter", type_obj, named, struct_expr);

    // func (c Counter) Value() int { return 0 } — receiver unused.
    let recv_obj = b.local_var("c", named);
    let recv_ident = b.def_ident("c", recv_obj, named);
    let recv_type = b.use_ident("Counter", type_obj, named);
    let m_name = b.def_ident("Value", m_obj, sig);
    let zero = b.int_lit(0);
    let ret = goty_compiler::source::Stmt::Return(ast::ReturnStmt {
        id: b.node(),
        pos: 1,
        results: vec![zero],
    });
    let m_body = b.block(vec![ret]);
    let int_result = Expr::Ident(b.raw_ident("int"));
    let m_typ = ast::FuncTypeExpr {
        id: b.node(),
        pos: 1,
        type_params: None,
        params: ast::FieldList::default(),
        results: Some(ast::FieldList {
            list: vec![ast::Field {
                id: b.node(),
                pos: 1,
                doc: None,
                names: vec![],
                typ: int_result,
            }],
        }),
    };
    let method_decl = ast::Decl::Func(ast::FuncDecl {
        id: b.node(),
        pos: 1,
        doc: None,
        recv: Some(ast::Field {
            id: b.node(),
            pos: 1,
            doc: None,
            names: vec![recv_ident],
            typ: Expr::Ident(recv_type),
        }),
        name: m_name,
        typ: m_typ,
        body: Some(m_body),
    });

    let file = b.file("lib", vec![class_decl, method_decl]);
    let program = b.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(out.contains("public Value(): number {"), "got:\n{out}");
    assert!(
        !out.contains("const c = this"),
        "unused receiver binding must be elided, got:\n{out}"
    );
    assert!(
        out.contains("$.registerStructType('example/lib.Counter', Counter, ['Value'])"),
        "got:\n{out}"
    );
    // The method declaration itself is not re-emitted at top level.
    assert!(!out.contains("export function Value"), "got:\n{out}");
}

#[test]
fn interface_emits_alias_and_descriptor() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![int]);
    let iface_t = b.add_type(Type::Interface {
        methods: vec![goty_compiler::types::IfaceMethod {
            name: "Len".to_string(),
            sig,
        }],
    });
    let named = b.add_type(Type::Named {
        name: "Sized".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: iface_t,
        methods: vec![],
    });
    let type_obj = b.add_object(Object {
        name: "Sized".to_string(),
        pkg: Some(PKG.to_string()),
        typ: named,
        kind: ObjectKind::TypeName,
    });

    let len_name = b.raw_ident("Len");
    let int_result = Expr::Ident(b.raw_ident("int"));
    let len_sig = ast::FuncTypeExpr {
        id: b.node(),
        pos: 1,
        type_params: None,
        params: ast::FieldList::default(),
        results: Some(ast::FieldList {
            list: vec![ast::Field {
                id: b.node(),
                pos: 1,
                doc: None,
                names: vec![],
                typ: int_result,
            }],
        }),
    };
    let iface_expr = Expr::InterfaceType(ast::InterfaceTypeExpr {
        id: b.node(),
        pos: 1,
        methods: ast::FieldList {
            list: vec![ast::Field {
                id: b.node(),
                pos: 1,
                doc: None,
                names: vec![len_name],
                typ: Expr::FuncType(len_sig),
            }],
        },
    });

    let decl = type_spec(&mut b, "Sized", type_obj, named, iface_expr);
    let file = b.file("lib", vec![decl]);
    let program = b.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(
        out.contains("export type Sized = { Len(): number } | null"),
        "got:\n{out}"
    );
    assert!(
        out.contains("$.registerInterfaceType('example/lib.Sized', ['Len'])"),
        "got:\n{out}"
    );
}

#[test]
fn named_primitive_becomes_a_wrapper_class() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let named = b.add_type(Type::Named {
        name: "Meters".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: int,
        methods: vec![],
    });
    let type_obj = b.add_object(Object {
        name: "Meters".to_string(),
        pkg: Some(PKG.to_string()),
        typ: named,
        kind: ObjectKind::TypeName,
    });

    let int_expr = Expr::Ident(b.raw_ident("int"));
    let underlying_id = int_expr.id();
    b.set_type(underlying_id, int);
    let decl = type_spec(&mut b, "Meters", type_obj, named, int_expr);
    let file = b.file("lib", vec![decl]);
    let program = b.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(out.contains("export class Meters {"), "got:\n{out}");
    assert!(
        out.contains("constructor(public _value: number) {}"),
        "got:\n{out}"
    );
    assert!(
        out.contains("valueOf(): number { return this._value }"),
        "got:\n{out}"
    );
}

#[test]
fn consts_and_vars_emit_literals_and_zero_values() {
    let mut b = Builder::new(PKG);
    let int = b.int();

    let max_obj = b.add_object(Object {
        name: "MaxSize".to_string(),
        pkg: Some(PKG.to_string()),
        typ: int,
        kind: ObjectKind::Const {
            value: goty_compiler::types::ConstValue::Int(8),
        },
    });
    let count_obj = b.local_var("count", int);

    let max_ident = b.def_ident("MaxSize", max_obj, int);
    let const_decl = ast::Decl::Gen(ast::GenDecl {
        id: b.node(),
        pos: 1,
        doc: None,
        tok: goty_compiler::source::DeclTok::Const,
        specs: vec![ast::Spec::Value(ast::ValueSpec {
            id: b.node(),
            pos: 1,
            doc: None,
            names: vec![max_ident],
            typ: None,
            values: vec![],
        })],
    });

    let count_ident = b.def_ident("count", count_obj, int);
    let int_type_expr = Expr::Ident(b.raw_ident("int"));
    b.set_type(int_type_expr.id(), int);
    let var_decl = ast::Decl::Gen(ast::GenDecl {
        id: b.node(),
        pos: 1,
        doc: None,
        tok: goty_compiler::source::DeclTok::Var,
        specs: vec![ast::Spec::Value(ast::ValueSpec {
            id: b.node(),
            pos: 1,
            doc: None,
            names: vec![count_ident],
            typ: Some(int_type_expr),
            values: vec![],
        })],
    });

    let file = b.file("lib", vec![const_decl, var_decl]);
    let program = b.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(out.contains("export const MaxSize = 8"), "got:\n{out}");
    assert!(out.contains("export let count: number = 0"), "got:\n{out}");
}

#[test]
fn named_returns_declare_zero_initialized_locals() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![int]);
    let f_obj = b.func_object("size", sig);

    let name = b.def_ident("size", f_obj, sig);
    let n_obj = b.local_var("n", int);
    let n_ident = b.def_ident("n", n_obj, int);
    let int_type_expr = Expr::Ident(b.raw_ident("int"));
    b.set_type(int_type_expr.id(), int);
    let ret = goty_compiler::source::Stmt::Return(ast::ReturnStmt {
        id: b.node(),
        pos: 1,
        results: vec![],
    });
    let body = b.block(vec![ret]);
    let typ = ast::FuncTypeExpr {
        id: b.node(),
        pos: 1,
        type_params: None,
        params: ast::FieldList::default(),
        results: Some(ast::FieldList {
            list: vec![ast::Field {
                id: b.node(),
                pos: 1,
                doc: None,
                names: vec![n_ident],
                typ: int_type_expr,
            }],
        }),
    };
    let decl = ast::Decl::Func(ast::FuncDecl {
        id: b.node(),
        pos: 1,
        doc: None,
        recv: None,
        name,
        typ,
        body: Some(body),
    });

    let file = b.file("lib", vec![decl]);
    let program = b.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(out.contains("let n: number = 0"), "got:\n{out}");
    assert!(out.contains("return n"), "got:\n{out}");
}
