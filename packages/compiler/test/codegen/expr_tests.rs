//! Expression emission tests.

use goty_compiler::analysis::{analyze_async, analyze_package, AsyncSeeds};
use goty_compiler::codegen::{emit_file, FileImports};
use goty_compiler::source::{ast, AssignOp, BinaryOp, Expr};
use goty_compiler::testing::Builder;
use goty_compiler::types::{ConstValue, Object, ObjectKind, StructField, Type};
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

fn wrap(mut b: Builder, stmts: Vec<goty_compiler::source::Stmt>) -> Program {
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let body = b.block(stmts);
    let decl = b.func_decl("run", f_obj, sig, body);
    let file = b.file("lib", vec![decl]);
    b.program("lib", "lib.go", vec![file])
}

#[test]
fn and_not_operator_clears_masked_bits() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let x = b.local_var("x", int);
    let y = b.local_var("y", int);
    let r = b.local_var("r", int);

    let x_use = b.use_ident("x", x, int);
    let y_use = b.use_ident("y", y, int);
    let binary = Expr::Binary(ast::BinaryExpr {
        id: b.node(),
        pos: 1,
        x: Box::new(Expr::Ident(x_use)),
        op: BinaryOp::AndNot,
        y: Box::new(Expr::Ident(y_use)),
    });
    let r_def = b.def_ident("r", r, int);
    let stmt = b.define(Expr::Ident(r_def), binary);

    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("let r = (x & ~(y))"), "got:\n{out}");
}

#[test]
fn and_not_assignment_rewrites_with_parens() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let x = b.local_var("x", int);
    let y = b.local_var("y", int);

    let x_use = b.use_ident("x", x, int);
    let y_use = b.use_ident("y", y, int);
    let stmt = b.assign(
        vec![Expr::Ident(x_use)],
        AssignOp::AndNot,
        vec![Expr::Ident(y_use)],
    );
    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("x &= ~(y)"), "got:\n{out}");
}

#[test]
fn and_not_assignment_through_pointer() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let ptr_int = b.pointer_to(int);
    let p = b.local_var("p", ptr_int);
    let y = b.local_var("y", int);

    let p_use = b.use_ident("p", p, ptr_int);
    let star = b.star(Expr::Ident(p_use), int);
    let y_use = b.use_ident("y", y, int);
    let stmt = b.assign(
        vec![star],
        AssignOp::AndNot,
        vec![Expr::Ident(y_use)],
    );
    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("p!.value &= ~(y)"), "got:\n{out}");
}

#[test]
fn array_swap_destructures_with_assertions_and_semicolon() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let slice_int = b.slice_of(int);
    let a = b.local_var("a", slice_int);
    let i = b.local_var("i", int);
    let j = b.local_var("j", int);

    let mut index = |b: &mut Builder, idx| {
        let a_use = b.use_ident("a", a, slice_int);
        let idx_use = b.use_ident(if idx == 0 { "i" } else { "j" }, if idx == 0 { i } else { j }, int);
        let id = b.node();
        b.set_type(id, int);
        Expr::Index(ast::IndexExpr {
            id,
            pos: 1,
            x: Box::new(Expr::Ident(a_use)),
            index: Box::new(Expr::Ident(idx_use)),
        })
    };
    let (l1, l2) = (index(&mut b, 0), index(&mut b, 1));
    let (r1, r2) = (index(&mut b, 1), index(&mut b, 0));
    let stmt = b.assign(vec![l1, l2], AssignOp::Assign, vec![r1, r2]);

    let out = emit(&wrap(b, vec![stmt]));
    assert!(
        out.contains(";[a![i], a![j]] = [a![j], a![i]]"),
        "got:\n{out}"
    );
}

#[test]
fn self_rebinding_type_assertion_goes_through_a_temporary() {
    let mut b = Builder::new(PKG);
    let string = b.string();
    let iface = b.add_type(Type::Interface { methods: vec![] });
    let outer = b.local_var("s", iface);
    let inner = b.local_var("s", string);

    // s := s.(string)
    let outer_use = b.use_ident("s", outer, iface);
    let type_expr = Expr::Ident(b.raw_ident("string"));
    let assert_id = b.node();
    b.set_type(assert_id, string);
    let assert = Expr::TypeAssert(ast::TypeAssertExpr {
        id: assert_id,
        pos: 1,
        x: Box::new(Expr::Ident(outer_use)),
        typ: Box::new(type_expr),
    });
    let inner_def = b.def_ident("s", inner, string);
    let stmt = b.define(Expr::Ident(inner_def), assert);

    let out = emit(&wrap(b, vec![stmt]));
    // The fresh binding takes a deterministic temporary name; the
    // initializer still reads the outer `s`.
    assert!(out.contains("let _tmp_s_"), "got:\n{out}");
    assert!(out.contains("$.mustTypeAssert<string>(s, "), "got:\n{out}");
    assert!(!out.contains("let s = "), "got:\n{out}");
}

#[test]
fn two_value_type_assertion_destructures() {
    let mut b = Builder::new(PKG);
    let string = b.string();
    let bool_t = b.bool();
    let iface = b.add_type(Type::Interface { methods: vec![] });
    let x = b.local_var("x", iface);
    let v = b.local_var("v", string);
    let ok = b.local_var("ok", bool_t);

    let x_use = b.use_ident("x", x, iface);
    let type_expr = Expr::Ident(b.raw_ident("string"));
    let assert_id = b.node();
    let assert = Expr::TypeAssert(ast::TypeAssertExpr {
        id: assert_id,
        pos: 1,
        x: Box::new(Expr::Ident(x_use)),
        typ: Box::new(type_expr),
    });
    let v_def = b.def_ident("v", v, string);
    let ok_def = b.def_ident("ok", ok, bool_t);
    let stmt = b.assign(
        vec![Expr::Ident(v_def), Expr::Ident(ok_def)],
        AssignOp::Define,
        vec![assert],
    );
    let out = emit(&wrap(b, vec![stmt]));
    assert!(
        out.contains("let { value: v, ok: ok } = $.typeAssert<string>(x, "),
        "got:\n{out}"
    );
}

#[test]
fn channel_receive_with_ok_blank_forms() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let c = b.local_var("c", chan_int);

    // _, _ = <-c keeps only the awaited helper call.
    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let blank1 = Expr::Ident(b.raw_ident("_"));
    let blank2 = Expr::Ident(b.raw_ident("_"));
    let stmt = b.assign(vec![blank1, blank2], AssignOp::Assign, vec![recv]);

    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("await $.chanRecvWithOk(c)"), "got:\n{out}");
    assert!(!out.contains("value:"), "got:\n{out}");
}

#[test]
fn map_reads_and_writes_use_the_helpers() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let string = b.string();
    let map_t = b.add_type(Type::Map {
        key: string,
        value: int,
    });
    let m = b.local_var("m", map_t);
    let k = b.local_var("k", string);
    let n = b.local_var("n", int);

    // n := m[k]
    let m_use = b.use_ident("m", m, map_t);
    let k_use = b.use_ident("k", k, string);
    let read_id = b.node();
    b.set_type(read_id, int);
    let read = Expr::Index(ast::IndexExpr {
        id: read_id,
        pos: 1,
        x: Box::new(Expr::Ident(m_use)),
        index: Box::new(Expr::Ident(k_use)),
    });
    let n_def = b.def_ident("n", n, int);
    let s1 = b.define(Expr::Ident(n_def), read);

    // m[k] = 3
    let m_use2 = b.use_ident("m", m, map_t);
    let k_use2 = b.use_ident("k", k, string);
    let write_id = b.node();
    b.set_type(write_id, int);
    let write = Expr::Index(ast::IndexExpr {
        id: write_id,
        pos: 1,
        x: Box::new(Expr::Ident(m_use2)),
        index: Box::new(Expr::Ident(k_use2)),
    });
    let three = b.int_lit(3);
    let s2 = b.assign(vec![write], AssignOp::Assign, vec![three]);

    let out = emit(&wrap(b, vec![s1, s2]));
    assert!(out.contains("let n = $.mapGet(m, k).value"), "got:\n{out}");
    assert!(out.contains("$.mapSet(m, k, 3)"), "got:\n{out}");
}

#[test]
fn nil_is_null_and_reserved_words_are_sanitized() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let ptr_int = b.pointer_to(int);
    let class_var = b.local_var("class", ptr_int);

    let class_use = b.use_ident("class", class_var, ptr_int);
    let nil = Expr::Ident(b.raw_ident("nil"));
    let stmt = b.assign(vec![Expr::Ident(class_use)], AssignOp::Assign, vec![nil]);

    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("class_ = null"), "got:\n{out}");
}

#[test]
fn local_constants_inline_and_imported_stay_qualified() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let local_const = b.add_object(Object {
        name: "size".to_string(),
        pkg: Some(PKG.to_string()),
        typ: int,
        kind: ObjectKind::Const {
            value: ConstValue::Int(16),
        },
    });
    let foreign_const = b.add_object(Object {
        name: "MaxLen".to_string(),
        pkg: Some("other/pkg".to_string()),
        typ: int,
        kind: ObjectKind::Const {
            value: ConstValue::Int(99),
        },
    });
    let pkg_obj = b.add_object(Object {
        name: "other".to_string(),
        pkg: Some(PKG.to_string()),
        typ: int,
        kind: ObjectKind::PkgName {
            imported: "other/pkg".to_string(),
        },
    });
    let a = b.local_var("a", int);
    let c = b.local_var("c", int);

    let a_def = b.def_ident("a", a, int);
    let size_use = b.use_ident("size", local_const, int);
    let s1 = b.define(Expr::Ident(a_def), Expr::Ident(size_use));

    let c_def = b.def_ident("c", c, int);
    let other_use = b.use_ident("other", pkg_obj, int);
    let maxlen_use = b.use_ident("MaxLen", foreign_const, int);
    let sel = Expr::Selector(ast::SelectorExpr {
        id: b.node(),
        pos: 1,
        x: Box::new(Expr::Ident(other_use)),
        sel: maxlen_use,
    });
    let s2 = b.define(Expr::Ident(c_def), sel);

    let out = emit(&wrap(b, vec![s1, s2]));
    assert!(out.contains("let a = 16"), "got:\n{out}");
    assert!(out.contains("let c = other.MaxLen"), "got:\n{out}");
}

#[test]
fn struct_literal_becomes_class_instantiation() {
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
    let p = b.local_var("p", named);

    let type_ident = b.raw_ident("Point");
    b.set_type(type_ident.id, named);
    let one = b.int_lit(1);
    let key = Expr::Ident(b.raw_ident("X"));
    let kv = Expr::KeyValue(ast::KeyValueExpr {
        id: b.node(),
        pos: 1,
        key: Box::new(key),
        value: Box::new(one),
    });
    let lit_id = b.node();
    b.set_type(lit_id, named);
    let lit = Expr::CompositeLit(ast::CompositeLit {
        id: lit_id,
        pos: 1,
        typ: Some(Box::new(Expr::Ident(type_ident))),
        elts: vec![kv],
    });
    let p_def = b.def_ident("p", p, named);
    let stmt = b.define(Expr::Ident(p_def), lit);

    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("let p = new Point({X: 1})"), "got:\n{out}");
}

#[test]
fn pointer_selector_asserts_non_null() {
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
    let ptr_named = b.pointer_to(named);
    let p = b.local_var("p", ptr_named);
    let n = b.local_var("n", int);

    let p_use = b.use_ident("p", p, ptr_named);
    let x_sel = b.raw_ident("X");
    let sel_expr = Expr::Selector(ast::SelectorExpr {
        id: b.node(),
        pos: 1,
        x: Box::new(Expr::Ident(p_use)),
        sel: x_sel,
    });
    let n_def = b.def_ident("n", n, int);
    let stmt = b.define(Expr::Ident(n_def), sel_expr);

    let out = emit(&wrap(b, vec![stmt]));
    assert!(out.contains("let n = p!.X"), "got:\n{out}");
}
