//! Reference-cell analysis tests.

use goty_compiler::analysis::{analyze_async, analyze_package, AsyncSeeds};
use goty_compiler::source::{ast, AssignOp, Expr};
use goty_compiler::testing::Builder;
use goty_compiler::types::{ConstValue, Object, ObjectKind};

const PKG: &str = "example/main";

#[test]
fn address_of_local_reifies_it() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let ptr_int = b.pointer_to(int);
    let sig = b.signature(vec![], vec![]);

    let v = b.local_var("v", int);
    let p = b.local_var("p", ptr_int);
    let main_obj = b.func_object("main", sig);

    let v_def = b.def_ident("v", v, int);
    let zero = b.int_lit(0);
    let s1 = b.define(Expr::Ident(v_def), zero);

    let v_use = b.use_ident("v", v, int);
    let addr = b.addr_of(Expr::Ident(v_use), ptr_int);
    let p_def = b.def_ident("p", p, ptr_int);
    let s2 = b.define(Expr::Ident(p_def), addr);

    let p_use = b.use_ident("p", p, ptr_int);
    let star = b.star(Expr::Ident(p_use), int);
    let five = b.int_lit(5);
    let s3 = b.assign(vec![star], AssignOp::Assign, vec![five]);

    let body = b.block(vec![s1, s2, s3]);
    let decl = b.func_decl("main", main_obj, sig, body);
    let file = b.file("main", vec![decl]);
    let program = b.program("main", "main.go", vec![file]);

    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert!(analysis.needs_var_ref(v), "address-taken local must be reified");
    assert!(!analysis.needs_var_ref(p), "the alias pointer itself is not reified");
    assert!(analysis.is_var_ref_alias(p), "p := &v marks p as a cell alias");
}

#[test]
fn mutation_capture_in_closure_reifies_the_binding() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![]);

    let v = b.local_var("v", int);
    let f = b.local_var("f", sig);
    let main_obj = b.func_object("main", sig);

    let v_def = b.def_ident("v", v, int);
    let zero = b.int_lit(0);
    let s1 = b.define(Expr::Ident(v_def), zero);

    // func() { v = 1 }
    let v_use = b.use_ident("v", v, int);
    let one = b.int_lit(1);
    let inner_assign = b.assign(vec![Expr::Ident(v_use)], AssignOp::Assign, vec![one]);
    let lit_body = b.block(vec![inner_assign]);
    let lit_typ = b.func_type();
    let lit = Expr::FuncLit(ast::FuncLit {
        id: b.node(),
        pos: b.pos(),
        typ: lit_typ,
        body: lit_body,
    });

    let f_def = b.def_ident("f", f, sig);
    let s2 = b.define(Expr::Ident(f_def), lit);

    let body = b.block(vec![s1, s2]);
    let decl = b.func_decl("main", main_obj, sig, body);
    let file = b.file("main", vec![decl]);
    let program = b.program("main", "main.go", vec![file]);

    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert!(
        analysis.needs_var_ref(v),
        "a closure mutating an outer local forces the shared cell"
    );
    assert!(!analysis.needs_var_ref(f));
}

#[test]
fn funclit_own_locals_are_not_captures() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![]);
    let main_obj = b.func_object("main", sig);

    // func() { x := 0; x = 1 }
    let x = b.local_var("x", int);
    let x_def = b.def_ident("x", x, int);
    let zero = b.int_lit(0);
    let s1 = b.define(Expr::Ident(x_def), zero);
    let x_use = b.use_ident("x", x, int);
    let one = b.int_lit(1);
    let s2 = b.assign(vec![Expr::Ident(x_use)], AssignOp::Assign, vec![one]);
    let lit_body = b.block(vec![s1, s2]);
    let lit_typ = b.func_type();
    let lit = Expr::FuncLit(ast::FuncLit {
        id: b.node(),
        pos: b.pos(),
        typ: lit_typ,
        body: lit_body,
    });
    let lit_stmt = b.expr_stmt(lit);

    let body = b.block(vec![lit_stmt]);
    let decl = b.func_decl("main", main_obj, sig, body);
    let file = b.file("main", vec![decl]);
    let program = b.program("main", "main.go", vec![file]);

    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert!(
        !analysis.needs_var_ref(x),
        "a literal's own local is not a capture"
    );
}

#[test]
fn constants_are_never_reified() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let ptr_int = b.pointer_to(int);
    let sig = b.signature(vec![], vec![]);
    let main_obj = b.func_object("main", sig);

    let c = b.add_object(Object {
        name: "limit".to_string(),
        pkg: Some(PKG.to_string()),
        typ: int,
        kind: ObjectKind::Const {
            value: ConstValue::Int(8),
        },
    });

    let c_use = b.use_ident("limit", c, int);
    let addr = b.addr_of(Expr::Ident(c_use), ptr_int);
    let stmt = b.expr_stmt(addr);

    let body = b.block(vec![stmt]);
    let decl = b.func_decl("main", main_obj, sig, body);
    let file = b.file("main", vec![decl]);
    let program = b.program("main", "main.go", vec![file]);

    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert!(!analysis.needs_var_ref(c));
}
