//! Defer, shadowing and bare-return analysis tests.

use goty_compiler::analysis::{analyze_async, analyze_package, AsyncSeeds};
use goty_compiler::source::{ast, Expr};
use goty_compiler::testing::Builder;
use goty_compiler::util::deterministic_id;

const PKG: &str = "example/main";

#[test]
fn defer_anywhere_marks_the_function_body() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("f", sig);
    let g_obj = b.func_object("g", sig);

    // func f() { if true { defer g() } }
    let g_use = b.use_ident("g", g_obj, sig);
    let call_g = b.call(Expr::Ident(g_use), vec![]);
    let defer_stmt = goty_compiler::source::Stmt::Defer(ast::DeferStmt {
        id: b.node(),
        pos: b.pos(),
        call: call_g,
    });
    let if_body = b.block(vec![defer_stmt]);
    let cond = Expr::Ident(b.raw_ident("true"));
    let if_stmt = goty_compiler::source::Stmt::If(ast::IfStmt {
        id: b.node(),
        pos: b.pos(),
        init: None,
        cond,
        body: if_body,
        els: None,
    });
    let f_body = b.block(vec![if_stmt]);
    let f_body_id = f_body.id;
    let f_decl = b.func_decl("f", f_obj, sig, f_body);

    let g_body = b.block(vec![]);
    let g_body_id = g_body.id;
    let g_decl = b.func_decl("g", g_obj, sig, g_body);

    let file = b.file("main", vec![f_decl, g_decl]);
    let program = b.program("main", "main.go", vec![file]);
    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert!(analysis.needs_defer_stack(f_body_id));
    assert!(!analysis.needs_defer_stack(g_body_id));
}

#[test]
fn defer_inside_function_literal_stays_inside() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("f", sig);
    let g_obj = b.func_object("g", sig);

    // func f() { _ = func() { defer g() } }
    let g_use = b.use_ident("g", g_obj, sig);
    let call_g = b.call(Expr::Ident(g_use), vec![]);
    let defer_stmt = goty_compiler::source::Stmt::Defer(ast::DeferStmt {
        id: b.node(),
        pos: b.pos(),
        call: call_g,
    });
    let lit_body = b.block(vec![defer_stmt]);
    let lit_body_id = lit_body.id;
    let lit_typ = b.func_type();
    let lit = Expr::FuncLit(ast::FuncLit {
        id: b.node(),
        pos: b.pos(),
        typ: lit_typ,
        body: lit_body,
    });
    let lit_stmt = b.expr_stmt(lit);
    let f_body = b.block(vec![lit_stmt]);
    let f_body_id = f_body.id;
    let f_decl = b.func_decl("f", f_obj, sig, f_body);

    let g_body = b.block(vec![]);
    let g_decl = b.func_decl("g", g_obj, sig, g_body);

    let file = b.file("main", vec![f_decl, g_decl]);
    let program = b.program("main", "main.go", vec![file]);
    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert!(analysis.needs_defer_stack(lit_body_id));
    assert!(
        !analysis.needs_defer_stack(f_body_id),
        "a literal opens its own function scope"
    );
}

#[test]
fn bare_return_records_named_results() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![int]);
    let f_obj = b.func_object("f", sig);

    let ret = goty_compiler::source::Stmt::Return(ast::ReturnStmt {
        id: b.node(),
        pos: b.pos(),
        results: vec![],
    });
    let ret_id = ret.id();
    let body = b.block(vec![ret]);

    // func f() (n int) { return }
    let name = b.def_ident("f", f_obj, sig);
    let n_obj = b.local_var("n", int);
    let n_ident = b.def_ident("n", n_obj, int);
    let int_type_expr = Expr::Ident(b.raw_ident("int"));
    let results = ast::FieldList {
        list: vec![ast::Field {
            id: b.node(),
            pos: b.pos(),
            doc: None,
            names: vec![n_ident],
            typ: int_type_expr,
        }],
    };
    let typ = ast::FuncTypeExpr {
        id: b.node(),
        pos: b.pos(),
        type_params: None,
        params: ast::FieldList::default(),
        results: Some(results),
    };
    let decl = ast::Decl::Func(ast::FuncDecl {
        id: b.node(),
        pos: b.pos(),
        doc: None,
        recv: None,
        name,
        typ,
        body: Some(body),
    });

    let file = b.file("main", vec![decl]);
    let program = b.program("main", "main.go", vec![file]);
    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    assert_eq!(analysis.bare_return_names(ret_id), Some(&["n".to_string()][..]));
}

#[test]
fn short_declaration_shadowing_is_detected() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig_int = b.signature(vec![int], vec![int]);
    let sig = b.signature(vec![], vec![]);
    let main_obj = b.func_object("main", sig);
    let f_obj = b.func_object("f", sig_int);

    let outer = b.local_var("v", int);
    let inner = b.local_var("v", int);

    // v := 0
    let outer_def = b.def_ident("v", outer, int);
    let zero = b.int_lit(0);
    let s1 = b.define(Expr::Ident(outer_def), zero);

    // if v := f(v); ... — the initializer reads the outer v.
    let inner_def = b.def_ident("v", inner, int);
    let outer_use = b.use_ident("v", outer, int);
    let f_use = b.use_ident("f", f_obj, sig_int);
    let call = b.call(Expr::Ident(f_use), vec![Expr::Ident(outer_use)]);
    let init = b.define(Expr::Ident(inner_def), call);
    let init_pos = init.pos();
    let cond = Expr::Ident(b.raw_ident("true"));
    let if_body = b.block(vec![]);
    let if_stmt = ast::IfStmt {
        id: b.node(),
        pos: b.pos(),
        init: Some(Box::new(init)),
        cond,
        body: if_body,
        els: None,
    };
    let if_id = if_stmt.id;
    let s2 = goty_compiler::source::Stmt::If(if_stmt);

    let body = b.block(vec![s1, s2]);
    let decl = b.func_decl("main", main_obj, sig, body);
    let file = b.file("main", vec![decl]);
    let program = b.program("main", "main.go", vec![file]);
    let pkg = program.package(PKG).unwrap();
    let async_info = analyze_async(&program, AsyncSeeds::default());
    let analysis = analyze_package(&program, pkg, &async_info);

    let info = analysis.shadowing(if_id).expect("shadowing must be detected");
    let var = info.entries.get("v").expect("the rebound name is recorded");
    assert_eq!(var.outer, outer);
    let expected = format!("_tmp_v_{}", deterministic_id(&program.fset, PKG, init_pos));
    assert_eq!(var.temp, expected);
}
