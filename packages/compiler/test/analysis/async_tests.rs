//! Async-propagation fixed-point tests.

use goty_compiler::analysis::{analyze_async, AsyncSeeds};
use goty_compiler::source::{ast, Expr};
use goty_compiler::testing::Builder;
use goty_compiler::types::{IfaceMethod, Object, ObjectKind, Type};

const PKG: &str = "example/main";

#[test]
fn channel_receive_seeds_and_calls_propagate() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);

    let c = b.local_var("c", chan_int);
    let f_obj = b.func_object("f", sig);
    let g_obj = b.func_object("g", sig);
    let h_obj = b.func_object("h", sig);

    // func f() { <-c }
    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let recv_stmt = b.expr_stmt(recv);
    let f_body = b.block(vec![recv_stmt]);
    let f_decl = b.func_decl("f", f_obj, sig, f_body);

    // func g() { f() }
    let f_use = b.use_ident("f", f_obj, sig);
    let call_f = b.call(Expr::Ident(f_use), vec![]);
    let call_stmt = b.expr_stmt(call_f);
    let g_body = b.block(vec![call_stmt]);
    let g_decl = b.func_decl("g", g_obj, sig, g_body);

    // func h() {}
    let h_body = b.block(vec![]);
    let h_decl = b.func_decl("h", h_obj, sig, h_body);

    let file = b.file("main", vec![f_decl, g_decl, h_decl]);
    let program = b.program("main", "main.go", vec![file]);

    let info = analyze_async(&program, AsyncSeeds::default());
    assert!(info.is_async_func(&program, f_obj), "direct channel op");
    assert!(info.is_async_func(&program, g_obj), "transitive caller");
    assert!(!info.is_async_func(&program, h_obj), "untouched function");
}

#[test]
fn goroutine_spawn_does_not_infect_the_spawner() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);

    let c = b.local_var("c", chan_int);
    let f_obj = b.func_object("f", sig);
    let k_obj = b.func_object("k", sig);

    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let recv_stmt = b.expr_stmt(recv);
    let f_body = b.block(vec![recv_stmt]);
    let f_decl = b.func_decl("f", f_obj, sig, f_body);

    // func k() { go f() }
    let f_use = b.use_ident("f", f_obj, sig);
    let call_f = b.call(Expr::Ident(f_use), vec![]);
    let go_stmt = goty_compiler::source::Stmt::Go(ast::GoStmt {
        id: b.node(),
        pos: b.pos(),
        call: call_f,
    });
    let k_body = b.block(vec![go_stmt]);
    let k_decl = b.func_decl("k", k_obj, sig, k_body);

    let file = b.file("main", vec![f_decl, k_decl]);
    let program = b.program("main", "main.go", vec![file]);

    let info = analyze_async(&program, AsyncSeeds::default());
    assert!(info.is_async_func(&program, f_obj));
    assert!(
        !info.is_async_func(&program, k_obj),
        "a goroutine spawn is not a suspension point for the spawner"
    );
}

#[test]
fn async_defer_target_pulls_the_function_async() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);

    let c = b.local_var("c", chan_int);
    let f_obj = b.func_object("f", sig);
    let d_obj = b.func_object("d", sig);

    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let recv_stmt = b.expr_stmt(recv);
    let f_body = b.block(vec![recv_stmt]);
    let f_decl = b.func_decl("f", f_obj, sig, f_body);

    // func d() { defer f() }
    let f_use = b.use_ident("f", f_obj, sig);
    let call_f = b.call(Expr::Ident(f_use), vec![]);
    let defer_stmt = goty_compiler::source::Stmt::Defer(ast::DeferStmt {
        id: b.node(),
        pos: b.pos(),
        call: call_f,
    });
    let d_body = b.block(vec![defer_stmt]);
    let d_decl = b.func_decl("d", d_obj, sig, d_body);

    let file = b.file("main", vec![f_decl, d_decl]);
    let program = b.program("main", "main.go", vec![file]);

    let info = analyze_async(&program, AsyncSeeds::default());
    assert!(
        info.is_async_func(&program, d_obj),
        "the awaited disposal of an async defer needs an async context"
    );
}

#[test]
fn interface_satisfaction_closes_over_all_implementations() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);
    let c = b.local_var("c", chan_int);

    // type A struct{}; type B struct{}; interface I { M() }
    let struct_a = b.add_type(Type::Struct { fields: vec![] });
    let struct_b = b.add_type(Type::Struct { fields: vec![] });
    let named_a = b.add_type(Type::Named {
        name: "A".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: struct_a,
        methods: vec![],
    });
    let named_b = b.add_type(Type::Named {
        name: "B".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: struct_b,
        methods: vec![],
    });
    let iface = b.add_type(Type::Interface {
        methods: vec![IfaceMethod {
            name: "M".to_string(),
            sig,
        }],
    });
    b.add_type(Type::Named {
        name: "I".to_string(),
        pkg: Some(PKG.to_string()),
        obj: None,
        underlying: iface,
        methods: vec![],
    });

    let m_a = b.method_object("M", sig, named_a);
    let m_b = b.method_object("M", sig, named_b);
    if let Type::Named { methods, .. } = &mut b.types[named_a.0 as usize] {
        methods.push(m_a);
    }
    if let Type::Named { methods, .. } = &mut b.types[named_b.0 as usize] {
        methods.push(m_b);
    }

    // func (A) M() { <-c }   — directly async
    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let recv_stmt = b.expr_stmt(recv);
    let ma_body = b.block(vec![recv_stmt]);
    let ma_name = b.def_ident("M", m_a, sig);
    let recv_obj_a = b.local_var("a", named_a);
    let recv_ident_a = b.def_ident("a", recv_obj_a, named_a);
    let recv_type_a = Expr::Ident(b.use_ident("A", m_a, named_a));
    let ma_typ = b.func_type();
    let ma_decl = ast::Decl::Func(ast::FuncDecl {
        id: b.node(),
        pos: b.pos(),
        doc: None,
        recv: Some(ast::Field {
            id: b.node(),
            pos: b.pos(),
            doc: None,
            names: vec![recv_ident_a],
            typ: recv_type_a,
        }),
        name: ma_name,
        typ: ma_typ,
        body: Some(ma_body),
    });

    // func (B) M() {}        — pulled async by the interface slot
    let mb_body = b.block(vec![]);
    let mb_name = b.def_ident("M", m_b, sig);
    let recv_obj_b = b.local_var("b", named_b);
    let recv_ident_b = b.def_ident("b", recv_obj_b, named_b);
    let recv_type_b = Expr::Ident(b.use_ident("B", m_b, named_b));
    let mb_typ = b.func_type();
    let mb_decl = ast::Decl::Func(ast::FuncDecl {
        id: b.node(),
        pos: b.pos(),
        doc: None,
        recv: Some(ast::Field {
            id: b.node(),
            pos: b.pos(),
            doc: None,
            names: vec![recv_ident_b],
            typ: recv_type_b,
        }),
        name: mb_name,
        typ: mb_typ,
        body: Some(mb_body),
    });

    let file = b.file("main", vec![ma_decl, mb_decl]);
    let program = b.program("main", "main.go", vec![file]);

    let info = analyze_async(&program, AsyncSeeds::default());
    assert!(info.is_async_func(&program, m_a));
    assert!(
        info.is_async_func(&program, m_b),
        "every implementation of the interface slot goes async together"
    );
    assert!(info.is_method_async(PKG, "A", "M"));
    assert!(info.is_method_async(PKG, "B", "M"));
    assert!(!info.is_method_async(PKG, "A", "Other"));
}

#[test]
fn overlay_seeds_mark_external_callees() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);

    let sleep_obj = b.add_object(Object {
        name: "Sleep".to_string(),
        pkg: Some("time".to_string()),
        typ: sig,
        kind: ObjectKind::Func { recv: None },
    });
    let time_pkg = b.add_object(Object {
        name: "time".to_string(),
        pkg: Some(PKG.to_string()),
        typ: sig,
        kind: ObjectKind::PkgName {
            imported: "time".to_string(),
        },
    });
    let f_obj = b.func_object("f", sig);

    // func f() { time.Sleep() }
    let pkg_ident = b.use_ident("time", time_pkg, sig);
    let sel_ident = b.use_ident("Sleep", sleep_obj, sig);
    let sel = Expr::Selector(ast::SelectorExpr {
        id: b.node(),
        pos: b.pos(),
        x: Box::new(Expr::Ident(pkg_ident)),
        sel: sel_ident,
    });
    let call = b.call(sel, vec![]);
    let call_stmt = b.expr_stmt(call);
    let f_body = b.block(vec![call_stmt]);
    let f_decl = b.func_decl("f", f_obj, sig, f_body);

    let file = b.file("main", vec![f_decl]);
    let program = b.program("main", "main.go", vec![file]);

    let mut seeds = AsyncSeeds::default();
    seeds.insert("time", "Sleep", true);

    let info = analyze_async(&program, seeds);
    assert!(info.is_async_func(&program, sleep_obj), "seeded callee");
    assert!(info.is_async_func(&program, f_obj), "caller of seeded callee");
    assert!(info.is_method_async("time", "", "Sleep"));
}
