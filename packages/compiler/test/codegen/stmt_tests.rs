//! Statement emission tests.

use goty_compiler::analysis::{analyze_async, analyze_package, AsyncSeeds};
use goty_compiler::codegen::{emit_file, FileImports};
use goty_compiler::source::{ast, AssignOp, Expr, Stmt};
use goty_compiler::testing::Builder;
use goty_compiler::types::Type;
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

fn one_func_program(b: Builder, body: ast::BlockStmt, f_obj: goty_compiler::types::ObjectId) -> Program {
    let mut b = b;
    let sig = b.signature(vec![], vec![]);
    let decl = b.func_decl("run", f_obj, sig, body);
    let file = b.file("lib", vec![decl]);
    b.program("lib", "lib.go", vec![file])
}

#[test]
fn condition_only_for_becomes_while() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let cond = Expr::Ident(b.raw_ident("true"));
    let loop_body = b.block(vec![]);
    let for_stmt = Stmt::For(ast::ForStmt {
        id: b.node(),
        pos: b.pos(),
        init: None,
        cond: Some(cond),
        post: None,
        body: loop_body,
    });
    let body = b.block(vec![for_stmt]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("while (true) {"), "got:\n{out}");
}

#[test]
fn bare_for_becomes_for_semicolons() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let loop_body = b.block(vec![]);
    let for_stmt = Stmt::For(ast::ForStmt {
        id: b.node(),
        pos: b.pos(),
        init: None,
        cond: None,
        post: None,
        body: loop_body,
    });
    let body = b.block(vec![for_stmt]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("for (;;) {"), "got:\n{out}");
}

#[test]
fn three_clause_for_keeps_all_clauses() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);

    let i = b.local_var("i", int);
    let i_def = b.def_ident("i", i, int);
    let zero = b.int_lit(0);
    let init = b.define(Expr::Ident(i_def), zero);

    let i_use = b.use_ident("i", i, int);
    let ten = b.int_lit(10);
    let cond_id = b.node();
    let cond = Expr::Binary(ast::BinaryExpr {
        id: cond_id,
        pos: b.pos(),
        x: Box::new(Expr::Ident(i_use)),
        op: goty_compiler::source::BinaryOp::Lss,
        y: Box::new(ten),
    });

    let i_use2 = b.use_ident("i", i, int);
    let post = Stmt::IncDec(ast::IncDecStmt {
        id: b.node(),
        pos: b.pos(),
        x: Expr::Ident(i_use2),
        inc: true,
    });

    let loop_body = b.block(vec![]);
    let for_stmt = Stmt::For(ast::ForStmt {
        id: b.node(),
        pos: b.pos(),
        init: Some(Box::new(init)),
        cond: Some(cond),
        post: Some(Box::new(post)),
        body: loop_body,
    });
    let body = b.block(vec![for_stmt]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("for (let i = 0; i < 10; i++) {"), "got:\n{out}");
}

#[test]
fn tagless_switch_switches_on_true_with_breaks() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);

    let case_cond = Expr::Ident(b.raw_ident("true"));
    let case1 = ast::CaseClause {
        id: b.node(),
        pos: b.pos(),
        list: vec![case_cond],
        body: vec![],
    };
    let default = ast::CaseClause {
        id: b.node(),
        pos: b.pos(),
        list: vec![],
        body: vec![],
    };
    let switch = Stmt::Switch(ast::SwitchStmt {
        id: b.node(),
        pos: b.pos(),
        init: None,
        tag: None,
        cases: vec![case1, default],
        end_pos: 1,
    });
    let body = b.block(vec![switch]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("switch (true) {"), "got:\n{out}");
    assert!(out.contains("case true:"), "got:\n{out}");
    assert!(out.contains("default:"), "got:\n{out}");
    assert!(out.contains("break"), "got:\n{out}");
}

#[test]
fn trailing_fallthrough_suppresses_the_break() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);

    let one = b.int_lit(1);
    let two = b.int_lit(2);
    let fall = Stmt::Branch(ast::BranchStmt {
        id: b.node(),
        pos: b.pos(),
        tok: goty_compiler::source::BranchTok::Fallthrough,
        label: None,
    });
    let case1 = ast::CaseClause {
        id: b.node(),
        pos: b.pos(),
        list: vec![one],
        body: vec![fall],
    };
    let case2 = ast::CaseClause {
        id: b.node(),
        pos: b.pos(),
        list: vec![two],
        body: vec![],
    };
    let tag = b.int_lit(1);
    let switch = Stmt::Switch(ast::SwitchStmt {
        id: b.node(),
        pos: b.pos(),
        init: None,
        tag: Some(tag),
        cases: vec![case1, case2],
        end_pos: 1,
    });
    let body = b.block(vec![switch]);
    let out = emit(&one_func_program(b, body, f_obj));

    let case1_idx = out.find("case 1:").unwrap();
    let case2_idx = out.find("case 2:").unwrap();
    let between = &out[case1_idx..case2_idx];
    assert!(
        !between.contains("break"),
        "fallthrough case must not break, got:\n{out}"
    );
}

#[test]
fn channel_send_and_receive_statements_await() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let c = b.local_var("c", chan_int);

    let c_use = b.use_ident("c", c, chan_int);
    let zero = b.int_lit(0);
    let send = b.send(Expr::Ident(c_use), zero);

    let c_use2 = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use2), int);
    let recv_stmt = b.expr_stmt(recv);

    let body = b.block(vec![send, recv_stmt]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("await $.chanSend(c, 0)"), "got:\n{out}");
    assert!(out.contains("await $.chanRecv(c)"), "got:\n{out}");
    assert!(out.contains("export async function run(): Promise<void>"), "got:\n{out}");
}

#[test]
fn select_lowers_to_case_descriptors() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let c = b.local_var("c", chan_int);
    let v = b.local_var("v", int);

    // case v := <-c:
    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let v_def = b.def_ident("v", v, int);
    let comm_recv = b.define(Expr::Ident(v_def), recv);
    let recv_clause = ast::CommClause {
        id: b.node(),
        pos: b.pos(),
        comm: Some(Box::new(comm_recv)),
        body: vec![],
    };

    // case c <- 1:
    let c_use2 = b.use_ident("c", c, chan_int);
    let one = b.int_lit(1);
    let comm_send = b.send(Expr::Ident(c_use2), one);
    let send_clause = ast::CommClause {
        id: b.node(),
        pos: b.pos(),
        comm: Some(Box::new(comm_send)),
        body: vec![],
    };

    // default:
    let default_clause = ast::CommClause {
        id: b.node(),
        pos: b.pos(),
        comm: None,
        body: vec![],
    };

    let select = Stmt::Select(ast::SelectStmt {
        id: b.node(),
        pos: b.pos(),
        cases: vec![recv_clause, send_clause, default_clause],
    });
    let body = b.block(vec![select]);
    let out = emit(&one_func_program(b, body, f_obj));

    assert!(out.contains("await $.chanSelect(["), "got:\n{out}");
    assert!(out.contains("isSend: false,"), "got:\n{out}");
    assert!(out.contains("const v = result.value"), "got:\n{out}");
    assert!(out.contains("isSend: true,"), "got:\n{out}");
    assert!(out.contains("value: 1,"), "got:\n{out}");
    assert!(out.contains("isDefault: true,"), "got:\n{out}");
}

#[test]
fn goroutine_forms() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let chan_int = b.chan_of(int);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let helper_obj = b.func_object("helper", sig);
    let c = b.local_var("c", chan_int);

    // helper performs a receive, so `go helper()` awaits inside the task.
    let c_use = b.use_ident("c", c, chan_int);
    let recv = b.recv_from(Expr::Ident(c_use), int);
    let recv_stmt = b.expr_stmt(recv);
    let helper_body = b.block(vec![recv_stmt]);
    let helper_decl = b.func_decl("helper", helper_obj, sig, helper_body);

    let helper_use = b.use_ident("helper", helper_obj, sig);
    let call = b.call(Expr::Ident(helper_use), vec![]);
    let go_stmt = Stmt::Go(ast::GoStmt {
        id: b.node(),
        pos: b.pos(),
        call,
    });
    let run_body = b.block(vec![go_stmt]);

    let mut b2 = b;
    let run_decl = b2.func_decl("run", f_obj, sig, run_body);
    let file = b2.file("lib", vec![helper_decl, run_decl]);
    let program = b2.program("lib", "lib.go", vec![file]);

    let out = emit(&program);
    assert!(out.contains("queueMicrotask(async () => {"), "got:\n{out}");
    assert!(out.contains("await helper()"), "got:\n{out}");
    // The spawner itself stays synchronous.
    assert!(out.contains("export function run(): void {"), "got:\n{out}");
}

#[test]
fn labeled_declaration_wraps_in_a_block() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);

    let x = b.local_var("x", int);
    let x_def = b.def_ident("x", x, int);
    let one = b.int_lit(1);
    let define = b.define(Expr::Ident(x_def), one);
    let label = b.raw_ident("start");
    let labeled = Stmt::Labeled(ast::LabeledStmt {
        id: b.node(),
        pos: b.pos(),
        label,
        stmt: Box::new(define),
    });
    let body = b.block(vec![labeled]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("start: {"), "got:\n{out}");
    assert!(out.contains("let x = 1"), "got:\n{out}");
}

#[test]
fn goto_is_elided_with_a_comment() {
    let mut b = Builder::new(PKG);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let label = b.raw_ident("done");
    let goto = Stmt::Branch(ast::BranchStmt {
        id: b.node(),
        pos: b.pos(),
        tok: goty_compiler::source::BranchTok::Goto,
        label: Some(label),
    });
    let body = b.block(vec![goto]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(out.contains("goto statement skipped"), "got:\n{out}");
}

#[test]
fn range_over_slice_binds_index_and_element() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let slice_int = b.slice_of(int);
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let xs = b.local_var("xs", slice_int);
    let i = b.local_var("i", int);
    let v = b.local_var("v", int);

    let i_def = b.def_ident("i", i, int);
    let v_def = b.def_ident("v", v, int);
    let xs_use = b.use_ident("xs", xs, slice_int);
    let range = Stmt::Range(ast::RangeStmt {
        id: b.node(),
        pos: b.pos(),
        key: Some(Expr::Ident(i_def)),
        value: Some(Expr::Ident(v_def)),
        tok: Some(AssignOp::Define),
        x: Expr::Ident(xs_use),
        body: {
            let id = b.node();
            ast::BlockStmt {
                id,
                pos: 1,
                end_pos: 1,
                stmts: vec![],
            }
        },
    });
    let body = b.block(vec![range]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(
        out.contains("for (let i = 0; i < $.len(xs); i++) {"),
        "got:\n{out}"
    );
    assert!(out.contains("const v = xs![i]"), "got:\n{out}");
}

#[test]
fn map_entry_increment_round_trips_through_the_helpers() {
    let mut b = Builder::new(PKG);
    let int = b.int();
    let string = b.string();
    let map_t = b.add_type(Type::Map {
        key: string,
        value: int,
    });
    let sig = b.signature(vec![], vec![]);
    let f_obj = b.func_object("run", sig);
    let m = b.local_var("m", map_t);
    let k = b.local_var("k", string);

    let m_use = b.use_ident("m", m, map_t);
    let k_use = b.use_ident("k", k, string);
    let index_id = b.node();
    b.set_type(index_id, int);
    let index = Expr::Index(ast::IndexExpr {
        id: index_id,
        pos: 1,
        x: Box::new(Expr::Ident(m_use)),
        index: Box::new(Expr::Ident(k_use)),
    });
    let incdec = Stmt::IncDec(ast::IncDecStmt {
        id: b.node(),
        pos: b.pos(),
        x: index,
        inc: true,
    });
    let body = b.block(vec![incdec]);
    let out = emit(&one_func_program(b, body, f_obj));
    assert!(
        out.contains("$.mapSet(m, k, $.mapGet(m, k).value + 1)"),
        "got:\n{out}"
    );
}
