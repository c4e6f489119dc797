//! End-to-end scenarios: programs built through the constructor API,
//! lowered through both passes and executed on the reference backend.

use ca_ast::arena::RootTree;
use ca_ast::node::{ExprOp, IdKind, RangeKind};
use ca_ast::pattern::CaPattern;
use ca_backend::interp::Evaluator;
use ca_backend::IrModule;
use ca_common::ids::ScopeId;
use ca_lowering::{AstBuilder, CompileOptions, CompilerContext};

fn compile(
    build: impl FnOnce(&mut AstBuilder),
) -> Result<(CompilerContext, IrModule), String> {
    let mut ctx = CompilerContext::new(CompileOptions::default());
    let tree = {
        let mut b = AstBuilder::new(&mut ctx);
        build(&mut b);
        std::mem::replace(&mut b.root, RootTree::new(ScopeId::GLOBAL))
    };
    let mut module = IrModule::new();
    ca_lowering::lower(&mut ctx, &mut module, &tree).map_err(|e| e.to_string())?;
    module.verify()?;
    Ok((ctx, module))
}

fn run(build: impl FnOnce(&mut AstBuilder)) -> (i64, String) {
    let (_ctx, module) = compile(build).expect("compilation succeeds");
    let (ret, out) = Evaluator::new(&module).run("main").expect("evaluation succeeds");
    (ret.int_or(i64::MIN), out)
}

fn var_pattern(b: &mut AstBuilder, name: &str, ty: Option<&str>) -> CaPattern {
    let atom = b.name(name);
    let mut p = CaPattern::var(atom, ca_common::sloc::Sloc::new(1, 0));
    if let Some(t) = ty {
        p.datatype = Some(b.type_id(t));
    }
    p
}

/// Scenario: array for-loop sum prints 6.
#[test]
fn array_for_loop_sum() {
    let (_, out) = run(|b| {
        // let a: [i32;3] = [1, 2, 3];
        let e1 = b.int_lit("1");
        let e2 = b.int_lit("2");
        let e3 = b.int_lit("3");
        let arr = b.make_array_def(vec![e1, e2, e3]);
        let pat = var_pattern(b, "a", Some("[i32;3]"));
        let let_a = b.make_let_stmt(pat, arr);
        b.add_top(let_a);

        // let mut s: i32 = 0;
        let zero = b.int_lit("0");
        let pat = var_pattern(b, "s", Some("i32"));
        let let_s = b.make_let_stmt(pat, zero);
        b.add_top(let_s);

        // for v in a { s = s + v; }
        let list = b.make_ident_expr("a");
        let s_use = b.make_ident_expr("s");
        let v_use = b.make_ident_expr("v");
        let sum = b.make_expr(ExprOp::Add, vec![s_use, v_use]);
        let s_lhs = b.make_id("s", IdKind::VarAssign);
        let assign = b.make_assign(s_lhs, sum);
        let body = b.make_stmt_list_zip(vec![assign]);
        let for_stmt = b.make_for_value("v", list, body);
        b.add_top(for_stmt);

        // print s;
        let s_use = b.make_ident_expr("s");
        let print = b.make_stmt_print(s_use);
        b.add_top(print);
    });
    assert_eq!(out, "6\n");
}

/// Scenario: recursive pointer struct, canonical signature, size and
/// zero initialization.
#[test]
fn recursive_pointer_struct_zero_init() {
    let (ctx, module) = compile(|b| {
        // struct A { a: *A, b: i32 }
        let ptr_a = b.type_id("*A");
        let i32_t = b.type_id("i32");
        let def = b
            .make_struct_type("A", &[("a", ptr_a), ("b", i32_t)], false)
            .unwrap();
        b.add_top(def);

        // let x: A = __zero_init__;
        let zero = b.make_vardef_zero_value(ca_ast::node::VarInitKind::Zero);
        let pat = var_pattern(b, "x", Some("A"));
        let let_x = b.make_let_stmt(pat, zero);
        b.add_top(let_x);

        // print x.b;
        let x_use = b.make_ident_expr("x");
        let field = b.field_named("b");
        let access = b.make_structfield_right(x_use, field, true);
        let print = b.make_stmt_print(access);
        b.add_top(print);
    })
    .unwrap();

    // the canonical signature closes the cycle by name
    let mut ctx = ctx;
    let tid = ca_common::names::form_type_id_by_str(&mut ctx.interner, "A");
    let a_ty = ctx
        .types
        .get_by_name(&mut ctx.interner, &ctx.scopes, ScopeId::GLOBAL, tid)
        .unwrap();
    assert_eq!(ctx.sig_text(a_ty), "{A;a:*A,b:i32}");
    assert_eq!(ctx.types.get(a_ty).size, 16);

    let (_, out) = Evaluator::new(&module).run("main").unwrap();
    assert_eq!(out, "0\n");
}

/// Scenario: range slice carries `{&a[1], 3}`.
#[test]
fn range_slice_over_array() {
    let (_, out) = run(|b| {
        // let a: [i32;5] = [10,20,30,40,50];
        let elems: Vec<_> = ["10", "20", "30", "40", "50"]
            .iter()
            .map(|t| b.int_lit(t))
            .collect();
        let arr = b.make_array_def(elems);
        let pat = var_pattern(b, "a", Some("[i32;5]"));
        let let_a = b.make_let_stmt(pat, arr);
        b.add_top(let_a);

        // let s = a[1..4];
        let one = b.int_lit("1");
        let four = b.int_lit("4");
        let range = b.make_general_range(RangeKind::RightExclusive, Some(one), Some(four));
        let a_use = b.make_ident_expr("a");
        let item = b.make_arrayitem_right(a_use, vec![range]);
        let pat = var_pattern(b, "s", None);
        let let_s = b.make_let_stmt(pat, item);
        b.add_top(let_s);

        // print s.len;  print s[0];
        let s_use = b.make_ident_expr("s");
        let len_field = b.field_named("len");
        let len = b.make_structfield_right(s_use, len_field, true);
        let p1 = b.make_stmt_print(len);
        b.add_top(p1);

        let s_use = b.make_ident_expr("s");
        let zero = b.int_lit("0");
        let first = b.make_arrayitem_right(s_use, vec![zero]);
        let p2 = b.make_stmt_print(first);
        b.add_top(p2);
    });
    assert_eq!(out, "3\n20\n");
}

/// Scenario: out-of-range literal fails with the canonical message.
#[test]
fn out_of_range_literal_diagnostic() {
    let err = compile(|b| {
        b.at(7, 4);
        let lit = b.int_lit("200");
        let pat = var_pattern(b, "x", Some("i8"));
        let let_x = b.make_let_stmt(pat, lit);
        b.add_top(let_x);
    })
    .unwrap_err();
    assert!(
        err.contains("bad literal value definition: u64 cannot be i8"),
        "unexpected diagnostic: {err}"
    );
    assert!(err.contains("line: 7"), "missing location: {err}");
}

#[test]
fn while_loop_counts() {
    let (_, out) = run(|b| {
        // let i = 0; while i < 3 { print i; i = i + 1; }
        let zero = b.int_lit("0");
        let pat = var_pattern(b, "i", Some("i32"));
        let let_i = b.make_let_stmt(pat, zero);
        b.add_top(let_i);

        let i_use = b.make_ident_expr("i");
        let three = b.int_lit("3");
        let cond = b.make_expr(ExprOp::Lt, vec![i_use, three]);

        let i_use = b.make_ident_expr("i");
        let print = b.make_stmt_print(i_use);
        let i_use = b.make_ident_expr("i");
        let one = b.int_lit("1");
        let inc = b.make_expr(ExprOp::Add, vec![i_use, one]);
        let i_lhs = b.make_id("i", IdKind::VarAssign);
        let assign = b.make_assign(i_lhs, inc);
        let body = b.make_stmt_list_zip(vec![print, assign]);

        let w = b.make_while(cond, body);
        b.add_top(w);
    });
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn function_definition_and_call() {
    let (ret, out) = run(|b| {
        // fn add2(x: i32, y: i32) -> i32 { return x + y; }
        b.begin_fn();
        let mut args = b.new_arglist();
        let i32_t = b.type_id("i32");
        b.add_fn_arg(&mut args, "x", i32_t).unwrap();
        b.add_fn_arg(&mut args, "y", i32_t).unwrap();
        let proto = b.make_fn_proto("add2", args, i32_t);
        let x_use = b.make_ident_expr("x");
        let y_use = b.make_ident_expr("y");
        let sum = b.make_expr(ExprOp::Add, vec![x_use, y_use]);
        let ret_stmt = b.make_stmt_ret_expr(sum);
        let body = b.make_stmt_list_zip(vec![ret_stmt]);
        let def = b.make_fn_def(proto, body);
        b.add_top(def);

        // print add2(40, 2);
        let a = b.int_lit("40");
        let c = b.int_lit("2");
        let call = b.make_fn_call_or_tuple("add2", vec![a, c]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    });
    assert_eq!(out, "42\n");
    assert_eq!(ret, 0);
}

#[test]
fn compound_assignment() {
    let (_, out) = run(|b| {
        let ten = b.int_lit("10");
        let pat = var_pattern(b, "n", Some("i32"));
        let let_n = b.make_let_stmt(pat, ten);
        b.add_top(let_n);

        // n += 5;
        let five = b.int_lit("5");
        let n_lhs = b.make_id("n", IdKind::VarAssign);
        let assign = b.make_assign_op(n_lhs, ExprOp::Add, five);
        b.add_top(assign);

        let n_use = b.make_ident_expr("n");
        let print = b.make_stmt_print(n_use);
        b.add_top(print);
    });
    assert_eq!(out, "15\n");
}

#[test]
fn box_and_drop_round_trip() {
    let (_, out) = run(|b| {
        // let p = box(33);
        let v = b.int_lit("33");
        let boxed = b.make_boxed_expr(v);
        let pat = var_pattern(b, "p", None);
        let let_p = b.make_let_stmt(pat, boxed);
        b.add_top(let_p);

        // print *p;
        let p_use = b.make_ident_expr("p");
        let deref = b.make_deref(p_use);
        let print = b.make_stmt_print(deref);
        b.add_top(print);

        // drop(p);
        let drop_stmt = b.make_drop("p");
        b.add_top(drop_stmt);
    });
    assert_eq!(out, "33\n");
}

#[test]
fn if_expression_join_slot() {
    let (_, out) = run(|b| {
        // let v = if true { 1 } else { 2 }; print v;
        let cond = b.bool_lit(true);
        let then_v = b.int_lit("1");
        let else_v = b.int_lit("2");
        let ife = b.make_if(true, vec![cond], vec![then_v], Some(else_v));
        let pat = var_pattern(b, "v", Some("i32"));
        let let_v = b.make_let_stmt(pat, ife);
        b.add_top(let_v);

        let v_use = b.make_ident_expr("v");
        let print = b.make_stmt_print(v_use);
        b.add_top(print);
    });
    assert_eq!(out, "1\n");
}

#[test]
fn logical_short_circuit() {
    let (_, out) = run(|b| {
        // print false && true; print true || false;
        let lhs = b.bool_lit(false);
        let rhs = b.bool_lit(true);
        let and = b.make_expr(ExprOp::LogicAnd, vec![lhs, rhs]);
        let p1 = b.make_stmt_print(and);
        b.add_top(p1);

        let lhs = b.bool_lit(true);
        let rhs = b.bool_lit(false);
        let or = b.make_expr(ExprOp::LogicOr, vec![lhs, rhs]);
        let p2 = b.make_stmt_print(or);
        b.add_top(p2);
    });
    assert_eq!(out, "0\n1\n");
}

#[test]
fn as_cast_between_widths() {
    let (_, out) = run(|b| {
        // let x: i64 = 300; print x as i8 is forbidden? no - trunc
        let lit = b.int_lit("300");
        let pat = var_pattern(b, "x", Some("i64"));
        let let_x = b.make_let_stmt(pat, lit);
        b.add_top(let_x);

        let x_use = b.make_ident_expr("x");
        let i32_t = b.type_id("i32");
        let cast = b.make_as(x_use, i32_t);
        let print = b.make_stmt_print(cast);
        b.add_top(print);

        // f64 -> i32 truncates toward zero
        let f = b.float_lit("2.9");
        let pat = var_pattern(b, "y", Some("f64"));
        let let_y = b.make_let_stmt(pat, f);
        b.add_top(let_y);
        let y_use = b.make_ident_expr("y");
        let cast = b.make_as(y_use, i32_t);
        let print = b.make_stmt_print(cast);
        b.add_top(print);
    });
    assert_eq!(out, "300\n2\n");
}

#[test]
fn goto_label_loop() {
    let (_, out) = run(|b| {
        // let i = 0; l1: print i; i = i + 1; if i < 2 { goto l1; }
        let zero = b.int_lit("0");
        let pat = var_pattern(b, "i", Some("i32"));
        let let_i = b.make_let_stmt(pat, zero);
        b.add_top(let_i);

        let label = b.make_label_def("l1");
        b.add_top(label);

        let i_use = b.make_ident_expr("i");
        let print = b.make_stmt_print(i_use);
        b.add_top(print);

        let i_use = b.make_ident_expr("i");
        let one = b.int_lit("1");
        let inc = b.make_expr(ExprOp::Add, vec![i_use, one]);
        let i_lhs = b.make_id("i", IdKind::VarAssign);
        let assign = b.make_assign(i_lhs, inc);
        b.add_top(assign);

        let i_use = b.make_ident_expr("i");
        let two = b.int_lit("2");
        let cond = b.make_expr(ExprOp::Lt, vec![i_use, two]);
        let goto = b.make_goto("l1");
        let body = b.make_stmt_list_zip(vec![goto]);
        let if_stmt = b.make_if(false, vec![cond], vec![body], None);
        b.add_top(if_stmt);
    });
    assert_eq!(out, "0\n1\n");
}

#[test]
fn unresolved_goto_is_fatal() {
    let err = compile(|b| {
        b.at(9, 2);
        let goto = b.make_goto("nowhere");
        b.add_top(goto);
    })
    .unwrap_err();
    assert!(err.contains("label `nowhere` not defined"), "{err}");
}

#[test]
fn dbgprint_aggregates() {
    let (_, out) = run(|b| {
        // struct P { x: i32, y: i32 }  print P { x: 1, y: 2 };
        let i32_t = b.type_id("i32");
        let def = b
            .make_struct_type("P", &[("x", i32_t), ("y", i32_t)], false)
            .unwrap();
        b.add_top(def);

        let one = b.int_lit("1");
        let two = b.int_lit("2");
        let sexpr = b.make_struct_expr("P", vec![("x", one), ("y", two)]);
        let print = b.make_stmt_print(sexpr);
        b.add_top(print);

        // print [7, 8];
        let e1 = b.int_lit("7");
        let e2 = b.int_lit("8");
        let arr = b.make_array_def(vec![e1, e2]);
        let print = b.make_stmt_print(arr);
        b.add_top(print);
    });
    assert_eq!(out, "P { x: 1, y: 2 }\n[7, 8]\n");
}

#[test]
fn dbgprinttype_reports_size_and_signature() {
    let (_, out) = run(|b| {
        let t = b.type_id("[i32;3]");
        let p = b.make_stmt_print_datatype(t);
        b.add_top(p);
    });
    assert_eq!(out, "size = 12, type: [i32;3]\n");
}

#[test]
fn for_over_range() {
    let (_, out) = run(|b| {
        // for v in 1..=3 { print v; }
        let one = b.int_lit("1");
        let three = b.int_lit("3");
        let range = b.make_general_range(RangeKind::Inclusive, Some(one), Some(three));
        let v_use = b.make_ident_expr("v");
        let print = b.make_stmt_print(v_use);
        let body = b.make_stmt_list_zip(vec![print]);
        let f = b.make_for_value("v", range, body);
        b.add_top(f);
    });
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn for_over_full_range_is_rejected() {
    let err = compile(|b| {
        let range = b.make_general_range(RangeKind::Full, None, None);
        let v_use = b.make_ident_expr("v");
        let print = b.make_stmt_print(v_use);
        let body = b.make_stmt_list_zip(vec![print]);
        let f = b.make_for_value("v", range, body);
        b.add_top(f);
    })
    .unwrap_err();
    assert!(err.contains("cannot iterate the full range"), "{err}");
}

#[test]
fn pointer_arithmetic_over_array_elements() {
    let (_, out) = run(|b| {
        // let a: [i32;3] = [5, 6, 7]; let p = &a[0];
        let elems: Vec<_> = ["5", "6", "7"].iter().map(|t| b.int_lit(t)).collect();
        let arr = b.make_array_def(elems);
        let pat = var_pattern(b, "a", Some("[i32;3]"));
        let let_a = b.make_let_stmt(pat, arr);
        b.add_top(let_a);

        let a_use = b.make_ident_expr("a");
        let zero = b.int_lit("0");
        let first = b.make_arrayitem_right(a_use, vec![zero]);
        let addr = b.make_address(first);
        let pat = var_pattern(b, "p", None);
        let let_p = b.make_let_stmt(pat, addr);
        b.add_top(let_p);

        // print *(p + 2);  print *(p + 2 - 1);
        let p_use = b.make_ident_expr("p");
        let two = b.int_lit("2");
        let fwd = b.make_expr(ExprOp::Add, vec![p_use, two]);
        let deref = b.make_deref(fwd);
        let print = b.make_stmt_print(deref);
        b.add_top(print);

        let p_use = b.make_ident_expr("p");
        let two = b.int_lit("2");
        let fwd = b.make_expr(ExprOp::Add, vec![p_use, two]);
        let one = b.int_lit("1");
        let back = b.make_expr(ExprOp::Sub, vec![fwd, one]);
        let deref = b.make_deref(back);
        let print = b.make_stmt_print(deref);
        b.add_top(print);
    });
    assert_eq!(out, "7\n6\n");
}

#[test]
fn cstring_literal_prints_text() {
    let (_, out) = run(|b| {
        let lit = b.create_string_literal("hello ca");
        let node = b.make_literal(lit);
        let print = b.make_stmt_print(node);
        b.add_top(print);
    });
    assert_eq!(out, "hello ca\n");
}
