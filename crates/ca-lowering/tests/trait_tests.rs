//! Trait impl scenarios: default-method inheritance with `Self`
//! bound through the association overlay, ambiguity diagnostics,
//! missing-item diagnostics and fully qualified calls.

use ca_ast::arena::RootTree;
use ca_ast::node::ExprOp;
use ca_ast::pattern::CaPattern;
use ca_backend::interp::Evaluator;
use ca_backend::IrModule;
use ca_common::ids::{NodeId, ScopeId};
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

fn run(build: impl FnOnce(&mut AstBuilder)) -> String {
    let (_, module) = compile(build).expect("compilation succeeds");
    let (_, out) = Evaluator::new(&module).run("main").expect("evaluation succeeds");
    out
}

/// `trait T { fn f(&self)->i32 { 42 } fn g(&self)->i32; }` as nodes.
fn build_trait_t(b: &mut AstBuilder) {
    // fn f(&self) -> i32 { 42 }  (default body)
    b.begin_fn();
    let mut args = b.new_arglist();
    let self_t = b.type_id("*Self");
    let i32_t = b.type_id("i32");
    b.add_fn_arg(&mut args, "self", self_t).unwrap();
    let proto = b.make_fn_proto("f", args, i32_t);
    let v = b.int_lit("42");
    let ret = b.make_stmt_ret_expr(v);
    let body = b.make_stmt_list_zip(vec![ret]);
    let f_def = b.make_fn_def(proto, body);

    // fn g(&self) -> i32;  (required)
    b.begin_fn();
    let mut args = b.new_arglist();
    let self_t = b.type_id("*Self");
    b.add_fn_arg(&mut args, "self", self_t).unwrap();
    let g_proto = b.make_fn_proto("g", args, i32_t);
    let g_proto = b.end_fn_proto(g_proto);

    let t = b.make_trait_defs("T", vec![f_def, g_proto]);
    b.add_top(t);
}

/// `impl T for S { fn g(&self)->i32 { self.f() + 1 } }`
fn build_impl_t_for_s(b: &mut AstBuilder) -> NodeId {
    let info = b.begin_impl_trait_for_type("T", "S");
    b.push_type_impl(info);

    b.begin_fn();
    let mut args = b.new_arglist();
    let self_t = b.self_param_type();
    let i32_t = b.type_id("i32");
    b.add_fn_arg(&mut args, "self", self_t).unwrap();
    let proto = b.make_fn_proto("g", args, i32_t);
    let recv = b.make_ident_expr("self");
    let call_f = b.make_method_call(recv, "f", false, vec![]);
    let one = b.int_lit("1");
    let sum = b.make_expr(ExprOp::Add, vec![call_f, one]);
    let ret = b.make_stmt_ret_expr(sum);
    let body = b.make_stmt_list_zip(vec![ret]);
    let g_def = b.make_fn_def(proto, body);

    b.pop_type_impl();
    b.make_fn_def_impl(info, vec![g_def])
}

/// Scenario: inherited trait default resolves `Self` to the
/// implementing struct; `S{}.g()` prints 43.
#[test]
fn trait_default_method_inherited() {
    let out = run(|b| {
        build_trait_t(b);
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);
        let impl_node = build_impl_t_for_s(b);
        b.add_top(impl_node);

        // print S{}.g();
        let s = b.make_struct_expr("S", vec![]);
        let call = b.make_method_call(s, "g", true, vec![]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    });
    assert_eq!(out, "43\n");
}

/// The inherited default is also reachable fully qualified.
#[test]
fn trait_default_method_qualified_call() {
    let out = run(|b| {
        build_trait_t(b);
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);
        let impl_node = build_impl_t_for_s(b);
        b.add_top(impl_node);

        // let s = S{}; print <S as T>::f(&s);
        let s_expr = b.make_struct_expr("S", vec![]);
        let atom = b.name("s");
        let pat = CaPattern::var(atom, ca_common::sloc::Sloc::new(1, 0));
        let let_s = b.make_let_stmt(pat, s_expr);
        b.add_top(let_s);

        let s_use = b.make_ident_expr("s");
        let addr = b.make_address(s_use);
        let call = b.make_domain_as_call("S", "T", "f", vec![addr]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    });
    assert_eq!(out, "42\n");
}

/// Scenario: a method found in two traits without a constraint is
/// ambiguous, listing each candidate in a note.
#[test]
fn ambiguous_trait_method() {
    let err = compile(|b| {
        // trait T1 { fn m(&self) -> i32; } (and T2 alike)
        for tname in ["T1", "T2"] {
            b.begin_fn();
            let mut args = b.new_arglist();
            let self_t = b.type_id("*Self");
            let i32_t = b.type_id("i32");
            b.add_fn_arg(&mut args, "self", self_t).unwrap();
            let proto = b.make_fn_proto("m", args, i32_t);
            let proto = b.end_fn_proto(proto);
            let t = b.make_trait_defs(tname, vec![proto]);
            b.add_top(t);
        }

        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);

        // impl T1 for S { fn m ... 1 }  impl T2 for S { fn m ... 2 }
        for (tname, retval) in [("T1", "1"), ("T2", "2")] {
            let info = b.begin_impl_trait_for_type(tname, "S");
            b.push_type_impl(info);
            b.begin_fn();
            let mut args = b.new_arglist();
            let self_t = b.self_param_type();
            let i32_t = b.type_id("i32");
            b.add_fn_arg(&mut args, "self", self_t).unwrap();
            let proto = b.make_fn_proto("m", args, i32_t);
            let v = b.int_lit(retval);
            let ret = b.make_stmt_ret_expr(v);
            let body = b.make_stmt_list_zip(vec![ret]);
            let m_def = b.make_fn_def(proto, body);
            b.pop_type_impl();
            let impl_node = b.make_fn_def_impl(info, vec![m_def]);
            b.add_top(impl_node);
        }

        // let s = S{}; s.m();
        let s_expr = b.make_struct_expr("S", vec![]);
        let atom = b.name("s");
        let pat = CaPattern::var(atom, ca_common::sloc::Sloc::new(1, 0));
        let let_s = b.make_let_stmt(pat, s_expr);
        b.add_top(let_s);
        let s_use = b.make_ident_expr("s");
        let call = b.make_method_call(s_use, "m", true, vec![]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    })
    .unwrap_err();

    assert!(err.contains("multiple applicable items in scope"), "{err}");
    assert!(
        err.contains("candidate #1 is defined in an impl of the trait `T1` for the type `S`"),
        "{err}"
    );
    assert!(
        err.contains("candidate #2 is defined in an impl of the trait `T2` for the type `S`"),
        "{err}"
    );
}

/// A qualified call disambiguates what the bare method cannot.
#[test]
fn qualified_call_resolves_ambiguity() {
    let out = run(|b| {
        for tname in ["T1", "T2"] {
            b.begin_fn();
            let mut args = b.new_arglist();
            let self_t = b.type_id("*Self");
            let i32_t = b.type_id("i32");
            b.add_fn_arg(&mut args, "self", self_t).unwrap();
            let proto = b.make_fn_proto("m", args, i32_t);
            let proto = b.end_fn_proto(proto);
            let t = b.make_trait_defs(tname, vec![proto]);
            b.add_top(t);
        }
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);
        for (tname, retval) in [("T1", "1"), ("T2", "2")] {
            let info = b.begin_impl_trait_for_type(tname, "S");
            b.push_type_impl(info);
            b.begin_fn();
            let mut args = b.new_arglist();
            let self_t = b.self_param_type();
            let i32_t = b.type_id("i32");
            b.add_fn_arg(&mut args, "self", self_t).unwrap();
            let proto = b.make_fn_proto("m", args, i32_t);
            let v = b.int_lit(retval);
            let ret = b.make_stmt_ret_expr(v);
            let body = b.make_stmt_list_zip(vec![ret]);
            let m_def = b.make_fn_def(proto, body);
            b.pop_type_impl();
            let impl_node = b.make_fn_def_impl(info, vec![m_def]);
            b.add_top(impl_node);
        }

        let s_expr = b.make_struct_expr("S", vec![]);
        let atom = b.name("s");
        let pat = CaPattern::var(atom, ca_common::sloc::Sloc::new(1, 0));
        let let_s = b.make_let_stmt(pat, s_expr);
        b.add_top(let_s);

        let s_use = b.make_ident_expr("s");
        let addr = b.make_address(s_use);
        let call = b.make_domain_as_call("S", "T2", "m", vec![addr]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    });
    assert_eq!(out, "2\n");
}

/// Missing required trait items fail with the item list.
#[test]
fn missing_trait_item_diagnostic() {
    let err = compile(|b| {
        build_trait_t(b);
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);

        // impl T for S {} - g is required but missing
        let info = b.begin_impl_trait_for_type("T", "S");
        let impl_node = b.make_fn_def_impl(info, vec![]);
        b.add_top(impl_node);
    })
    .unwrap_err();
    assert!(
        err.contains("not all trait items implemented, missing: `g`"),
        "{err}"
    );
}

/// An impl method that is not a trait member is rejected.
#[test]
fn stray_impl_method_diagnostic() {
    let err = compile(|b| {
        build_trait_t(b);
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);

        let info = b.begin_impl_trait_for_type("T", "S");
        b.push_type_impl(info);
        b.begin_fn();
        let mut args = b.new_arglist();
        let self_t = b.self_param_type();
        let i32_t = b.type_id("i32");
        b.add_fn_arg(&mut args, "self", self_t).unwrap();
        let proto = b.make_fn_proto("h", args, i32_t);
        let v = b.int_lit("0");
        let ret = b.make_stmt_ret_expr(v);
        let body = b.make_stmt_list_zip(vec![ret]);
        let h_def = b.make_fn_def(proto, body);
        b.pop_type_impl();
        let impl_node = b.make_fn_def_impl(info, vec![h_def]);
        b.add_top(impl_node);
    })
    .unwrap_err();
    assert!(err.contains("is not a member of trait"), "{err}");
}

/// Struct-inherent methods resolve ahead of trait methods.
#[test]
fn inherent_method_wins() {
    let out = run(|b| {
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);

        // impl S { fn v(&self) -> i32 { 7 } }
        let info = b.begin_impl_type("S");
        b.push_type_impl(info);
        b.begin_fn();
        let mut args = b.new_arglist();
        let self_t = b.self_param_type();
        let i32_t = b.type_id("i32");
        b.add_fn_arg(&mut args, "self", self_t).unwrap();
        let proto = b.make_fn_proto("v", args, i32_t);
        let seven = b.int_lit("7");
        let ret = b.make_stmt_ret_expr(seven);
        let body = b.make_stmt_list_zip(vec![ret]);
        let v_def = b.make_fn_def(proto, body);
        b.pop_type_impl();
        let impl_node = b.make_fn_def_impl(info, vec![v_def]);
        b.add_top(impl_node);

        let s = b.make_struct_expr("S", vec![]);
        let call = b.make_method_call(s, "v", true, vec![]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    });
    assert_eq!(out, "7\n");
}
