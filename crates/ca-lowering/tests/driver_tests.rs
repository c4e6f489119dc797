//! Two-pass driver invariants: prototype registration, terminator
//! discipline, nested-function mangling, options and globals.

use ca_ast::arena::RootTree;
use ca_ast::node::ExprOp;
use ca_ast::pattern::CaPattern;
use ca_backend::interp::Evaluator;
use ca_backend::{Backend, IrModule};
use ca_common::ids::ScopeId;
use ca_common::sloc::Sloc;
use ca_lowering::{AstBuilder, CompileOptions, CompilerContext};

fn compile_with(
    options: CompileOptions,
    build: impl FnOnce(&mut AstBuilder),
) -> Result<(CompilerContext, IrModule), String> {
    let mut ctx = CompilerContext::new(options);
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

fn compile(build: impl FnOnce(&mut AstBuilder)) -> Result<(CompilerContext, IrModule), String> {
    compile_with(CompileOptions::default(), build)
}

fn define_const_fn(b: &mut AstBuilder, name: &str, value: &str) {
    b.begin_fn();
    let args = b.new_arglist();
    let i32_t = b.type_id("i32");
    let proto = b.make_fn_proto(name, args, i32_t);
    let v = b.int_lit(value);
    let ret = b.make_stmt_ret_expr(v);
    let body = b.make_stmt_list_zip(vec![ret]);
    let def = b.make_fn_def(proto, body);
    b.add_top(def);
}

/// Pass 1 registers every prototype; calls in pass 2 find them even
/// when the call site precedes the definition.
#[test]
fn forward_call_resolves_through_pass1() {
    let (_, module) = compile(|b| {
        // print later(); comes before fn later is defined
        let call = b.make_fn_call_or_tuple("later", vec![]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
        define_const_fn(b, "later", "11");
    })
    .unwrap();
    let (_, out) = Evaluator::new(&module).run("main").unwrap();
    assert_eq!(out, "11\n");
}

/// Every defined function ends in a branch to its return block, and
/// the return block carries the single ret.
#[test]
fn terminator_discipline() {
    let (_, module) = compile(|b| {
        define_const_fn(b, "f", "1");
        define_const_fn(b, "g", "2");
    })
    .unwrap();
    // the structural verifier enforces single trailing terminators
    module.verify().unwrap();
    let text = module.to_string();
    let rets = text.matches("\n  ret ").count();
    // f, g and the synthesized main each retire through one ret
    assert_eq!(rets, 3, "{text}");
}

/// Nested functions mangle with the `_CA$` scheme and stay callable.
#[test]
fn nested_function_mangling() {
    let (_, module) = compile(|b| {
        // fn outer() -> i32 { fn inner() -> i32 { 5 } return inner(); }
        b.begin_fn();
        let args = b.new_arglist();
        let i32_t = b.type_id("i32");
        let proto = b.make_fn_proto("outer", args, i32_t);

        b.begin_fn();
        let inner_args = b.new_arglist();
        let inner_proto = b.make_fn_proto("inner", inner_args, i32_t);
        let five = b.int_lit("5");
        let inner_ret = b.make_stmt_ret_expr(five);
        let inner_body = b.make_stmt_list_zip(vec![inner_ret]);
        let inner_def = b.make_fn_def(inner_proto, inner_body);

        let call = b.make_fn_call_or_tuple("inner", vec![]);
        let ret = b.make_stmt_ret_expr(call);
        let body = b.make_stmt_list_zip(vec![inner_def, ret]);
        let def = b.make_fn_def(proto, body);
        b.add_top(def);

        let call = b.make_fn_call_or_tuple("outer", vec![]);
        let print = b.make_stmt_print(call);
        b.add_top(print);
    })
    .unwrap();

    let text = module.to_string();
    assert!(text.contains("@_CA$"), "inner function not mangled: {text}");
    assert!(text.contains("5inner"), "mangled name lacks the length-name form: {text}");
    let (_, out) = Evaluator::new(&module).run("main").unwrap();
    assert_eq!(out, "5\n");
}

/// Struct methods mangle with `SF`, trait-for-struct methods with
/// `TSF`.
#[test]
fn method_mangling_prefixes() {
    let (_, module) = compile(|b| {
        let def = b.make_struct_type("S", &[], false).unwrap();
        b.add_top(def);

        let info = b.begin_impl_type("S");
        b.push_type_impl(info);
        b.begin_fn();
        let mut args = b.new_arglist();
        let self_t = b.self_param_type();
        let i32_t = b.type_id("i32");
        b.add_fn_arg(&mut args, "self", self_t).unwrap();
        let proto = b.make_fn_proto("m", args, i32_t);
        let one = b.int_lit("1");
        let ret = b.make_stmt_ret_expr(one);
        let body = b.make_stmt_list_zip(vec![ret]);
        let def = b.make_fn_def(proto, body);
        b.pop_type_impl();
        let impl_node = b.make_fn_def_impl(info, vec![def]);
        b.add_top(impl_node);
    })
    .unwrap();

    let text = module.to_string();
    assert!(text.contains("@_CA$SF1S1m"), "struct method mangling: {text}");
}

/// Redeclarations under one mangled id must agree on the signature.
#[test]
fn redeclaration_mismatch_is_rejected() {
    let err = compile(|b| {
        // fn f(x: i32) -> i32; then fn f(x: i64) -> i32 { ... }
        b.begin_fn();
        let mut args = b.new_arglist();
        let i32_t = b.type_id("i32");
        b.add_fn_arg(&mut args, "x", i32_t).unwrap();
        let proto = b.make_fn_proto("f", args, i32_t);
        let decl = b.make_fn_decl(proto);
        b.add_top(decl);

        b.begin_fn();
        let mut args = b.new_arglist();
        let i64_t = b.type_id("i64");
        b.add_fn_arg(&mut args, "x", i64_t).unwrap();
        let proto = b.make_fn_proto("f", args, i32_t);
        let zero = b.int_lit("0");
        let ret = b.make_stmt_ret_expr(zero);
        let body = b.make_stmt_list_zip(vec![ret]);
        let def = b.make_fn_def(proto, body);
        b.add_top(def);
    })
    .unwrap_err();
    assert!(err.contains("not identical"), "{err}");
}

/// `no_main` suppresses the synthesized entry.
#[test]
fn no_main_library_compilation() {
    let mut options = CompileOptions::default();
    options.no_main = true;
    let (_, module) = compile_with(options, |b| {
        define_const_fn(b, "exported", "3");
    })
    .unwrap();
    assert!(module.get_func("main").is_none());
    assert!(module.get_func("exported").is_some());
}

/// Top-level bindings become backend globals.
#[test]
fn global_variable_binding() {
    let (_, module) = compile(|b| {
        let lit = b.int_lit("9");
        let atom = b.name("g");
        let mut pat = CaPattern::var(atom, Sloc::new(1, 0));
        pat.datatype = Some(b.type_id("i32"));
        let l = b.make_global_vardef(pat, lit);
        b.add_top(l);

        let g_use = b.make_ident_expr("g");
        let print = b.make_stmt_print(g_use);
        b.add_top(print);
    })
    .unwrap();
    let text = module.to_string();
    assert!(text.contains("@g = global"), "{text}");
    let (_, out) = Evaluator::new(&module).run("main").unwrap();
    assert_eq!(out, "9\n");
}

#[test]
fn runtime_libpath_env_override() {
    // the env var is read once at construction
    unsafe { std::env::set_var("CA_RUNTIME_LIBPATH", "/tmp/ca-rt") };
    let options = CompileOptions::from_env();
    assert_eq!(options.runtime_libpath, "/tmp/ca-rt");
    unsafe { std::env::remove_var("CA_RUNTIME_LIBPATH") };
    let options = CompileOptions::from_env();
    assert_eq!(options.runtime_libpath, "cruntime");
}

/// Runtime symbols (`printf`, `GC_malloc`, `GC_free`) are declared
/// lazily on first use only.
#[test]
fn runtime_symbols_declared_lazily() {
    let (_, module) = compile(|b| {
        define_const_fn(b, "f", "1");
    })
    .unwrap();
    assert!(module.get_func("printf").is_none());
    assert!(module.get_func("GC_malloc").is_none());

    let (_, module) = compile(|b| {
        let v = b.int_lit("1");
        let boxed = b.make_boxed_expr(v);
        let atom = b.name("p");
        let pat = CaPattern::var(atom, Sloc::new(1, 0));
        let l = b.make_let_stmt(pat, boxed);
        b.add_top(l);
        let d = b.make_drop("p");
        b.add_top(d);
    })
    .unwrap();
    assert!(module.get_func("GC_malloc").is_some());
    assert!(module.get_func("GC_free").is_some());
}

/// `sizeof` and `typeof` are compile-time type formers.
#[test]
fn sizeof_and_typeof() {
    let (_, module) = compile(|b| {
        let t = b.type_id("[i64;4]");
        let sz = b.make_sizeof(t);
        let print = b.make_stmt_print(sz);
        b.add_top(print);

        // let a = 1; let c: typeof(a) = 2; print c;
        let one = b.int_lit("1");
        let atom = b.name("a");
        let pat = CaPattern::var(atom, Sloc::new(1, 0));
        let l = b.make_let_stmt(pat, one);
        b.add_top(l);

        let a_use = b.make_ident_expr("a");
        let typeof_a = b.make_typeof(a_use);
        let two = b.int_lit("2");
        let atom = b.name("c");
        let mut pat = CaPattern::var(atom, Sloc::new(1, 0));
        pat.datatype = Some(typeof_a);
        let l = b.make_let_stmt(pat, two);
        b.add_top(l);

        let c_use = b.make_ident_expr("c");
        let print = b.make_stmt_print(c_use);
        b.add_top(print);
    })
    .unwrap();
    let (_, out) = Evaluator::new(&module).run("main").unwrap();
    assert_eq!(out, "32\n2\n");
}
