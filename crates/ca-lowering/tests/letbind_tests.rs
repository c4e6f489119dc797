//! Pattern binding: shielding re-binding, tuple/struct/array
//! patterns, ignore forms, morebind aliases and no-init bindings.

use ca_ast::arena::RootTree;
use ca_ast::node::{ExprOp, VarInitKind};
use ca_ast::pattern::{CaPattern, FieldSel, PatternKind};
use ca_backend::interp::Evaluator;
use ca_backend::IrModule;
use ca_common::ids::ScopeId;
use ca_common::sloc::Sloc;
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

fn var(b: &mut AstBuilder, name: &str) -> CaPattern {
    let atom = b.name(name);
    CaPattern::var(atom, Sloc::new(1, 0))
}

fn var_typed(b: &mut AstBuilder, name: &str, ty: &str) -> CaPattern {
    let mut p = var(b, name);
    p.datatype = Some(b.type_id(ty));
    p
}

/// `let a = 1; let a = a + 1;` - the RHS sees the outer binding.
#[test]
fn rebinding_reads_the_previous_binding() {
    let out = run(|b| {
        let one = b.int_lit("1");
        let p = var_typed(b, "a", "i32");
        let l1 = b.make_let_stmt(p, one);
        b.add_top(l1);

        let a_use = b.make_ident_expr("a");
        let one = b.int_lit("1");
        let sum = b.make_expr(ExprOp::Add, vec![a_use, one]);
        let p = var(b, "a");
        let l2 = b.make_let_stmt(p, sum);
        b.add_top(l2);

        let a_use = b.make_ident_expr("a");
        let print = b.make_stmt_print(a_use);
        b.add_top(print);
    });
    assert_eq!(out, "2\n");
}

/// `let a: f64 = 2.5; let a = a;` re-binds across a type change.
#[test]
fn rebinding_carries_the_outer_value() {
    let out = run(|b| {
        let v = b.float_lit("2.5");
        let p = var_typed(b, "a", "f64");
        let l1 = b.make_let_stmt(p, v);
        b.add_top(l1);

        let a_use = b.make_ident_expr("a");
        let p = var(b, "a");
        let l2 = b.make_let_stmt(p, a_use);
        b.add_top(l2);

        let a_use = b.make_ident_expr("a");
        let print = b.make_stmt_print(a_use);
        b.add_top(print);
    });
    assert_eq!(out, "2.500000\n");
}

/// `let (x, y) = (1, 2.5);` general tuple destructuring.
#[test]
fn general_tuple_pattern() {
    let out = run(|b| {
        let one = b.int_lit("1");
        let f = b.float_lit("2.5");
        let tup = b.make_gen_tuple_expr(vec![one, f]);

        let x = var(b, "x");
        let y = var(b, "y");
        let pat = CaPattern::new(
            PatternKind::GenTuple,
            ca_common::interner::Atom::NONE,
            vec![x, y],
            Sloc::new(1, 0),
        );
        let l = b.make_let_stmt(pat, tup);
        b.add_top(l);

        let x_use = b.make_ident_expr("x");
        let p1 = b.make_stmt_print(x_use);
        b.add_top(p1);
        let y_use = b.make_ident_expr("y");
        let p2 = b.make_stmt_print(y_use);
        b.add_top(p2);
    });
    assert_eq!(out, "1\n2.500000\n");
}

/// `let P { x: a, y: c } = P { x: 3, y: 4 };` named-field matching.
#[test]
fn struct_pattern_by_field_name() {
    let out = run(|b| {
        let i32_t = b.type_id("i32");
        let def = b
            .make_struct_type("P", &[("x", i32_t), ("y", i32_t)], false)
            .unwrap();
        b.add_top(def);

        let three = b.int_lit("3");
        let four = b.int_lit("4");
        let sexpr = b.make_struct_expr("P", vec![("x", three), ("y", four)]);

        let mut a = var(b, "a");
        a.fieldname = Some(FieldSel::Named(b.name("x")));
        let mut c = var(b, "c");
        c.fieldname = Some(FieldSel::Named(b.name("y")));
        let p_atom = b.name("P");
        let pat = CaPattern::new(PatternKind::Struct, p_atom, vec![a, c], Sloc::new(1, 0));
        let l = b.make_let_stmt(pat, sexpr);
        b.add_top(l);

        let a_use = b.make_ident_expr("a");
        let p1 = b.make_stmt_print(a_use);
        b.add_top(p1);
        let c_use = b.make_ident_expr("c");
        let p2 = b.make_stmt_print(c_use);
        b.add_top(p2);
    });
    assert_eq!(out, "3\n4\n");
}

/// `let [a, _, c] = [7, 8, 9];` with an ignored element.
#[test]
fn array_pattern_with_ignore_one() {
    let out = run(|b| {
        let e1 = b.int_lit("7");
        let e2 = b.int_lit("8");
        let e3 = b.int_lit("9");
        let arr = b.make_array_def(vec![e1, e2, e3]);

        let a = var(b, "a");
        let ignore = CaPattern::new(PatternKind::IgnoreOne, ca_common::interner::Atom::NONE, vec![], Sloc::new(1, 0));
        let c = var(b, "c");
        let pat = CaPattern::new(
            PatternKind::Array,
            ca_common::interner::Atom::NONE,
            vec![a, ignore, c],
            Sloc::new(1, 0),
        );
        let l = b.make_let_stmt(pat, arr);
        b.add_top(l);

        let a_use = b.make_ident_expr("a");
        let p1 = b.make_stmt_print(a_use);
        b.add_top(p1);
        let c_use = b.make_ident_expr("c");
        let p2 = b.make_stmt_print(c_use);
        b.add_top(p2);
    });
    assert_eq!(out, "7\n9\n");
}

/// `let (first, .., last) = (1, 2, 3, 4);` - `..` absorbs the gap.
#[test]
fn gen_tuple_pattern_with_ignore_range() {
    let out = run(|b| {
        let elems: Vec<_> = ["1", "2", "3", "4"].iter().map(|t| b.int_lit(t)).collect();
        let tup = b.make_gen_tuple_expr(elems);

        let first = var(b, "first");
        let gap = CaPattern::new(
            PatternKind::IgnoreRange,
            ca_common::interner::Atom::NONE,
            vec![],
            Sloc::new(1, 0),
        );
        let last = var(b, "last");
        let pat = CaPattern::new(
            PatternKind::GenTuple,
            ca_common::interner::Atom::NONE,
            vec![first, gap, last],
            Sloc::new(1, 0),
        );
        let l = b.make_let_stmt(pat, tup);
        b.add_top(l);

        let f_use = b.make_ident_expr("first");
        let p1 = b.make_stmt_print(f_use);
        b.add_top(p1);
        let l_use = b.make_ident_expr("last");
        let p2 = b.make_stmt_print(l_use);
        b.add_top(p2);
    });
    assert_eq!(out, "1\n4\n");
}

/// Morebind aliases the same value under several names.
#[test]
fn morebind_aliases() {
    let out = run(|b| {
        let five = b.int_lit("5");
        let mut p = var_typed(b, "a", "i32");
        p.morebind.push(b.name("alias"));
        // morebind names register like ordinary bindings
        let l = b.make_let_stmt(p, five);
        b.add_top(l);

        let alias_use = b.make_ident_expr("alias");
        let print = b.make_stmt_print(alias_use);
        b.add_top(print);
    });
    assert_eq!(out, "5\n");
}

/// Pattern arity mismatches are diagnosed.
#[test]
fn tuple_pattern_arity_mismatch() {
    let err = compile(|b| {
        let one = b.int_lit("1");
        let two = b.int_lit("2");
        let tup = b.make_gen_tuple_expr(vec![one, two]);
        let x = var(b, "x");
        let pat = CaPattern::new(
            PatternKind::GenTuple,
            ca_common::interner::Atom::NONE,
            vec![x],
            Sloc::new(1, 0),
        );
        let l = b.make_let_stmt(pat, tup);
        b.add_top(l);
    })
    .unwrap_err();
    assert!(err.contains("pattern have different fields"), "{err}");
}

/// Unknown struct fields in a pattern are diagnosed.
#[test]
fn struct_pattern_unknown_field() {
    let err = compile(|b| {
        let i32_t = b.type_id("i32");
        let def = b.make_struct_type("P", &[("x", i32_t)], false).unwrap();
        b.add_top(def);

        let three = b.int_lit("3");
        let sexpr = b.make_struct_expr("P", vec![("x", three)]);
        let mut a = var(b, "a");
        a.fieldname = Some(FieldSel::Named(b.name("nope")));
        let p_atom = b.name("P");
        let pat = CaPattern::new(PatternKind::Struct, p_atom, vec![a], Sloc::new(1, 0));
        let l = b.make_let_stmt(pat, sexpr);
        b.add_top(l);
    })
    .unwrap_err();
    assert!(err.contains("cannot find field `nope`"), "{err}");
}

/// `__zero_init__` zero-fills; `__noinit__` leaves memory untouched
/// (observable as a read of uninitialized memory in the evaluator).
#[test]
fn zero_init_vs_noinit() {
    let out = run(|b| {
        let zero = b.make_vardef_zero_value(VarInitKind::Zero);
        let p = var_typed(b, "z", "i64");
        let l = b.make_let_stmt(p, zero);
        b.add_top(l);
        let z_use = b.make_ident_expr("z");
        let print = b.make_stmt_print(z_use);
        b.add_top(print);
    });
    assert_eq!(out, "0\n");

    // reading a __noinit__ slot faults in the evaluator model
    let (_, module) = compile(|b| {
        let noinit = b.make_vardef_zero_value(VarInitKind::NoInit);
        let p = var_typed(b, "u", "i64");
        let l = b.make_let_stmt(p, noinit);
        b.add_top(l);
        let u_use = b.make_ident_expr("u");
        let print = b.make_stmt_print(u_use);
        b.add_top(print);
    })
    .unwrap();
    let err = Evaluator::new(&module).run("main").unwrap_err();
    assert!(err.contains("uninitialized"), "{err}");
}
