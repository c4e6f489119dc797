use ca_backend::interp::Evaluator;
use ca_backend::{Backend, BinOp, ICmpKind, IrModule, Linkage};

/// Build `main` that sums 0..n with a loop and printfs the result.
fn build_loop_sum(n: i64) -> IrModule {
    let mut m = IrModule::new();
    let i32t = m.type_int(32);
    let i8t = m.type_int(8);
    let i8p = m.type_ptr(i8t);
    let printf_ty = m.type_func(i32t, &[i8p], true);
    let printf = m.declare_func("printf", printf_ty, Linkage::External, &["fmt"]);

    let fnty = m.type_func(i32t, &[], false);
    let f = m.declare_func("main", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    let cond = m.append_block(f, "cond");
    let body = m.append_block(f, "body");
    let done = m.append_block(f, "done");

    m.set_insert_point(entry);
    let sum_slot = m.entry_block_alloca(f, i32t, "sum");
    let i_slot = m.entry_block_alloca(f, i32t, "i");
    let zero = m.const_int(i32t, 0);
    m.store(zero, sum_slot);
    m.store(zero, i_slot);
    m.br(cond);

    m.set_insert_point(cond);
    let i = m.load(i32t, i_slot, "iv");
    let nn = m.const_int(i32t, n);
    let lt = m.icmp(ICmpKind::Slt, i, nn, "lt");
    m.cond_br(lt, body, done);

    m.set_insert_point(body);
    let s = m.load(i32t, sum_slot, "sv");
    let s2 = m.binop(BinOp::Add, s, i, "s2");
    m.store(s2, sum_slot);
    let one = m.const_int(i32t, 1);
    let i2 = m.binop(BinOp::Add, i, one, "i2");
    m.store(i2, i_slot);
    m.br(cond);

    m.set_insert_point(done);
    let fin = m.load(i32t, sum_slot, "fin");
    let fmt = m.const_global_string(b"%d\n");
    m.call(printf, &[fmt, fin], "p");
    m.ret(Some(fin));
    m
}

#[test]
fn loop_sum_runs() {
    let m = build_loop_sum(5);
    m.verify().unwrap();
    let (ret, out) = Evaluator::new(&m).run("main").unwrap();
    assert_eq!(ret.int_or(-1), 10);
    assert_eq!(out, "10\n");
}

#[test]
fn aggregates_and_gep() {
    let mut m = IrModule::new();
    let i32t = m.type_int(32);
    let arr = m.type_array(i32t, 3);
    let fnty = m.type_func(i32t, &[], false);
    let f = m.declare_func("main", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    m.set_insert_point(entry);
    let slot = m.entry_block_alloca(f, arr, "a");
    let zero = m.const_int(i32t, 0);
    for (i, v) in [7i64, 8, 9].into_iter().enumerate() {
        let idx = m.const_int(i32t, i as i64);
        let ptr = m.gep(arr, slot, &[zero, idx], "ep");
        let cv = m.const_int(i32t, v);
        m.store(cv, ptr);
    }
    let two = m.const_int(i32t, 2);
    let ptr = m.gep(arr, slot, &[zero, two], "last");
    let v = m.load(i32t, ptr, "lv");
    m.ret(Some(v));

    m.verify().unwrap();
    let (ret, _) = Evaluator::new(&m).run("main").unwrap();
    assert_eq!(ret.int_or(-1), 9);
}

#[test]
fn heap_alloc_round_trip() {
    let mut m = IrModule::new();
    let i64t = m.type_int(64);
    let i8t = m.type_int(8);
    let i8p = m.type_ptr(i8t);
    let malloc_ty = m.type_func(i8p, &[i64t], false);
    let free_ty = m.type_void();
    let free_fnty = m.type_func(free_ty, &[i8p], false);
    let malloc = m.declare_func("GC_malloc", malloc_ty, Linkage::External, &["size"]);
    let gc_free = m.declare_func("GC_free", free_fnty, Linkage::External, &["ptr"]);

    let i32t = m.type_int(32);
    let fnty = m.type_func(i32t, &[], false);
    let f = m.declare_func("main", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    m.set_insert_point(entry);
    let size = m.const_int(i64t, 4);
    let raw = m.call(malloc, &[size], "raw");
    let c = m.const_int(i32t, 123);
    m.store(c, raw);
    let v = m.load(i32t, raw, "v");
    m.call(gc_free, &[raw], "");
    m.ret(Some(v));

    m.verify().unwrap();
    let (ret, _) = Evaluator::new(&m).run("main").unwrap();
    assert_eq!(ret.int_or(-1), 123);
}

#[test]
fn printf_formats() {
    let mut m = IrModule::new();
    let i32t = m.type_int(32);
    let f64t = m.type_float(64);
    let i8t = m.type_int(8);
    let i8p = m.type_ptr(i8t);
    let printf_ty = m.type_func(i32t, &[i8p], true);
    let printf = m.declare_func("printf", printf_ty, Linkage::External, &["fmt"]);
    let fnty = m.type_func(i32t, &[], false);
    let f = m.declare_func("main", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    m.set_insert_point(entry);
    let fmt = m.const_global_string(b"%d %lu %c %lf %s");
    let a = m.const_int(i32t, -5);
    let i64t = m.type_int(64);
    let b = m.const_int(i64t, 7);
    let c = m.const_int(i8t, 65);
    let d = m.const_float(f64t, 1.5);
    let s = m.const_global_string(b"hi");
    m.call(printf, &[fmt, a, b, c, d, s], "p");
    let zero = m.const_int(i32t, 0);
    m.ret(Some(zero));

    let (_, out) = Evaluator::new(&m).run("main").unwrap();
    assert_eq!(out, "-5 7 A 1.500000 hi");
}
