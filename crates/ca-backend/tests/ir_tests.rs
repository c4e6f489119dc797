use ca_backend::{Backend, BinOp, IrModule, Linkage};

#[test]
fn verifier_accepts_terminated_blocks() {
    let mut m = IrModule::new();
    let i32t = m.type_int(32);
    let fnty = m.type_func(i32t, &[], false);
    let f = m.declare_func("main", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    let ret = m.append_block(f, "ret");
    m.set_insert_point(entry);
    let a = m.const_int(i32t, 40);
    let b = m.const_int(i32t, 2);
    let sum = m.binop(BinOp::Add, a, b, "sum");
    m.br(ret);
    m.set_insert_point(ret);
    m.ret(Some(sum));
    assert!(m.verify_func(f).is_ok());
    assert!(m.verify().is_ok());
}

#[test]
fn verifier_rejects_unterminated_block() {
    let mut m = IrModule::new();
    let i32t = m.type_int(32);
    let fnty = m.type_func(i32t, &[], false);
    let f = m.declare_func("bad", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    m.set_insert_point(entry);
    let a = m.const_int(i32t, 1);
    let b = m.const_int(i32t, 2);
    m.binop(BinOp::Add, a, b, "sum");
    let err = m.verify_func(f).unwrap_err();
    assert!(err.contains("terminator"), "{err}");
}

#[test]
fn entry_block_allocas_stay_grouped_at_the_top() {
    let mut m = IrModule::new();
    let i32t = m.type_int(32);
    let void = m.type_void();
    let fnty = m.type_func(void, &[], false);
    let f = m.declare_func("g", fnty, Linkage::External, &[]);
    let entry = m.append_block(f, "entry");
    m.set_insert_point(entry);
    let slot1 = m.entry_block_alloca(f, i32t, "a");
    let one = m.const_int(i32t, 1);
    m.store(one, slot1);
    // a later alloca must land before the store, after slot1
    let slot2 = m.entry_block_alloca(f, i32t, "b");
    let two = m.const_int(i32t, 2);
    m.store(two, slot2);
    m.ret(None);
    assert!(m.verify_func(f).is_ok());

    let text = m.to_string();
    let alloca_lines: Vec<usize> = text
        .lines()
        .enumerate()
        .filter(|(_, l)| l.contains("alloca"))
        .map(|(i, _)| i)
        .collect();
    let first_store = text
        .lines()
        .position(|l| l.contains("store"))
        .expect("store rendered");
    assert_eq!(alloca_lines.len(), 2);
    assert!(alloca_lines.iter().all(|&l| l < first_store));
}

#[test]
fn named_structs_are_nominal() {
    let mut m = IrModule::new();
    let a1 = m.type_named_struct("A");
    let a2 = m.type_named_struct("A");
    let b = m.type_named_struct("B");
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
}
