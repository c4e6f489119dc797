use ca_binder::scope::ScopeArena;
use ca_binder::symbol::CaVariable;
use ca_common::ids::ScopeId;
use ca_common::interner::Interner;
use ca_common::sloc::Sloc;

fn var(it: &mut Interner, name: &str, ty: &str, row: u32) -> (ca_common::interner::Atom, CaVariable) {
    let n = it.insert(name);
    let t = it.insert(&format!("t:{ty}"));
    (n, CaVariable::new(n, Some(t), Sloc::new(row, 0)))
}

#[test]
fn rebinding_stacks_prior_bindings() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    let (name, v1) = var(&mut it, "a", "i32", 1);
    let (_, v2) = var(&mut it, "a", "f64", 2);

    let sym = scopes.insert_shielded_var(ScopeId::GLOBAL, name, v1.loc, v1.clone());
    let sym2 = scopes.insert_shielded_var(ScopeId::GLOBAL, name, v2.loc, v2.clone());
    assert_eq!(sym, sym2);

    let shield = scopes.symbol(sym).shielding().unwrap();
    assert_eq!(shield.current.datatype, v2.datatype);
    assert_eq!(shield.depth(), 1);
}

#[test]
fn rotation_is_a_ring() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    let (name, v1) = var(&mut it, "a", "i32", 1);
    let (_, v2) = var(&mut it, "a", "f64", 2);
    let (_, v3) = var(&mut it, "a", "bool", 3);
    let t1 = v1.datatype;
    let t2 = v2.datatype;
    let t3 = v3.datatype;

    let sym = scopes.insert_shielded_var(ScopeId::GLOBAL, name, v1.loc, v1);
    scopes.insert_shielded_var(ScopeId::GLOBAL, name, v2.loc, v2);
    scopes.insert_shielded_var(ScopeId::GLOBAL, name, v3.loc, v3);

    let shield = scopes.symbol_mut(sym).shielding_mut().unwrap();
    // after building, current is the last binding
    assert_eq!(shield.current.datatype, t3);

    // rotate forward: current becomes the first binding (pass start)
    shield.rotate(false);
    assert_eq!(shield.current.datatype, t1);

    // forward again walks the chain in source order
    shield.rotate(false);
    assert_eq!(shield.current.datatype, t2);

    // back returns to the previous binding (RHS sees the outer `a`)
    shield.rotate(true);
    assert_eq!(shield.current.datatype, t1);

    // a full cycle of forwards restores the starting state
    shield.rotate(false);
    shield.rotate(false);
    assert_eq!(shield.current.datatype, t3);
}

#[test]
fn rotation_on_unshielded_variable_is_a_no_op() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    let (name, v1) = var(&mut it, "solo", "i32", 1);
    let ty = v1.datatype;
    let sym = scopes.insert_shielded_var(ScopeId::GLOBAL, name, v1.loc, v1);
    let shield = scopes.symbol_mut(sym).shielding_mut().unwrap();
    shield.rotate(false);
    assert_eq!(shield.current.datatype, ty);
    shield.rotate(true);
    assert_eq!(shield.current.datatype, ty);
}
