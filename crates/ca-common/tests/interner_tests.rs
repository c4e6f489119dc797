use ca_common::interner::Interner;

#[test]
fn atoms_are_stable_across_many_inserts() {
    let mut interner = Interner::new();
    let first = interner.insert("x0");
    let ids: Vec<_> = (0..1000).map(|i| interner.insert(&format!("x{i}"))).collect();
    assert_eq!(ids[0], first);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(interner.get(*id), format!("x{i}"));
    }
}

#[test]
fn signature_strings_share_the_table_with_identifiers() {
    let mut interner = Interner::new();
    let ident = interner.insert("i32");
    let sig = interner.insert("t:i32");
    assert_ne!(ident, sig);
    assert_eq!(interner.get(sig), "t:i32");
}
