use ca_binder::runables::{MethodImpl, MethodLookup, Runables};
use ca_common::ids::SymbolId;
use ca_common::interner::Interner;

fn mk(it: &mut Interner, name: &str, mangled: &str, sym: u32) -> MethodImpl {
    MethodImpl {
        fnname: it.insert(name),
        mangled: it.insert(mangled),
        entry: SymbolId(sym),
    }
}

#[test]
fn struct_methods_win_over_trait_methods() {
    let mut it = Interner::new();
    let mut r = Runables::default();
    let m = it.insert("m");
    let t1 = it.insert("T1");
    r.add_entry(None, mk(&mut it, "m", "SF1S1m", 1));
    r.add_entry(Some(t1), mk(&mut it, "m", "TSF2T11S1m", 2));

    match r.find_entry(m, None) {
        MethodLookup::Found(info) => assert_eq!(info.entry, SymbolId(1)),
        _ => panic!("expected the struct's own method"),
    }
}

#[test]
fn trait_constrained_lookup_is_exact() {
    let mut it = Interner::new();
    let mut r = Runables::default();
    let m = it.insert("m");
    let t1 = it.insert("T1");
    let t2 = it.insert("T2");
    r.add_entry(Some(t1), mk(&mut it, "m", "a", 1));
    r.add_entry(Some(t2), mk(&mut it, "m", "b", 2));

    match r.find_entry(m, Some(t2)) {
        MethodLookup::Found(info) => assert_eq!(info.entry, SymbolId(2)),
        _ => panic!("expected the T2 impl"),
    }
}

#[test]
fn unconstrained_lookup_across_two_traits_is_ambiguous() {
    let mut it = Interner::new();
    let mut r = Runables::default();
    let m = it.insert("m");
    let t1 = it.insert("T1");
    let t2 = it.insert("T2");
    r.add_entry(Some(t1), mk(&mut it, "m", "a", 1));
    r.add_entry(Some(t2), mk(&mut it, "m", "b", 2));

    match r.find_entry(m, None) {
        MethodLookup::Ambiguous(cands) => {
            assert_eq!(cands.len(), 2);
            // declaration order: T1 first
            assert_eq!(cands[0].0, t1);
            assert_eq!(cands[1].0, t2);
        }
        _ => panic!("expected ambiguity"),
    }
}

#[test]
fn missing_method_is_not_found() {
    let mut it = Interner::new();
    let r = Runables::default();
    let nope = it.insert("nope");
    assert!(matches!(r.find_entry(nope, None), MethodLookup::NotFound));
}
