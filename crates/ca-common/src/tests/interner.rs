use super::*;

#[test]
fn insert_is_idempotent() {
    let mut interner = Interner::new();
    let a = interner.insert("fibs");
    let b = interner.insert("fibs");
    assert_eq!(a, b);
    assert_eq!(interner.get(a), "fibs");
}

#[test]
fn distinct_strings_get_distinct_atoms() {
    let mut interner = Interner::new();
    let a = interner.insert("a");
    let b = interner.insert("b");
    assert_ne!(a, b);
}

#[test]
fn check_does_not_intern() {
    let mut interner = Interner::new();
    assert_eq!(interner.check("missing"), None);
    let a = interner.insert("present");
    assert_eq!(interner.check("present"), Some(a));
}

#[test]
fn binary_safe_interning() {
    let mut interner = Interner::new();
    let a = interner.insert_bytes(b"str\0with\0nuls");
    let b = interner.insert_bytes(b"str\0with\0nuls");
    assert_eq!(a, b);
    assert_eq!(interner.get_bytes(a), b"str\0with\0nuls");
}
