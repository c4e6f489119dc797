use ca_common::ids::{NodeId, ScopeId};
use ca_common::interner::Interner;
use ca_common::names;

#[test]
fn type_id_forms() {
    let mut it = Interner::new();
    let i32_id = names::form_type_id_by_str(&mut it, "i32");
    assert_eq!(it.get(i32_id), "t:i32");

    let ptr = names::form_pointer_id(&mut it, i32_id);
    assert_eq!(it.get(ptr), "t:*i32");

    let ptr2 = names::form_pointer_id(&mut it, ptr);
    assert_eq!(it.get(ptr2), "t:**i32");

    let arr = names::form_array_id(&mut it, ptr, 3);
    assert_eq!(it.get(arr), "t:[*i32;3]");
}

#[test]
fn tuple_id_form() {
    let mut it = Interner::new();
    let a = names::form_type_id_by_str(&mut it, "i32");
    let b = names::form_type_id_by_str(&mut it, "f64");
    let tup = names::form_tuple_id(&mut it, &[a, b]);
    assert_eq!(it.get(tup), "t:(;i32,f64)");
}

#[test]
fn label_and_function_prefixes() {
    let mut it = Interner::new();
    let l1 = it.insert("l1");
    let fibs = it.insert("fibs");
    let label_id = names::form_label_id(&mut it, l1);
    assert_eq!(it.get(label_id), "l:l1");
    let func_id = names::form_function_id(&mut it, fibs);
    assert_eq!(it.get(func_id), "f:fibs");
}

#[test]
fn method_id_forms() {
    let mut it = Interner::new();
    let f = it.insert("area");
    let s = it.insert("Shape");
    let t = it.insert("Measure");
    let method_id = names::form_method_id(&mut it, f, s, None);
    assert_eq!(it.get(method_id), "f:Shape::area");
    let method_id2 = names::form_method_id(&mut it, f, s, Some(t));
    assert_eq!(it.get(method_id2), "f:Shape::<Measure>::area");
}

#[test]
fn scope_keyed_cache_ids_differ_by_scope() {
    let mut it = Interner::new();
    let tid = names::form_type_id_by_str(&mut it, "AA");
    let k0 = names::form_symtable_type_id(&mut it, ScopeId(0), tid);
    let k1 = names::form_symtable_type_id(&mut it, ScopeId(1), tid);
    assert_ne!(k0, k1);
}

#[test]
fn typeof_hole_round_trip() {
    let mut it = Interner::new();
    let id = names::form_expr_typeof_id(&mut it, NodeId(42));
    let text = it.get(id).to_owned();
    let bare = names::type_name(&text);
    let (node, consumed) = names::typeof_hole_node(bare).unwrap();
    assert_eq!(node, NodeId(42));
    assert_eq!(consumed, bare.len());
}
