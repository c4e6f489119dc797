use ca_binder::scope::ScopeArena;
use ca_common::ids::ScopeId;
use ca_common::interner::Interner;
use ca_common::names;
use ca_types::signature::{
    compare_signature_str, typeid_decrease_array, typeid_decrease_pointer,
    typeid_increase_array, typeid_increase_pointer, CmpLevel,
};
use ca_types::TypeArena;

fn unwind_text(it: &mut Interner, types: &mut TypeArena, name: &str) -> String {
    let scopes = ScopeArena::new();
    let tid = names::form_type_id_by_str(it, name);
    let id = types.get_by_name(it, &scopes, ScopeId::GLOBAL, tid).unwrap();
    it.get(types.get(id).signature).to_owned()
}

#[test]
fn pointer_round_trip() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    // unwind(form_pointer_id(t)) == "*" ++ unwind(t)
    let base = names::form_type_id_by_str(&mut it, "i32");
    let ptr = names::form_pointer_id(&mut it, base);
    let ptr_name = names::type_name(it.get(ptr)).to_owned();
    let unwound = unwind_text(&mut it, &mut types, &ptr_name);
    let base_unwound = unwind_text(&mut it, &mut types, "i32");
    assert_eq!(unwound, format!("t:*{}", names::type_name(&base_unwound)));
}

#[test]
fn array_round_trip() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let base = names::form_type_id_by_str(&mut it, "*u8");
    let arr = names::form_array_id(&mut it, base, 5);
    let arr_name = names::type_name(it.get(arr)).to_owned();
    let unwound = unwind_text(&mut it, &mut types, &arr_name);
    let base_unwound = unwind_text(&mut it, &mut types, "*u8");
    assert_eq!(
        unwound,
        format!("t:[{};5]", names::type_name(&base_unwound))
    );
}

#[test]
fn increase_decrease_are_inverse() {
    let mut it = Interner::new();
    let t = names::form_type_id_by_str(&mut it, "*i32");
    let up = typeid_increase_pointer(&mut it, t);
    assert_eq!(it.get(up), "t:**i32");
    assert_eq!(typeid_decrease_pointer(&mut it, up), t);

    let a = names::form_type_id_by_str(&mut it, "[i32;3]");
    let up = typeid_increase_array(&mut it, a, 7);
    assert_eq!(it.get(up), "t:[[i32;3];7]");
    assert_eq!(typeid_decrease_array(&mut it, up), a);
}

#[test]
fn skeleton_comparison_allows_consistent_renaming() {
    let a = "{A;x:i32,y:{B;z:f64}}";
    let b = "{C;x:i32,y:{D;z:f64}}";
    assert!(compare_signature_str(a, b, CmpLevel::Skeleton));
    assert!(!compare_signature_str(a, b, CmpLevel::TypeName));
    // member names still matter at Member level
    let c = "{C;p:i32,q:{D;r:f64}}";
    assert!(compare_signature_str(a, c, CmpLevel::Skeleton));
    assert!(!compare_signature_str(a, c, CmpLevel::Member));
}

#[test]
fn skeleton_comparison_rejects_inconsistent_renaming() {
    // A maps to C in one position and to D in the other
    let a = "{A;x:{A;y:i32},z:{A;y:i32}}";
    let b = "{C;x:{C;y:i32},z:{D;y:i32}}";
    assert!(!compare_signature_str(a, b, CmpLevel::Skeleton));
}

#[test]
fn primitive_names_always_compare_strictly() {
    assert!(!compare_signature_str("{A;x:i32}", "{B;x:i64}", CmpLevel::Skeleton));
    assert!(compare_signature_str("i32", "i32", CmpLevel::Skeleton));
    assert!(!compare_signature_str("i32", "i64", CmpLevel::Skeleton));
}

#[test]
fn strict_comparison_is_byte_equality() {
    assert!(compare_signature_str("{A;x:i32}", "{A;x:i32}", CmpLevel::Strict));
    assert!(!compare_signature_str("{A;x:i32}", "{B;x:i32}", CmpLevel::Strict));
}
