use ca_ast::literal::{CaLiteral, LitKind, LitValue};
use ca_common::interner::Interner;
use ca_common::sloc::{Sloc, Span};
use ca_types::literal::{determine_literal_type, inference_literal_type, literal_parse_integer};
use ca_types::{TypeArena, TypeTok};

fn lit(it: &mut Interner, kind: LitKind, text: &str) -> CaLiteral {
    let atom = it.insert(text);
    CaLiteral::new(kind, atom, Span::at(Sloc::new(4, 2)))
}

#[test]
fn plain_integer_defaults_to_i32() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let mut l = lit(&mut it, LitKind::U64, "42");
    let ty = inference_literal_type(&mut types, &mut it, &mut l).unwrap();
    assert_eq!(it.get(ty), "t:i32");
    assert!(l.fixed_type);
    assert_eq!(l.as_i64(), 42);
}

#[test]
fn float_defaults_to_f64() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let mut l = lit(&mut it, LitKind::F64, "2.5");
    let ty = inference_literal_type(&mut types, &mut it, &mut l).unwrap();
    assert_eq!(it.get(ty), "t:f64");
    assert_eq!(l.as_f64(), 2.5);
}

#[test]
fn prefixed_integers_parse() {
    assert_eq!(literal_parse_integer("0x1f", LitKind::U64, TypeTok::I32).0, 31);
    assert_eq!(literal_parse_integer("0o17", LitKind::U64, TypeTok::I32).0, 15);
    assert_eq!(literal_parse_integer("0b1011", LitKind::U64, TypeTok::I32).0, 11);
    assert_eq!(literal_parse_integer("-0x10", LitKind::I64, TypeTok::I32).0, -16);
}

#[test]
fn out_of_range_literal_is_a_located_error() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let i8_ty = types.get_primitive_by_token(TypeTok::I8);
    let mut l = lit(&mut it, LitKind::U64, "200");
    let err = determine_literal_type(&mut types, &mut it, &mut l, i8_ty).unwrap_err();
    let text = err.to_string();
    assert!(
        text.contains("bad literal value definition: u64 cannot be i8"),
        "unexpected message: {text}"
    );
    assert!(text.starts_with("line: 4, col: 2:"), "missing location: {text}");
}

#[test]
fn negative_literal_rejects_unsigned_targets() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let u64_ty = types.get_primitive_by_token(TypeTok::U64);
    let mut l = lit(&mut it, LitKind::I64, "-5");
    let err = determine_literal_type(&mut types, &mut it, &mut l, u64_ty).unwrap_err();
    assert!(err.to_string().contains("i64 cannot be u64"));
}

#[test]
fn zero_may_become_a_pointer() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let i8_ty = types.get_primitive_by_token(TypeTok::I8);
    let ptr = types.make_pointer_type(&mut it, i8_ty);
    let mut l = lit(&mut it, LitKind::U64, "0");
    determine_literal_type(&mut types, &mut it, &mut l, ptr).unwrap();
    assert_eq!(l.catype, Some(ptr));

    // only the zero value converts
    let mut l2 = lit(&mut it, LitKind::U64, "7");
    assert!(determine_literal_type(&mut types, &mut it, &mut l2, ptr).is_err());
}

#[test]
fn determination_is_idempotent() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let i64_ty = types.get_primitive_by_token(TypeTok::I64);
    let mut l = lit(&mut it, LitKind::U64, "9");
    determine_literal_type(&mut types, &mut it, &mut l, i64_ty).unwrap();
    let first = l.datatype;
    determine_literal_type(&mut types, &mut it, &mut l, i64_ty).unwrap();
    assert_eq!(l.datatype, first);

    // a different target now conflicts
    let i32_ty = types.get_primitive_by_token(TypeTok::I32);
    assert!(determine_literal_type(&mut types, &mut it, &mut l, i32_ty).is_err());
}

#[test]
fn array_literal_inference() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let elems = vec![
        lit(&mut it, LitKind::U64, "1"),
        lit(&mut it, LitKind::U64, "2"),
        lit(&mut it, LitKind::U64, "3"),
    ];
    let mut l = lit(&mut it, LitKind::Array, "");
    l.value = LitValue::Array(elems);
    let ty = inference_literal_type(&mut types, &mut it, &mut l).unwrap();
    assert_eq!(it.get(ty), "t:[i32;3]");
}

#[test]
fn array_literal_element_mismatch() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let elems = vec![
        lit(&mut it, LitKind::U64, "1"),
        lit(&mut it, LitKind::F64, "2.0"),
    ];
    let mut l = lit(&mut it, LitKind::Array, "");
    l.value = LitValue::Array(elems);
    let err = inference_literal_type(&mut types, &mut it, &mut l).unwrap_err();
    assert!(err.to_string().contains("different array element type"));
}

#[test]
fn array_literal_determination_checks_length() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let i32_ty = types.get_primitive_by_token(TypeTok::I32);
    let arr2 = types.make_array_type(&mut it, i32_ty, 2);
    let elems = vec![
        lit(&mut it, LitKind::U64, "1"),
        lit(&mut it, LitKind::U64, "2"),
        lit(&mut it, LitKind::U64, "3"),
    ];
    let mut l = lit(&mut it, LitKind::Array, "");
    l.value = LitValue::Array(elems);
    let err = determine_literal_type(&mut types, &mut it, &mut l, arr2).unwrap_err();
    assert!(err.to_string().contains("fixed size of 2 elements"));
}

#[test]
fn char_literals_respect_signedness() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let u8_ty = types.get_primitive_by_token(TypeTok::U8);
    let mut l = lit(&mut it, LitKind::I8, "A");
    determine_literal_type(&mut types, &mut it, &mut l, u8_ty).unwrap();
    assert_eq!(l.as_i64(), 65);

    let mut esc = lit(&mut it, LitKind::U8, "\\n");
    let i64_ty = types.get_primitive_by_token(TypeTok::I64);
    determine_literal_type(&mut types, &mut it, &mut esc, i64_ty).unwrap();
    assert_eq!(esc.as_i64(), 10);
}

#[test]
fn string_literal_targets_i8_pointer() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let i8_ty = types.get_primitive_by_token(TypeTok::I8);
    let ptr = types.make_pointer_type(&mut it, i8_ty);
    let mut l = lit(&mut it, LitKind::CString, "hello");
    determine_literal_type(&mut types, &mut it, &mut l, ptr).unwrap();
    assert_eq!(l.catype, Some(ptr));

    let i32_ty = types.get_primitive_by_token(TypeTok::I32);
    let mut l2 = lit(&mut it, LitKind::CString, "hello");
    assert!(determine_literal_type(&mut types, &mut it, &mut l2, i32_ty).is_err());
}
