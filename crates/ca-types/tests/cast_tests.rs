use ca_backend::CastKind;
use ca_types::{as_type_convertible, cast_op, CastOp, TypeTok};

#[test]
fn same_type_needs_no_cast() {
    assert_eq!(cast_op(TypeTok::I32, TypeTok::I32), CastOp::None);
    assert_eq!(cast_op(TypeTok::F64, TypeTok::F64), CastOp::None);
    // pointer-to-pointer stays a bitcast: the pointees may differ
    assert_eq!(
        cast_op(TypeTok::Pointer, TypeTok::Pointer),
        CastOp::Op(CastKind::BitCast)
    );
}

#[test]
fn bool_is_not_producible_by_as() {
    for from in [TypeTok::I8, TypeTok::U64, TypeTok::F32, TypeTok::Pointer] {
        assert!(!as_type_convertible(from, TypeTok::Bool));
        assert_eq!(cast_op(from, TypeTok::Bool), CastOp::Forbidden);
    }
    assert!(as_type_convertible(TypeTok::Bool, TypeTok::Bool));
}

#[test]
fn bool_converts_to_integers_but_not_floats() {
    assert_eq!(cast_op(TypeTok::Bool, TypeTok::I32), CastOp::Op(CastKind::ZExt));
    assert_eq!(cast_op(TypeTok::Bool, TypeTok::F32), CastOp::Forbidden);
    assert_eq!(cast_op(TypeTok::Bool, TypeTok::F64), CastOp::Forbidden);
}

#[test]
fn integer_widening_follows_source_signedness() {
    assert_eq!(cast_op(TypeTok::I32, TypeTok::I64), CastOp::Op(CastKind::SExt));
    assert_eq!(cast_op(TypeTok::U32, TypeTok::I64), CastOp::Op(CastKind::ZExt));
    assert_eq!(cast_op(TypeTok::I64, TypeTok::I16), CastOp::Op(CastKind::Trunc));
}

#[test]
fn same_width_sign_flip_is_a_bitcast() {
    assert_eq!(cast_op(TypeTok::I32, TypeTok::U32), CastOp::Op(CastKind::BitCast));
    assert_eq!(cast_op(TypeTok::U8, TypeTok::I8), CastOp::Op(CastKind::BitCast));
}

#[test]
fn int_float_conversions() {
    assert_eq!(cast_op(TypeTok::I32, TypeTok::F64), CastOp::Op(CastKind::SiToFp));
    assert_eq!(cast_op(TypeTok::U8, TypeTok::F32), CastOp::Op(CastKind::UiToFp));
    assert_eq!(cast_op(TypeTok::F64, TypeTok::I32), CastOp::Op(CastKind::FpToSi));
    assert_eq!(cast_op(TypeTok::F32, TypeTok::U64), CastOp::Op(CastKind::FpToUi));
    assert_eq!(cast_op(TypeTok::F32, TypeTok::F64), CastOp::Op(CastKind::FpExt));
    assert_eq!(cast_op(TypeTok::F64, TypeTok::F32), CastOp::Op(CastKind::FpTrunc));
}

#[test]
fn pointer_conversions() {
    assert_eq!(
        cast_op(TypeTok::Pointer, TypeTok::I64),
        CastOp::Op(CastKind::PtrToInt)
    );
    assert_eq!(
        cast_op(TypeTok::U64, TypeTok::Pointer),
        CastOp::Op(CastKind::IntToPtr)
    );
    assert_eq!(
        cast_op(TypeTok::Pointer, TypeTok::CString),
        CastOp::Op(CastKind::BitCast)
    );
    assert_eq!(
        cast_op(TypeTok::Array, TypeTok::Pointer),
        CastOp::Op(CastKind::BitCast)
    );
}

#[test]
fn aggregates_do_not_cast() {
    assert_eq!(cast_op(TypeTok::Struct, TypeTok::I32), CastOp::Forbidden);
    assert_eq!(cast_op(TypeTok::I32, TypeTok::Array), CastOp::Forbidden);
    assert_eq!(cast_op(TypeTok::Array, TypeTok::I64), CastOp::Forbidden);
}
