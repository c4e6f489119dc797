//! The `as` conversion table.
//!
//! Indexed by source and target token kinds; each cell is either a
//! backend cast opcode, "same signature, no cast", or "forbidden".

use crate::types::TypeTok;
use ca_backend::CastKind;

/// Outcome of consulting the cast table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOp {
    /// identical representation, the emitter emits nothing
    None,
    /// the conversion is not allowed by `as`
    Forbidden,
    Op(CastKind),
}

/// Coarse admissibility, checked before the opcode lookup:
/// - `bool` cannot be produced from anything but `bool`;
/// - `bool` converts to integers but not to floats.
#[must_use]
pub fn as_type_convertible(from: TypeTok, to: TypeTok) -> bool {
    if to == TypeTok::Bool {
        return from == TypeTok::Bool;
    }
    match from {
        TypeTok::Bool => !to.is_float(),
        _ => true,
    }
}

/// The cast opcode for `from as to`.
#[must_use]
pub fn cast_op(from: TypeTok, to: TypeTok) -> CastOp {
    use TypeTok::*;

    // two pointer types may differ in pointee; the emitter drops the
    // bitcast itself when the signatures are identical
    if from == to && from != Pointer {
        return CastOp::None;
    }
    if !as_type_convertible(from, to) {
        return CastOp::Forbidden;
    }

    let ptrish = |t: TypeTok| matches!(t, Pointer | CString);

    match (from, to) {
        // bool widens like an unsigned integer
        (Bool, t) if t.is_integer() => CastOp::Op(CastKind::ZExt),

        // integer ↔ integer
        (f, t) if f.is_integer() && t.is_integer() => {
            let (fb, tb) = (f.bits(), t.bits());
            if fb == tb {
                // same width, signedness reinterpretation
                CastOp::Op(CastKind::BitCast)
            } else if fb < tb {
                if f.is_signed() {
                    CastOp::Op(CastKind::SExt)
                } else {
                    CastOp::Op(CastKind::ZExt)
                }
            } else {
                CastOp::Op(CastKind::Trunc)
            }
        }

        // integer → float by source signedness
        (f, t) if f.is_integer() && t.is_float() => {
            if f.is_signed() {
                CastOp::Op(CastKind::SiToFp)
            } else {
                CastOp::Op(CastKind::UiToFp)
            }
        }

        // float → integer by target signedness
        (f, t) if f.is_float() && t.is_integer() && t != Bool => {
            if t.is_signed() {
                CastOp::Op(CastKind::FpToSi)
            } else {
                CastOp::Op(CastKind::FpToUi)
            }
        }

        (F32, F64) => CastOp::Op(CastKind::FpExt),
        (F64, F32) => CastOp::Op(CastKind::FpTrunc),

        // pointers
        (f, t) if ptrish(f) && ptrish(t) => CastOp::Op(CastKind::BitCast),
        (f, t) if ptrish(f) && t.is_integer() && t != Bool => CastOp::Op(CastKind::PtrToInt),
        (f, t) if f.is_integer() && f != Bool && ptrish(t) => CastOp::Op(CastKind::IntToPtr),

        // array decay; the emitter special-cases the temporary slot
        (Array, t) if ptrish(t) => CastOp::Op(CastKind::BitCast),

        _ => CastOp::Forbidden,
    }
}
