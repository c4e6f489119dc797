//! Literal type inference and determination.
//!
//! Two entry points mirror the two directions:
//! - [`inference_literal_type`] when no context type exists (the
//!   literal picks its own default, `i32`/`f64`/...);
//! - [`determine_literal_type`] when the surrounding context imposes a
//!   target type (annotation, parameter, return type).
//!
//! Both re-parse the interned lexeme so hex/octal/binary prefixes and
//! negative forms are honored, and both value-scope check the result
//! against the chosen type.

use crate::arena::TypeArena;
use crate::types::{CaTypePayload, TypeTok};
use ca_ast::literal::{CaLiteral, LitKind, LitValue};
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::TypeId;
use ca_common::interner::{Atom, Interner};
use ca_common::names;

/// Display name of a literal lexeme kind, used in diagnostics.
#[must_use]
pub const fn lit_kind_name(kind: LitKind) -> &'static str {
    match kind {
        LitKind::I64 => "i64",
        LitKind::U64 => "u64",
        LitKind::F64 => "f64",
        LitKind::Bool => "bool",
        LitKind::I8 => "i8",
        LitKind::U8 => "u8",
        LitKind::CString => "cstring",
        LitKind::Array => "array",
        LitKind::Struct => "struct",
        LitKind::Pointer => "pointer",
    }
}

// =============================================================================
// Value-scope checks
// =============================================================================

/// `true` means the value does not fit the target type.
#[must_use]
pub fn check_i64_value_scope(v: i64, tok: TypeTok) -> bool {
    // i64-shaped text carries a leading '-', so only lower bounds bind
    match tok {
        TypeTok::I16 => v < i64::from(i16::MIN),
        TypeTok::I32 => v < i64::from(i32::MIN),
        TypeTok::I8 => v < i64::from(i8::MIN),
        TypeTok::I64 | TypeTok::F32 | TypeTok::F64 => false,
        TypeTok::CString | TypeTok::Pointer | TypeTok::Array | TypeTok::Struct => false,
        _ => true,
    }
}

#[must_use]
pub fn check_u64_value_scope(v: u64, tok: TypeTok) -> bool {
    match tok {
        TypeTok::I8 => v > i8::MAX as u64,
        TypeTok::I16 => v > i16::MAX as u64,
        TypeTok::I32 => v > i32::MAX as u64,
        TypeTok::I64 => v > i64::MAX as u64,
        TypeTok::U8 => v > u64::from(u8::MAX),
        TypeTok::U16 => v > u64::from(u16::MAX),
        TypeTok::U32 => v > u64::from(u32::MAX),
        TypeTok::U64 | TypeTok::F32 | TypeTok::F64 => false,
        TypeTok::CString | TypeTok::Pointer | TypeTok::Array | TypeTok::Struct => false,
        _ => true,
    }
}

#[must_use]
pub fn check_f64_value_scope(v: f64, tok: TypeTok) -> bool {
    match tok {
        TypeTok::F32 => v.is_finite() && (v < f64::from(f32::MIN) || v > f64::from(f32::MAX)),
        TypeTok::F64 => false,
        _ => true,
    }
}

#[must_use]
pub fn check_char_value_scope(v: i64, tok: TypeTok) -> bool {
    tok == TypeTok::U8 && v < 0
}

#[must_use]
pub fn check_uchar_value_scope(v: i64, tok: TypeTok) -> bool {
    tok == TypeTok::I8 && v > 127
}

// =============================================================================
// Convertibility table
// =============================================================================

/// Whether a literal of lexeme kind `from` may be determined into type
/// token `to` (zero-value pointer conversions are handled separately).
#[must_use]
pub fn literal_type_convertible(from: LitKind, to: TypeTok) -> bool {
    use TypeTok::*;
    match from {
        // negative-bearing integer text: signed targets and floats
        LitKind::I64 => matches!(to, I16 | I32 | I64 | F32 | F64 | CString),
        // positive integer text: any integer or float
        LitKind::U64 => matches!(
            to,
            I8 | I16 | I32 | I64 | U8 | U16 | U32 | U64 | F32 | F64 | CString
        ),
        LitKind::F64 => matches!(to, F32 | F64),
        LitKind::Bool => to == Bool,
        // char forms: any integer, signedness checked by value scope
        LitKind::I8 | LitKind::U8 => matches!(
            to,
            I8 | I16 | I32 | I64 | U8 | U16 | U32 | U64 | F32 | F64 | CString
        ),
        _ => false,
    }
}

// =============================================================================
// Lexeme parsing
// =============================================================================

/// Parse integer text honoring `0x`/`0o`/`0b` prefixes and a leading
/// `-`; scope-check the result against `tok`. Returns `(value, bad)`.
#[must_use]
pub fn literal_parse_integer(text: &str, littype: LitKind, tok: TypeTok) -> (i64, bool) {
    let neg = littype == LitKind::I64 && text.starts_with('-');
    let body = if neg { &text[1..] } else { text };

    let parsed = if let Some(hex) = body.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(oct) = body.strip_prefix("0o") {
        u64::from_str_radix(oct, 8)
    } else if let Some(bin) = body.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        body.parse::<u64>()
    };
    let magnitude = parsed.unwrap_or(0);
    let value = if neg {
        (magnitude as i64).wrapping_neg()
    } else {
        magnitude as i64
    };

    let bad = if littype == LitKind::I64 {
        check_i64_value_scope(value, tok)
    } else {
        check_u64_value_scope(value as u64, tok)
    };
    (value, bad)
}

/// Decode a character lexeme: `a`, `\n`, `\t`, `\0`, `\\`, `\'`,
/// `\x41`.
#[must_use]
pub fn parse_lexical_char(text: &str) -> i64 {
    let mut chars = text.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some('n') => i64::from(b'\n'),
            Some('t') => i64::from(b'\t'),
            Some('r') => i64::from(b'\r'),
            Some('0') => 0,
            Some('\\') => i64::from(b'\\'),
            Some('\'') => i64::from(b'\''),
            Some('x') => {
                let hex: String = chars.take(2).collect();
                i64::from_str_radix(&hex, 16).unwrap_or(0)
            }
            _ => 0,
        },
        Some(c) => i64::from(c as u32),
        None => 0,
    }
}

// =============================================================================
// Inference (no context type)
// =============================================================================

fn bad_literal_err(lit: &CaLiteral, to_name: &str) -> Diagnostic {
    Diagnostic::error_range(
        lit.span.beg,
        lit.span.end,
        format!(
            "bad literal value definition: {} cannot be {}",
            lit_kind_name(lit.kind),
            to_name
        ),
    )
}

fn inference_primitive_literal_type(
    interner: &mut Interner,
    lit: &mut CaLiteral,
) -> CaResult<Atom> {
    let text = interner.get(lit.text).to_owned();
    let (intent, bad) = match lit.kind {
        LitKind::I64 | LitKind::U64 => {
            let (value, bad) = literal_parse_integer(&text, lit.kind, TypeTok::I32);
            lit.value = LitValue::I64(value);
            (TypeTok::I32, bad)
        }
        LitKind::F64 => {
            let value: f64 = text.parse().unwrap_or(0.0);
            lit.value = LitValue::F64(value);
            (TypeTok::F64, check_f64_value_scope(value, TypeTok::F64))
        }
        LitKind::Bool => {
            lit.value = LitValue::I64(i64::from(text == "true" || text == "1"));
            (TypeTok::Bool, false)
        }
        LitKind::I8 => {
            let v = parse_lexical_char(&text);
            lit.value = LitValue::I64(v);
            (TypeTok::I8, check_char_value_scope(v, TypeTok::I8))
        }
        LitKind::U8 => {
            let v = parse_lexical_char(&text);
            lit.value = LitValue::I64(v);
            (TypeTok::I8, check_uchar_value_scope(v, TypeTok::U8))
        }
        _ => {
            return Err(Diagnostic::error_range(
                lit.span.beg,
                lit.span.end,
                "void type have no literal value",
            )
            .into());
        }
    };

    if bad {
        return Err(bad_literal_err(lit, intent.name()).into());
    }

    // U8 char lexemes still default to u8, I8 to i8
    let final_tok = if lit.kind == LitKind::U8 { TypeTok::U8 } else { intent };
    let datatype = names::form_type_id_by_str(interner, final_tok.name());
    lit.datatype = Some(datatype);
    lit.fixed_type = true;
    Ok(datatype)
}

fn inference_array_literal(
    arena: &mut TypeArena,
    interner: &mut Interner,
    lit: &mut CaLiteral,
) -> CaResult<Atom> {
    let LitValue::Array(mut elems) = std::mem::replace(&mut lit.value, LitValue::None) else {
        return Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            "(internal) array literal without element literals",
        )
        .into());
    };

    let mut elem_ty: Option<TypeId> = None;
    for (i, sub) in elems.iter_mut().enumerate() {
        inference_literal_type(arena, interner, sub)?;
        let sub_ty = match sub.catype {
            Some(ct) => ct,
            None => {
                let dt = sub.datatype.expect("inferred literal has a datatype");
                arena.get_primitive_by_name(dt).ok_or_else(|| {
                    Diagnostic::error_range(
                        sub.span.beg,
                        sub.span.end,
                        "(internal) cannot determine array element type",
                    )
                })?
            }
        };
        if let Some(prev) = elem_ty
            && !arena.check_identical(prev, sub_ty)
        {
            return Err(Diagnostic::error_range(
                sub.span.beg,
                sub.span.end,
                format!(
                    "different array element type: idx {}: `{}`, idx {}: `{}`",
                    i - 1,
                    interner.get(arena.get(prev).signature),
                    i,
                    interner.get(arena.get(sub_ty).signature)
                ),
            )
            .into());
        }
        elem_ty = Some(sub_ty);
    }

    let elem_ty = elem_ty.ok_or_else(|| {
        Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            "cannot infer the element type of an empty array literal",
        )
    })?;
    let len = elems.len() as u64;
    let arr = arena.make_array_type(interner, elem_ty, len);
    lit.value = LitValue::Array(elems);
    lit.catype = Some(arr);
    lit.datatype = Some(arena.get(arr).signature);
    lit.fixed_type = true;
    Ok(arena.get(arr).signature)
}

/// Infer the literal's own type when the context provides none.
pub fn inference_literal_type(
    arena: &mut TypeArena,
    interner: &mut Interner,
    lit: &mut CaLiteral,
) -> CaResult<Atom> {
    if lit.fixed_type {
        return Ok(lit.datatype.expect("fixed literal has a datatype"));
    }
    match lit.kind {
        LitKind::Array => inference_array_literal(arena, interner, lit),
        LitKind::Struct => Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            "struct literals need a determined context type",
        )
        .into()),
        LitKind::Pointer => Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            "pointer literals need a determined context type",
        )
        .into()),
        _ => inference_primitive_literal_type(interner, lit),
    }
}

// =============================================================================
// Determination (context type imposed)
// =============================================================================

fn is_literal_zero_value(interner: &Interner, lit: &CaLiteral) -> bool {
    lit.kind == LitKind::U64 && interner.get(lit.text) == "0"
}

fn determine_primitive_literal_type(
    arena: &mut TypeArena,
    interner: &mut Interner,
    lit: &mut CaLiteral,
    catype: TypeId,
) -> CaResult<()> {
    let typetok = arena.get(catype).tok;
    if typetok == TypeTok::Void {
        return Ok(());
    }

    if !is_literal_zero_value(interner, lit) && !literal_type_convertible(lit.kind, typetok) {
        let target = interner.get(arena.get(catype).signature).to_owned();
        return Err(bad_literal_err(lit, names::type_name(&target)).into());
    }

    match typetok {
        TypeTok::CString | TypeTok::Pointer | TypeTok::Array | TypeTok::Struct => {
            lit.datatype = Some(arena.get(catype).signature);
            lit.catype = Some(catype);
        }
        _ => {
            lit.datatype = Some(names::form_type_id_by_str(interner, typetok.name()));
        }
    }

    let text = interner.get(lit.text).to_owned();
    let bad = match lit.kind {
        LitKind::I64 | LitKind::U64 => {
            let (value, bad) = literal_parse_integer(&text, lit.kind, typetok);
            lit.value = LitValue::I64(value);
            bad
        }
        LitKind::F64 => {
            let value: f64 = text.parse().unwrap_or(0.0);
            lit.value = LitValue::F64(value);
            check_f64_value_scope(value, typetok)
        }
        LitKind::Bool => {
            lit.value = LitValue::I64(i64::from(text == "true" || text == "1"));
            typetok != TypeTok::Bool
        }
        LitKind::I8 => {
            let v = parse_lexical_char(&text);
            lit.value = LitValue::I64(v);
            check_char_value_scope(v, typetok)
        }
        LitKind::U8 => {
            let v = parse_lexical_char(&text);
            lit.value = LitValue::I64(v);
            check_uchar_value_scope(v, typetok)
        }
        _ => {
            return Err(Diagnostic::error_range(
                lit.span.beg,
                lit.span.end,
                format!("{} type have no lexical value", lit_kind_name(lit.kind)),
            )
            .into());
        }
    };

    if bad {
        return Err(bad_literal_err(lit, typetok.name()).into());
    }

    lit.fixed_type = true;
    Ok(())
}

fn determine_array_literal(
    arena: &mut TypeArena,
    interner: &mut Interner,
    lit: &mut CaLiteral,
    catype: TypeId,
) -> CaResult<()> {
    let (elem_ty, len) = {
        let ty = arena.get(catype);
        let Some(arr) = ty.array() else {
            return Err(Diagnostic::error_range(
                lit.span.beg,
                lit.span.end,
                format!(
                    "array literal cannot have type `{}`",
                    interner.get(ty.signature)
                ),
            )
            .into());
        };
        debug_assert_eq!(arr.dimension, 1, "determined against an expanded type");
        (arr.elem, arr.dims[0])
    };

    let LitValue::Array(mut elems) = std::mem::replace(&mut lit.value, LitValue::None) else {
        return Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            "(internal) array literal without element literals",
        )
        .into());
    };

    if elems.len() as u64 != len {
        return Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            format!(
                "expected an array with a fixed size of {} elements, found one with {} elements",
                len,
                elems.len()
            ),
        )
        .into());
    }

    for sub in &mut elems {
        determine_literal_type(arena, interner, sub, elem_ty)?;
    }

    lit.value = LitValue::Array(elems);
    lit.fixed_type = true;
    lit.datatype = Some(arena.get(catype).signature);
    lit.catype = Some(catype);
    Ok(())
}

/// Impose `catype` on the literal.
///
/// Idempotent: determining a fixed literal against its own type is a
/// no-op; against a different type it is an error.
pub fn determine_literal_type(
    arena: &mut TypeArena,
    interner: &mut Interner,
    lit: &mut CaLiteral,
    catype: TypeId,
) -> CaResult<()> {
    if lit.fixed_type {
        let sig = arena.get(catype).signature;
        if lit.datatype == Some(sig) {
            return Ok(());
        }
        let have = lit
            .datatype
            .map_or(String::new(), |d| interner.get(d).to_owned());
        return Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            format!(
                "conflicting of determining literal type: literal already have a type `{}`, cannot determine into `{}`",
                names::type_name(&have),
                names::type_name(interner.get(sig))
            ),
        )
        .into());
    }

    match lit.kind {
        LitKind::Array => determine_array_literal(arena, interner, lit, catype),
        LitKind::CString => {
            // a string literal targets *i8 (or cstring itself)
            let target = arena.get(catype);
            let ok = match (&target.tok, &target.payload) {
                (TypeTok::CString, _) => true,
                (TypeTok::Pointer, CaTypePayload::Pointer(p)) => {
                    arena.get(p.kernel).tok == TypeTok::I8
                }
                _ => false,
            };
            if !ok {
                let target = interner.get(arena.get(catype).signature).to_owned();
                return Err(bad_literal_err(lit, names::type_name(&target)).into());
            }
            lit.datatype = Some(arena.get(catype).signature);
            lit.catype = Some(catype);
            lit.fixed_type = true;
            Ok(())
        }
        LitKind::Pointer | LitKind::Struct => Err(Diagnostic::error_range(
            lit.span.beg,
            lit.span.end,
            "cannot convert complex type to any type",
        )
        .into()),
        _ => determine_primitive_literal_type(arena, interner, lit, catype),
    }
}

/// Numeric payload as i64 (floats truncate).
#[must_use]
pub fn parse_to_int64(lit: &CaLiteral) -> i64 {
    lit.as_i64()
}

/// Numeric payload as f64.
#[must_use]
pub fn parse_to_double(lit: &CaLiteral) -> f64 {
    lit.as_f64()
}
