//! Range and slice type constructors.

use crate::arena::TypeArena;
use crate::types::{
    CaRange, CaStruct, CaStructField, CaStructKind, CaType, CaTypePayload, CaTypeStatus, TypeTok,
};
use ca_ast::node::RangeKind;
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::TypeId;
use ca_common::interner::{Atom, Interner};
use ca_common::names;
use ca_common::sloc::Span;

/// Build the `CaType` of a range expression.
///
/// When both ends are present they must have the same signature; the
/// range's "packaged" type is then the 2-field general tuple
/// `(start, end)`. One-ended ranges package the single element type.
pub fn catype_from_range(
    arena: &mut TypeArena,
    interner: &mut Interner,
    span: Span,
    kind: RangeKind,
    inclusive: bool,
    start: Option<TypeId>,
    end: Option<TypeId>,
) -> CaResult<TypeId> {
    let dots = if inclusive { "..=" } else { ".." };

    let (packaged, text) = match (start, end) {
        (Some(s), Some(e)) => {
            let ssig = arena.get(s).signature;
            let esig = arena.get(e).signature;
            if ssig != esig {
                return Err(Diagnostic::error_range(
                    span.beg,
                    span.end,
                    format!(
                        "expect type `{}`, but found `{}`, both side of range need to be same type",
                        names::type_name(interner.get(ssig)),
                        names::type_name(interner.get(esig))
                    ),
                )
                .into());
            }
            let tuple = arena.make_tuple_type(interner, &[s, e]);
            let name = names::type_name(interner.get(ssig)).to_owned();
            (Some(tuple), format!("{name}{dots}{name}"))
        }
        (Some(s), None) => {
            let name = names::type_name(interner.get(arena.get(s).signature)).to_owned();
            (Some(s), format!("{name}.."))
        }
        (None, Some(e)) => {
            let name = names::type_name(interner.get(arena.get(e).signature)).to_owned();
            (Some(e), format!("{dots}{name}"))
        }
        (None, None) => (None, "..".to_string()),
    };

    let signature = names::form_type_id_by_str(interner, &text);
    if let Some(id) = arena.lookup_signature(signature) {
        return Ok(id);
    }

    let size = packaged.map_or(0, |p| arena.get(p).size);
    let id = arena.alloc(CaType {
        tok: TypeTok::Range,
        formal_name: signature,
        size,
        signature,
        status: CaTypeStatus::Expand,
        payload: CaTypePayload::Range(CaRange {
            kind,
            inclusive,
            start,
            end,
            packaged,
        }),
    });
    arena.insert_signature(signature, id);
    Ok(id)
}

/// The slice type over `item`: a 2-field general tuple
/// `{ptr: *item, len: i64}` tagged as a slice.
pub fn slice_create_catype(
    arena: &mut TypeArena,
    interner: &mut Interner,
    item: TypeId,
) -> TypeId {
    let ptr = arena.make_pointer_type(interner, item);
    let len_ty = arena.get_primitive_by_token(TypeTok::I64);

    let ptr_name = names::type_name(interner.get(arena.get(ptr).signature)).to_owned();
    let signature =
        names::form_type_id_by_str(interner, &format!("<slice;;{ptr_name},i64>"));
    if let Some(id) = arena.lookup_signature(signature) {
        return id;
    }

    // the two fields answer to `.ptr` and `.len`; the names do not
    // take part in the (anonymous) slice signature
    let ptr_field = interner.insert("ptr");
    let len_field = interner.insert("len");
    let id = arena.alloc(CaType {
        tok: TypeTok::Slice,
        formal_name: signature,
        size: 16,
        signature,
        status: CaTypeStatus::Expand,
        payload: CaTypePayload::Struct(CaStruct {
            kind: CaStructKind::Slice,
            name: Atom::NONE,
            fields: vec![
                CaStructField {
                    name: ptr_field,
                    offset: 0,
                    ty: ptr,
                },
                CaStructField {
                    name: len_field,
                    offset: 8,
                    ty: len_ty,
                },
            ],
            max_align: 8,
            packed: false,
        }),
    });
    arena.insert_signature(signature, id);
    id
}
