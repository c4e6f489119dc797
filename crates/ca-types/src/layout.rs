//! Formalization: expansion and layout.
//!
//! Expansion splits any pointer or array with dimension greater than 1
//! into a chain of single-dimension nodes, keeping each link's
//! signature consistent. Layout then assigns struct field offsets with
//! natural alignment and computes sizes bottom-up.

use crate::arena::TypeArena;
use crate::signature::{typeid_decrease_array, typeid_decrease_pointer, typeid_from_catype};
use crate::types::{CaArray, CaPointer, CaType, CaTypePayload, CaTypeStatus, TypeTok};
use ca_common::ids::TypeId;
use ca_common::interner::Interner;
use rustc_hash::FxHashSet;
use smallvec::smallvec;

/// Expand chains and compute layout for `root`.
pub fn formalize(arena: &mut TypeArena, interner: &mut Interner, root: TypeId) {
    let mut rcheck = FxHashSet::default();
    rcheck.insert(root);
    expand(arena, interner, root, &mut rcheck);

    let mut rcheck = FxHashSet::default();
    rcheck.insert(root);
    layout_rec(arena, root, &mut rcheck);
}

/// Layout only (for types built already-expanded).
pub fn compute_layout(arena: &mut TypeArena, id: TypeId) {
    let mut rcheck = FxHashSet::default();
    rcheck.insert(id);
    layout_rec(arena, id, &mut rcheck);
}

fn expand(
    arena: &mut TypeArena,
    interner: &mut Interner,
    root: TypeId,
    rcheck: &mut FxHashSet<TypeId>,
) {
    let mut curr = root;
    loop {
        match arena.get(curr).payload.clone() {
            CaTypePayload::Pointer(p) => {
                if p.dimension > 1 {
                    // split `***T` into `* -> * -> * -> T`
                    if let CaTypePayload::Pointer(cp) = &mut arena.get_mut(curr).payload {
                        cp.dimension = 1;
                    }
                    let mut link = curr;
                    for _ in 1..p.dimension {
                        let sig = typeid_decrease_pointer(interner, arena.get(link).signature);
                        let next = arena.alloc(CaType {
                            tok: TypeTok::Pointer,
                            formal_name: sig,
                            size: 8,
                            signature: sig,
                            status: CaTypeStatus::Expand,
                            payload: CaTypePayload::Pointer(CaPointer {
                                kernel: p.kernel,
                                dimension: 1,
                                allocpos: p.allocpos,
                            }),
                        });
                        if let CaTypePayload::Pointer(cp) = &mut arena.get_mut(link).payload {
                            cp.kernel = next;
                        }
                        link = next;
                    }
                    curr = link;
                }

                let next = match &arena.get(curr).payload {
                    CaTypePayload::Pointer(cp) => cp.kernel,
                    _ => unreachable!(),
                };
                if arena.get(next).status == CaTypeStatus::None {
                    let sig = typeid_decrease_pointer(interner, arena.get(curr).signature);
                    let ty = arena.get_mut(next);
                    ty.signature = sig;
                    ty.status = CaTypeStatus::Expand;
                }
                curr = next;
            }
            CaTypePayload::Array(a) => {
                if a.dimension > 1 {
                    if let CaTypePayload::Array(ca) = &mut arena.get_mut(curr).payload {
                        ca.dimension = 1;
                        ca.dims = smallvec![a.dims[0]];
                    }
                    let mut link = curr;
                    for i in 1..a.dimension as usize {
                        let sig = typeid_decrease_array(interner, arena.get(link).signature);
                        let next = arena.alloc(CaType {
                            tok: TypeTok::Array,
                            formal_name: sig,
                            size: 0,
                            signature: sig,
                            status: CaTypeStatus::Expand,
                            payload: CaTypePayload::Array(CaArray {
                                elem: a.elem,
                                dimension: 1,
                                dims: smallvec![a.dims[i]],
                            }),
                        });
                        if let CaTypePayload::Array(ca) = &mut arena.get_mut(link).payload {
                            ca.elem = next;
                        }
                        link = next;
                    }
                    curr = link;
                }

                let next = match &arena.get(curr).payload {
                    CaTypePayload::Array(ca) => ca.elem,
                    _ => unreachable!(),
                };
                if arena.get(next).status == CaTypeStatus::None {
                    let sig = typeid_decrease_array(interner, arena.get(curr).signature);
                    let ty = arena.get_mut(next);
                    ty.signature = sig;
                    ty.status = CaTypeStatus::Expand;
                }
                curr = next;
            }
            CaTypePayload::Struct(s) => {
                for field in &s.fields {
                    if rcheck.contains(&field.ty) {
                        continue;
                    }
                    rcheck.insert(field.ty);
                    if arena.get(field.ty).status == CaTypeStatus::None {
                        typeid_from_catype(arena, interner, field.ty);
                    }
                    expand(arena, interner, field.ty, rcheck);
                    rcheck.remove(&field.ty);
                }
                return;
            }
            _ => return,
        }
    }
}

/// Natural alignment of a type used as a struct field.
#[must_use]
pub fn field_align(arena: &TypeArena, id: TypeId) -> u64 {
    match &arena.get(id).payload {
        CaTypePayload::Pointer(_) => 8,
        CaTypePayload::Array(a) => field_align(arena, a.elem),
        CaTypePayload::Struct(s) => s.max_align.max(1),
        _ => (arena.get(id).size.max(1)) as u64,
    }
}

fn layout_rec(arena: &mut TypeArena, id: TypeId, rcheck: &mut FxHashSet<TypeId>) {
    match arena.get(id).payload.clone() {
        CaTypePayload::Pointer(p) => {
            layout_rec(arena, p.kernel, rcheck);
            arena.get_mut(id).size = 8;
        }
        CaTypePayload::Array(a) => {
            layout_rec(arena, a.elem, rcheck);
            arena.get_mut(id).size = a.dims[0] as i64 * arena.get(a.elem).size;
        }
        CaTypePayload::Struct(s) => {
            let mut offset: u64 = 0;
            let mut max_align: u64 = 1;
            let mut offsets = Vec::with_capacity(s.fields.len());
            for field in &s.fields {
                if rcheck.contains(&field.ty) {
                    offsets.push(offset);
                    continue;
                }
                rcheck.insert(field.ty);
                layout_rec(arena, field.ty, rcheck);
                rcheck.remove(&field.ty);

                let align = field_align(arena, field.ty);
                if offset % align != 0 {
                    offset += align - offset % align;
                }
                offsets.push(offset);
                offset += arena.get(field.ty).size.max(0) as u64;
                max_align = max_align.max(align);
            }

            if offset % max_align != 0 {
                offset += max_align - offset % max_align;
            }

            if let CaTypePayload::Struct(st) = &mut arena.get_mut(id).payload {
                for (field, off) in st.fields.iter_mut().zip(offsets) {
                    field.offset = off;
                }
                st.max_align = max_align;
            }
            arena.get_mut(id).size = offset as i64;
        }
        _ => {}
    }
}

/// Compact normalization: merge pointer and array chains into single
/// multi-dimension nodes. The inverse of expansion, used where a
/// compacted view of a type is wanted.
pub fn compact(arena: &mut TypeArena, id: TypeId) {
    let mut rcheck = FxHashSet::default();
    compact_rec(arena, id, &mut rcheck);
}

fn compact_rec(arena: &mut TypeArena, id: TypeId, rcheck: &mut FxHashSet<TypeId>) {
    if !rcheck.insert(id) {
        return;
    }
    match arena.get(id).payload.clone() {
        CaTypePayload::Pointer(p) => {
            let mut kernel = p.kernel;
            let mut dimension = p.dimension;
            while let CaTypePayload::Pointer(inner) = arena.get(kernel).payload.clone() {
                dimension += inner.dimension;
                kernel = inner.kernel;
            }
            compact_rec(arena, kernel, rcheck);
            if let CaTypePayload::Pointer(cp) = &mut arena.get_mut(id).payload {
                cp.kernel = kernel;
                cp.dimension = dimension;
            }
            arena.get_mut(id).status = CaTypeStatus::Compact;
        }
        CaTypePayload::Array(a) => {
            let mut elem = a.elem;
            let mut dims = a.dims.clone();
            while let CaTypePayload::Array(inner) = arena.get(elem).payload.clone() {
                dims.extend(inner.dims.iter().copied());
                elem = inner.elem;
            }
            compact_rec(arena, elem, rcheck);
            let dimension = dims.len() as u32;
            if let CaTypePayload::Array(ca) = &mut arena.get_mut(id).payload {
                ca.elem = elem;
                ca.dims = dims;
                ca.dimension = dimension;
            }
            arena.get_mut(id).status = CaTypeStatus::Compact;
        }
        CaTypePayload::Struct(s) => {
            for field in &s.fields {
                compact_rec(arena, field.ty, rcheck);
            }
        }
        _ => {}
    }
}
