//! Signature string manipulation and comparison.

use crate::arena::TypeArena;
use crate::types::{CaStructKind, CaTypePayload, CaTypeStatus};
use ca_common::ids::TypeId;
use ca_common::interner::{Atom, Interner};
use ca_common::names;
use rustc_hash::{FxHashMap, FxHashSet};

/// `t:**T` → `t:*T`.
pub fn typeid_decrease_pointer(interner: &mut Interner, typeid: Atom) -> Atom {
    let name = names::type_name(interner.get(typeid)).to_owned();
    debug_assert!(name.starts_with('*'));
    names::form_type_id_by_str(interner, &name[1..])
}

/// `t:*T` → `t:**T`.
pub fn typeid_increase_pointer(interner: &mut Interner, typeid: Atom) -> Atom {
    let name = names::type_name(interner.get(typeid)).to_owned();
    names::form_type_id_by_str(interner, &format!("*{name}"))
}

/// `t:[[T;n1];n2]` → `t:[T;n1]` (strips the outermost layer).
pub fn typeid_decrease_array(interner: &mut Interner, typeid: Atom) -> Atom {
    let name = names::type_name(interner.get(typeid)).to_owned();
    debug_assert!(name.starts_with('[') && name.ends_with(']'));
    let last_semi = name.rfind(';').expect("array signature has a ';'");
    names::form_type_id_by_str(interner, &name[1..last_semi])
}

/// `t:[T;n1]` → `t:[[T;n1];n]`.
pub fn typeid_increase_array(interner: &mut Interner, typeid: Atom, len: u64) -> Atom {
    let name = names::type_name(interner.get(typeid)).to_owned();
    names::form_type_id_by_str(interner, &format!("[{name};{len}]"))
}

/// Rebuild the top-level signature of a type from its structure,
/// closing recursive struct references by name.
pub fn typeid_from_catype(arena: &mut TypeArena, interner: &mut Interner, id: TypeId) -> Atom {
    let mut rcheck = FxHashSet::default();
    typeid_top_down(arena, interner, id, &mut rcheck)
}

fn typeid_top_down(
    arena: &mut TypeArena,
    interner: &mut Interner,
    id: TypeId,
    rcheck: &mut FxHashSet<TypeId>,
) -> Atom {
    if arena.get(id).status != CaTypeStatus::None {
        return arena.get(id).signature;
    }

    match arena.get(id).payload.clone() {
        CaTypePayload::Pointer(p) => {
            let sub = typeid_top_down(arena, interner, p.kernel, rcheck);
            let subname = names::type_name(interner.get(sub)).to_owned();
            let stars = "*".repeat(p.dimension as usize);
            let sig = names::form_type_id_by_str(interner, &format!("{stars}{subname}"));
            let ty = arena.get_mut(id);
            ty.signature = sig;
            ty.status = CaTypeStatus::Expand;
            sig
        }
        CaTypePayload::Array(a) => {
            let sub = typeid_top_down(arena, interner, a.elem, rcheck);
            let mut text = names::type_name(interner.get(sub)).to_owned();
            for i in (0..a.dimension as usize).rev() {
                text = format!("[{text};{}]", a.dims[i]);
            }
            let sig = names::form_type_id_by_str(interner, &text);
            let ty = arena.get_mut(id);
            ty.signature = sig;
            ty.status = CaTypeStatus::Expand;
            sig
        }
        CaTypePayload::Struct(s) => {
            if rcheck.contains(&id) {
                let name = interner.get(s.name).to_owned();
                return names::form_type_id_by_str(interner, &name);
            }
            rcheck.insert(id);
            let named = !matches!(s.kind, CaStructKind::GeneralTuple);
            let mut text = String::new();
            text.push(if s.kind.is_tuple() { '(' } else { '{' });
            if named {
                text.push_str(interner.get(s.name));
            }
            text.push(';');
            for (i, field) in s.fields.iter().enumerate() {
                if i > 0 {
                    text.push(',');
                }
                let sub = typeid_top_down(arena, interner, field.ty, rcheck);
                if s.kind.has_named_fields() {
                    text.push_str(interner.get(field.name));
                    text.push(':');
                }
                text.push_str(names::type_name(interner.get(sub)));
            }
            text.push(if s.kind.is_tuple() { ')' } else { '}' });
            rcheck.remove(&id);
            let sig = names::form_type_id_by_str(interner, &text);
            let ty = arena.get_mut(id);
            ty.signature = sig;
            ty.status = CaTypeStatus::Expand;
            sig
        }
        _ => arena.get(id).signature,
    }
}

/// How strictly two signatures are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpLevel {
    /// only the skeleton must match; struct and member names may
    /// differ under a consistent renaming
    Skeleton,
    /// skeleton and struct names must match
    TypeName,
    /// skeleton and member names must match
    Member,
    /// byte equality
    Strict,
}

impl CmpLevel {
    const fn strict_typename(self) -> bool {
        matches!(self, CmpLevel::TypeName | CmpLevel::Strict)
    }

    const fn strict_membername(self) -> bool {
        matches!(self, CmpLevel::Member | CmpLevel::Strict)
    }
}

/// Structural comparison of two signature strings.
///
/// Non-strict levels ignore struct/enum names via a bidirectional
/// rename map; primitive names always compare strictly.
#[must_use]
pub fn compare_signature_str(name1: &str, name2: &str, level: CmpLevel) -> bool {
    if level == CmpLevel::Strict {
        return name1 == name2;
    }

    // plain primitive names compare directly
    if starts_alpha(name1) && starts_alpha(name2) {
        return name1 == name2;
    }

    let mut fwd: FxHashMap<&str, &str> = FxHashMap::default();
    let mut bwd: FxHashMap<&str, &str> = FxHashMap::default();

    let b1 = name1.as_bytes();
    let b2 = name2.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    loop {
        // advance over matching structure characters
        while i < b1.len()
            && j < b2.len()
            && !b1[i].is_ascii_alphabetic()
            && b1[i] == b2[j]
        {
            i += 1;
            j += 1;
        }

        if i == b1.len() && j == b2.len() {
            return true;
        }
        if i == b1.len() || j == b2.len() {
            return false;
        }
        if !b1[i].is_ascii_alphabetic() || !b2[j].is_ascii_alphabetic() {
            return false;
        }

        let n1 = parse_name(name1, i);
        let n2 = parse_name(name2, j);

        // what the name means depends on the character before it
        let prev = if i == 0 { b'{' } else { b1[i - 1] };
        match prev {
            b'{' | b'(' | b'<' => {
                // a struct name, first encounter
                if level.strict_typename() {
                    if n1 != n2 {
                        return false;
                    }
                } else {
                    if let Some(&m) = fwd.get(n1)
                        && m != n2
                    {
                        return false;
                    }
                    if let Some(&m) = bwd.get(n2)
                        && m != n1
                    {
                        return false;
                    }
                    fwd.insert(n1, n2);
                    bwd.insert(n2, n1);
                }
            }
            b';' | b',' => {
                // a member name
                if level.strict_membername() && n1 != n2 {
                    return false;
                }
            }
            _ => {
                // primitive name or a later struct reference
                match fwd.get(n1) {
                    Some(&m) => {
                        if m != n2 {
                            return false;
                        }
                    }
                    None => {
                        if n1 != n2 {
                            return false;
                        }
                    }
                }
            }
        }

        i += n1.len();
        j += n2.len();
    }
}

fn starts_alpha(s: &str) -> bool {
    s.as_bytes().first().is_some_and(|b| b.is_ascii_alphabetic())
}

fn parse_name(s: &str, from: usize) -> &str {
    let bytes = s.as_bytes();
    let mut end = from;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    &s[from..end]
}
