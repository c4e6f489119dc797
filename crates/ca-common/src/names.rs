//! Interned-name forming helpers.
//!
//! Symbol names live in one flat interner but occupy distinct
//! namespaces via reserved prefixes that cannot appear in user
//! identifiers:
//!
//! - `t:` type ids (the canonical signature namespace)
//! - `l:` label names
//! - `f:` function labels
//! - `s:` scope-keyed type cache keys
//! - `+:` embedded `typeof(expr)` holes inside a type name
//!
//! A *typeid* is the atom of a `t:`-prefixed string; everything that
//! manipulates types passes these atoms around.

use crate::ids::{NodeId, ScopeId};
use crate::interner::{Atom, Interner};

pub const TYPE_PREFIX: &str = "t:";
pub const LABEL_PREFIX: &str = "l:";
pub const FUNCTION_PREFIX: &str = "f:";
pub const TYPEOF_PREFIX: &str = "+:";

/// `name` → typeid of `t:name`.
pub fn form_type_id(interner: &mut Interner, name: Atom) -> Atom {
    let s = format!("{TYPE_PREFIX}{}", interner.get(name));
    interner.insert(&s)
}

/// `"i32"` → typeid of `t:i32`.
pub fn form_type_id_by_str(interner: &mut Interner, name: &str) -> Atom {
    let s = format!("{TYPE_PREFIX}{name}");
    interner.insert(&s)
}

/// `name` → atom of `l:name`.
pub fn form_label_id(interner: &mut Interner, name: Atom) -> Atom {
    let s = format!("{LABEL_PREFIX}{}", interner.get(name));
    interner.insert(&s)
}

/// `name` → atom of `f:name`.
pub fn form_function_id(interner: &mut Interner, name: Atom) -> Atom {
    let s = format!("{FUNCTION_PREFIX}{}", interner.get(name));
    interner.insert(&s)
}

/// Method id in struct-impl form: `f:Class::fn` or `f:Class::<Trait>::fn`.
pub fn form_method_id(
    interner: &mut Interner,
    fnname: Atom,
    class: Atom,
    trait_name: Option<Atom>,
) -> Atom {
    let s = match trait_name {
        Some(t) => format!(
            "{FUNCTION_PREFIX}{}::<{}>::{}",
            interner.get(class),
            interner.get(t),
            interner.get(fnname)
        ),
        None => format!(
            "{FUNCTION_PREFIX}{}::{}",
            interner.get(class),
            interner.get(fnname)
        ),
    };
    interner.insert(&s)
}

/// `*T` typeid from the typeid of `T`.
pub fn form_pointer_id(interner: &mut Interner, typeid: Atom) -> Atom {
    let inner = type_name(interner.get(typeid)).to_owned();
    let s = format!("{TYPE_PREFIX}*{inner}");
    interner.insert(&s)
}

/// `[T;n]` typeid from the typeid of `T`.
pub fn form_array_id(interner: &mut Interner, typeid: Atom, len: u64) -> Atom {
    let inner = type_name(interner.get(typeid)).to_owned();
    let s = format!("{TYPE_PREFIX}[{inner};{len}]");
    interner.insert(&s)
}

/// General (unnamed) tuple typeid `(;T1,T2,...)` from member typeids.
pub fn form_tuple_id(interner: &mut Interner, typeids: &[Atom]) -> Atom {
    let mut s = String::from(TYPE_PREFIX);
    s.push_str("(;");
    for (i, tid) in typeids.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(type_name(interner.get(*tid)));
    }
    s.push(')');
    interner.insert(&s)
}

/// Scope-keyed cache key for the `(scope, typeid)` type cache.
pub fn form_symtable_type_id(interner: &mut Interner, scope: ScopeId, typeid: Atom) -> Atom {
    let s = format!("s:{}${}", scope.0, interner.get(typeid));
    interner.insert(&s)
}

/// Typeid carrying an embedded `typeof(expr)` hole; the unwinder
/// resolves the node through the expression-inference callback.
pub fn form_expr_typeof_id(interner: &mut Interner, node: NodeId) -> Atom {
    let s = format!("{TYPE_PREFIX}{TYPEOF_PREFIX}{}", node.0);
    interner.insert(&s)
}

/// Strip the `t:` prefix from a typeid's text, yielding the bare
/// canonical name. Text without the prefix passes through unchanged.
#[must_use]
pub fn type_name(id_text: &str) -> &str {
    id_text.strip_prefix(TYPE_PREFIX).unwrap_or(id_text)
}

/// Parse a `+:`-prefixed typeof hole back into the node it refers to.
#[must_use]
pub fn typeof_hole_node(name: &str) -> Option<(NodeId, usize)> {
    let rest = name.strip_prefix(TYPEOF_PREFIX)?;
    let digits: &str = rest
        .split_once(|c: char| !c.is_ascii_digit())
        .map_or(rest, |(d, _)| d);
    let id: u32 = digits.parse().ok()?;
    Some((NodeId(id), TYPEOF_PREFIX.len() + digits.len()))
}
