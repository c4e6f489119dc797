//! Type-name unwinding.
//!
//! Unwinding converts a source-level type name (`AA` where
//! `type AA = *[*BB;3]; type BB = *i32`) into its canonical structural
//! signature (`*[**i32;3]`), building the `CaType` graph along the
//! way. The walker dispatches on the leading character of the name at
//! each step and carries two pieces of environment:
//!
//! - `prenamemap`: struct names already seen on the current branch,
//!   mapped to their partially built types, to close cycles;
//! - `rcheckset`: names whose size is currently being computed, to
//!   reject unbounded recursive types. Pointer and reference layers
//!   reset it because an indirection bounds the size.
//!
//! Size sentinels: `-1` means unbounded, `-2` means "depends on an
//! enclosing computation" (a recursive reference that an outer pointer
//! layer must bound).

use crate::arena::TypeArena;
use crate::types::{
    AllocPos, CaArray, CaPointer, CaStruct, CaStructField, CaStructKind, CaType, CaTypePayload,
    CaTypeStatus, TypeTok,
};
use ca_binder::scope::ScopeArena;
use ca_binder::symbol::DataTypeKind;
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{ScopeId, TypeId};
use ca_common::interner::{Atom, Interner};
use ca_common::names;
use ca_common::sloc::Sloc;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Result of unwinding one typeid.
pub struct Unwound {
    /// interned canonical `t:...` signature
    pub signature: Atom,
    /// computed size (may be a sentinel for recursive shapes)
    pub size: i64,
    pub datatype: TypeId,
}

type PreNameMap = FxHashMap<String, Option<TypeId>>;
type RCheckSet = FxHashSet<String>;

struct Unwinder<'a> {
    arena: &'a mut TypeArena,
    interner: &'a mut Interner,
    scopes: &'a ScopeArena,
}

fn uerr<T>(message: impl Into<String>) -> CaResult<T> {
    Err(Diagnostic::error(Sloc::synthetic(), message).into())
}

/// Unwind `typeid` in `scope` into its canonical signature and type.
pub fn unwind_type_signature(
    arena: &mut TypeArena,
    interner: &mut Interner,
    scopes: &ScopeArena,
    scope: ScopeId,
    typeid: Atom,
) -> CaResult<Unwound> {
    let caname = names::type_name(interner.get(typeid)).to_owned();
    trace!(name = %caname, "unwinding type name");

    let mut uw = Unwinder {
        arena,
        interner,
        scopes,
    };
    let prenamemap = PreNameMap::default();
    let rcheckset = RCheckSet::default();
    let mut sig = String::new();
    let (consumed, size, datatype) =
        uw.unwind_inner(scope, &caname, &prenamemap, &rcheckset, &mut sig)?;
    if consumed != caname.len() {
        return uerr(format!(
            "type contains extra text when unwinding type `{caname}`"
        ));
    }

    let signature = names::form_type_id_by_str(uw.interner, &sig);
    let ty = uw.arena.get_mut(datatype);
    if ty.status != CaTypeStatus::Orig {
        ty.signature = signature;
    }
    Ok(Unwound {
        signature,
        size,
        datatype,
    })
}

impl Unwinder<'_> {
    /// Returns `(consumed, size, type)`; the canonical text this call
    /// produced is appended to `sig`.
    fn unwind_inner(
        &mut self,
        scope: ScopeId,
        text: &str,
        prenamemap: &PreNameMap,
        rcheckset: &RCheckSet,
        sig: &mut String,
    ) -> CaResult<(usize, i64, TypeId)> {
        let sig_start = sig.len();
        let first = match text.chars().next() {
            Some(c) => c,
            None => return uerr("empty type name"),
        };

        let result = match first {
            '*' | '&' => {
                // pointer / reference chain; an indirection bounds the
                // size, so the recursion check restarts below it
                let run = text.chars().take_while(|&c| c == first).count();
                for _ in 0..run {
                    sig.push(first);
                }
                let fresh = RCheckSet::default();
                let (consumed, _inner_size, inner) =
                    self.unwind_inner(scope, &text[run..], prenamemap, &fresh, sig)?;
                let dt = self.alloc_unset(
                    TypeTok::Pointer,
                    8,
                    CaTypePayload::Pointer(CaPointer {
                        kernel: inner,
                        dimension: run as u32,
                        allocpos: AllocPos::Stack,
                    }),
                );
                Ok((run + consumed, 8, dt))
            }
            '[' => self.unwind_array(scope, text, prenamemap, rcheckset, sig),
            '{' => self.unwind_struct(scope, text, prenamemap, rcheckset, sig, CaStructKind::NamedStruct),
            '(' => self.unwind_struct(scope, text, prenamemap, rcheckset, sig, CaStructKind::NamedTuple),
            '<' => self.unwind_struct(scope, text, prenamemap, rcheckset, sig, CaStructKind::General),
            '#' => uerr("not implemented for the `enum` unwinding"),
            '+' => uerr("(internal) unresolved typeof hole in type name"),
            c if c.is_ascii_alphabetic() || c == '_' => {
                self.unwind_name(scope, text, prenamemap, rcheckset, sig)
            }
            c => uerr(format!("unwind type name `{text}` failed at `{c}`")),
        }?;

        // each call stamps the signature of the node it produced with
        // the canonical text it generated; outer calls overwrite inner
        // stamps of shared nodes, the last (outermost) writer wins
        let (_, _, dt) = result;
        if self.arena.get(dt).status != CaTypeStatus::Orig {
            let local = sig[sig_start..].to_owned();
            self.arena.get_mut(dt).signature =
                names::form_type_id_by_str(self.interner, &local);
        }
        Ok(result)
    }

    fn alloc_unset(&mut self, tok: TypeTok, size: i64, payload: CaTypePayload) -> TypeId {
        self.arena.alloc(CaType {
            tok,
            formal_name: Atom::NONE,
            size,
            signature: Atom::NONE,
            status: CaTypeStatus::None,
            payload,
        })
    }

    fn unwind_array(
        &mut self,
        scope: ScopeId,
        text: &str,
        prenamemap: &PreNameMap,
        rcheckset: &RCheckSet,
        sig: &mut String,
    ) -> CaResult<(usize, i64, TypeId)> {
        let mut i = 1;
        sig.push('[');
        let (consumed, elem_size, elem) =
            self.unwind_inner(scope, &text[i..], prenamemap, rcheckset, sig)?;
        i += consumed;

        if !text[i..].starts_with(';') {
            return uerr(format!(
                "(internal) ';' is expected but found `{}`",
                &text[i..]
            ));
        }
        sig.push(';');
        i += 1;

        let digits: String = text[i..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return uerr("(internal) numeric value expected but not found");
        }
        sig.push_str(&digits);
        i += digits.len();
        let len: u64 = digits
            .parse()
            .map_err(|_| Diagnostic::error(Sloc::synthetic(), "bad array length"))?;

        if !text[i..].starts_with(']') {
            return uerr(format!(
                "(internal) ']' is expected but found `{}`",
                &text[i..]
            ));
        }
        sig.push(']');
        i += 1;

        let size = if elem_size < 0 {
            elem_size
        } else {
            elem_size * len as i64
        };
        let dt = self.alloc_unset(
            TypeTok::Array,
            size,
            CaTypePayload::Array(CaArray {
                elem,
                dimension: 1,
                dims: smallvec::smallvec![len],
            }),
        );
        Ok((i, size, dt))
    }

    fn unwind_struct(
        &mut self,
        scope: ScopeId,
        text: &str,
        prenamemap: &PreNameMap,
        rcheckset: &RCheckSet,
        sig: &mut String,
        kind_hint: CaStructKind,
    ) -> CaResult<(usize, i64, TypeId)> {
        let mut kind = kind_hint;
        let mut i = 1;
        sig.push(text.as_bytes()[0] as char);

        let mut name = parse_ident(&text[i..]);
        i += name.len();
        sig.push_str(&name);

        if kind == CaStructKind::General {
            kind = match name.as_str() {
                "slice" => CaStructKind::Slice,
                "union" => return uerr("not implemented for the `union` unwinding"),
                "enum" => return uerr("not implemented for the `enum` unwinding"),
                "" => return uerr("(internal) general struct has no form name"),
                other => {
                    return uerr(format!("not implemented for the unknown `{other}` unwinding"));
                }
            };
            if !text[i..].starts_with(';') {
                return uerr(format!("(internal) bad `{name}` form: `;` expected"));
            }
            sig.push(';');
            i += 1;
            name = parse_ident(&text[i..]);
            i += name.len();
            sig.push_str(&name);
        }

        if name.is_empty() {
            match kind {
                CaStructKind::NamedTuple => kind = CaStructKind::GeneralTuple,
                // the slice form is anonymous
                CaStructKind::Slice | CaStructKind::GeneralTuple => {}
                _ => return uerr(format!("(internal) struct form has no name: `{text}`")),
            }
        }

        let closing = match kind {
            CaStructKind::NamedStruct | CaStructKind::Union | CaStructKind::Enum => '}',
            CaStructKind::NamedTuple | CaStructKind::GeneralTuple => ')',
            _ => '>',
        };

        if !text[i..].starts_with(closing) {
            if !text[i..].starts_with(';') {
                return uerr(format!(
                    "(internal) bad format of struct style `{}`: `;` or `{closing}` expected",
                    &text[i..]
                ));
            }
            sig.push(';');
            i += 1;
        }

        let mut pmap = prenamemap.clone();
        let mut cset = rcheckset.clone();
        if kind.is_named() {
            cset.insert(name.clone());
        }

        let name_atom = if kind.is_named() {
            self.interner.insert(&name)
        } else {
            Atom::NONE
        };
        let tok = if kind == CaStructKind::Slice {
            TypeTok::Slice
        } else {
            TypeTok::Struct
        };
        let ph = self.alloc_unset(
            tok,
            -2,
            CaTypePayload::Struct(CaStruct {
                kind,
                name: name_atom,
                fields: Vec::new(),
                max_align: 1,
                packed: false,
            }),
        );
        if kind.is_named() {
            pmap.insert(name.clone(), Some(ph));
        }

        let mut sum = 0i64;
        let mut size_error = false;
        let mut calcing = false;
        while !text[i..].starts_with(closing) {
            let mut field_name = Atom::NONE;
            if kind.has_named_fields() {
                let fname = parse_ident(&text[i..]);
                if fname.is_empty() {
                    return uerr(format!(
                        "(internal) struct member has no name: `{}`",
                        &text[i..]
                    ));
                }
                sig.push_str(&fname);
                i += fname.len();
                if !text[i..].starts_with(':') {
                    return uerr(format!(
                        "(internal) bad format of struct `{}`: `:` expected",
                        &text[i..]
                    ));
                }
                sig.push(':');
                i += 1;
                field_name = self.interner.insert(&fname);
            }

            let (consumed, tsize, fdt) =
                self.unwind_inner(scope, &text[i..], &pmap, &cset, sig)?;
            i += consumed;

            if text[i..].starts_with(',') {
                sig.push(',');
                i += 1;
            }

            match tsize {
                -1 => size_error = true,
                -2 => calcing = true,
                s => sum += s,
            }

            if let CaTypePayload::Struct(s) = &mut self.arena.get_mut(ph).payload {
                s.fields.push(CaStructField {
                    name: field_name,
                    offset: 0,
                    ty: fdt,
                });
            }
        }

        sig.push(closing);
        i += 1;

        let size = if size_error {
            -1
        } else if calcing {
            -2
        } else {
            sum
        };
        self.arena.get_mut(ph).size = size;
        Ok((i, size, ph))
    }

    fn unwind_name(
        &mut self,
        scope: ScopeId,
        text: &str,
        prenamemap: &PreNameMap,
        rcheckset: &RCheckSet,
        sig: &mut String,
    ) -> CaResult<(usize, i64, TypeId)> {
        let ident = parse_ident(text);
        if ident.is_empty() {
            return uerr(format!("unwind type name `{text}` failed"));
        }
        let ident_len = ident.len();

        let typeid = names::form_type_id_by_str(self.interner, &ident);
        if let Some(prim) = self.arena.get_primitive_by_name(typeid) {
            sig.push_str(&ident);
            return Ok((ident_len, self.arena.get(prim).size, prim));
        }

        let Some((sym, _owner)) = self.scopes.get_type_entry(scope, typeid, true) else {
            return uerr(format!("cannot find data type '{ident}'"));
        };

        if rcheckset.contains(&ident) {
            // a recursively defined type reached through value
            // composition has unbounded size
            return uerr(format!("type name `{ident}` is recursively defined"));
        }

        if let Some(placeholder) = prenamemap.get(&ident) {
            sig.push_str(&ident);
            let Some(ph) = placeholder else {
                return uerr(format!("type `{ident}` should recursive defining"));
            };
            // the enclosing computation determines the size
            return Ok((ident_len, -2, *ph));
        }

        let entry = self
            .scopes
            .symbol(sym)
            .datatype()
            .expect("type entry is a datatype")
            .clone();

        match entry.members {
            None => {
                // a plain alias: chase it in its defining scope
                let mut pmap = prenamemap.clone();
                pmap.insert(ident.clone(), None);
                let mut cset = rcheckset.clone();
                cset.insert(ident.clone());
                let target = names::type_name(self.interner.get(entry.id)).to_owned();
                let (consumed, size, dt) =
                    self.unwind_inner(entry.idtable, &target, &pmap, &cset, sig)?;
                if consumed != target.len() {
                    return uerr(format!(
                        "(internal) type contains extra text when unwinding type `{target}`"
                    ));
                }
                Ok((ident_len, size, dt))
            }
            Some(members) => {
                // a struct definition: emit its body inline
                let kind = match entry.kind {
                    DataTypeKind::NamedStruct => CaStructKind::NamedStruct,
                    DataTypeKind::NamedTuple => CaStructKind::NamedTuple,
                };
                let name_atom = self.interner.insert(&ident);
                let ph = self.alloc_unset(
                    TypeTok::Struct,
                    -2,
                    CaTypePayload::Struct(CaStruct {
                        kind,
                        name: name_atom,
                        fields: Vec::new(),
                        max_align: 1,
                        packed: false,
                    }),
                );

                let mut pmap = prenamemap.clone();
                pmap.insert(ident.clone(), Some(ph));
                let mut cset = rcheckset.clone();
                cset.insert(ident.clone());

                sig.push(if kind == CaStructKind::NamedTuple { '(' } else { '{' });
                sig.push_str(&ident);
                if !members.is_empty() {
                    sig.push(';');
                }

                let mut sum = 0i64;
                let mut size_error = false;
                let mut calcing = false;

                let count = members.len();
                for j in 0..count {
                    let (field_name, member_typeid) = match kind {
                        CaStructKind::NamedTuple => (Atom::NONE, members.types_slice()[j]),
                        _ => {
                            let mname = members.names_slice()[j];
                            let msym = self
                                .scopes
                                .getsym(members.scope, mname, false)
                                .ok_or_else(|| {
                                    Diagnostic::error(
                                        Sloc::synthetic(),
                                        format!(
                                            "(internal) cannot find member `{}`",
                                            self.interner.get(mname)
                                        ),
                                    )
                                })?;
                            let var = self.scopes.symbol(msym).variable().ok_or_else(|| {
                                Diagnostic::error(
                                    Sloc::synthetic(),
                                    format!(
                                        "(internal) symbol is not a struct member: `{}`",
                                        self.interner.get(mname)
                                    ),
                                )
                            })?;
                            let mtype = var.datatype.ok_or_else(|| {
                                Diagnostic::error(
                                    Sloc::synthetic(),
                                    format!(
                                        "struct member `{}` has no type",
                                        self.interner.get(mname)
                                    ),
                                )
                            })?;
                            sig.push_str(self.interner.get(mname));
                            sig.push(':');
                            (mname, mtype)
                        }
                    };

                    let mtext = names::type_name(self.interner.get(member_typeid)).to_owned();
                    let (_consumed, tsize, fdt) =
                        self.unwind_inner(members.scope, &mtext, &pmap, &cset, sig)?;

                    if j + 1 < count {
                        sig.push(',');
                    }

                    match tsize {
                        -1 => size_error = true,
                        -2 => calcing = true,
                        s => sum += s,
                    }

                    if let CaTypePayload::Struct(s) = &mut self.arena.get_mut(ph).payload {
                        s.fields.push(CaStructField {
                            name: field_name,
                            offset: 0,
                            ty: fdt,
                        });
                    }
                }

                sig.push(if kind == CaStructKind::NamedTuple { ')' } else { '}' });

                let size = if size_error {
                    -1
                } else if calcing {
                    -2
                } else {
                    sum
                };
                self.arena.get_mut(ph).size = size;
                Ok((ident_len, size, ph))
            }
        }
    }
}

fn parse_ident(text: &str) -> String {
    text.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
