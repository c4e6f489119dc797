//! Struct impl tables.
//!
//! Every datatype entry carries its "runables": methods implemented
//! directly on the struct, methods implemented through trait impls,
//! and — for inherited trait default methods — the association overlay
//! to install while emitting the shared trait body.

use crate::scope::ScopeAssoc;
use ca_common::ids::SymbolId;
use ca_common::interner::Atom;
use indexmap::IndexMap;

/// One resolved method implementation.
#[derive(Clone, Debug)]
pub struct MethodImpl {
    pub fnname: Atom,
    pub mangled: Atom,
    /// the function symbol registered in pass 1
    pub entry: SymbolId,
}

/// Result of a method lookup that may be ambiguous across traits.
pub enum MethodLookup<'a> {
    NotFound,
    Found(&'a MethodImpl),
    /// resolved in more than one trait: (trait name, impl) candidates
    Ambiguous(Vec<(Atom, &'a MethodImpl)>),
}

/// Per-datatype impl tables. Iteration order is declaration order so
/// ambiguity diagnostics list candidates deterministically.
#[derive(Clone, Debug, Default)]
pub struct Runables {
    pub methods_in_struct: IndexMap<Atom, MethodImpl>,
    pub methods_in_traits: IndexMap<Atom, IndexMap<Atom, MethodImpl>>,
    /// trait → (method → overlay) for inherited default methods
    pub assoc_by_trait: IndexMap<Atom, IndexMap<Atom, ScopeAssoc>>,
}

impl Runables {
    /// Register a method under the struct or under a trait impl.
    pub fn add_entry(&mut self, trait_name: Option<Atom>, info: MethodImpl) {
        match trait_name {
            None => {
                self.methods_in_struct.insert(info.fnname, info);
            }
            Some(t) => {
                self.methods_in_traits
                    .entry(t)
                    .or_default()
                    .insert(info.fnname, info);
            }
        }
    }

    /// Record the `Self`-binding overlay of an inherited default method.
    pub fn add_entry_assoc(&mut self, trait_name: Atom, fnname: Atom, assoc: ScopeAssoc) {
        self.assoc_by_trait
            .entry(trait_name)
            .or_default()
            .insert(fnname, assoc);
    }

    /// Look up `fnname`, preferring the struct's own methods, then the
    /// trait impls. With a trait constraint the search is exact;
    /// without one, a hit in several traits is ambiguous.
    #[must_use]
    pub fn find_entry(&self, fnname: Atom, trait_name: Option<Atom>) -> MethodLookup<'_> {
        if trait_name.is_none()
            && let Some(info) = self.methods_in_struct.get(&fnname)
        {
            return MethodLookup::Found(info);
        }

        let mut candidates = Vec::new();
        for (&tname, methods) in &self.methods_in_traits {
            if let Some(info) = methods.get(&fnname) {
                if trait_name == Some(tname) {
                    return MethodLookup::Found(info);
                }
                candidates.push((tname, info));
            }
        }

        match candidates.len() {
            0 => MethodLookup::NotFound,
            1 => MethodLookup::Found(candidates[0].1),
            _ => MethodLookup::Ambiguous(candidates),
        }
    }

    #[must_use]
    pub fn is_method_in_struct(&self, fnname: Atom) -> bool {
        self.methods_in_struct.contains_key(&fnname)
    }

    /// The overlay matching `fnname`, honoring the same
    /// exact-trait/ambiguity rules as `find_entry`.
    #[must_use]
    pub fn find_entry_assoc(&self, fnname: Atom, trait_name: Option<Atom>) -> Option<&ScopeAssoc> {
        let mut found = None;
        for (&tname, methods) in &self.assoc_by_trait {
            if let Some(assoc) = methods.get(&fnname) {
                if trait_name == Some(tname) {
                    return Some(assoc);
                }
                if found.is_none() {
                    found = Some(assoc);
                }
            }
        }
        found
    }
}
