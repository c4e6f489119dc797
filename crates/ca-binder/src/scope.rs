//! The scope arena.
//!
//! Scopes form a tree of name → symbol maps with parent links. A scope
//! may carry an association overlay: lookups for ids in the overlay's
//! id-set are redirected to the overlay's scope before the normal
//! parent-chain walk. Overlays compose trait default-method scopes
//! with struct-impl scopes and bind `Self` during trait and generic
//! instantiation.

use crate::symbol::{Symbol, SymbolKind, VarShielding};
use ca_common::ids::{ScopeId, SymbolId};
use ca_common::interner::Atom;
use ca_common::sloc::Sloc;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Overlay kinds; only generic/trait aliasing exists today.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssocKind {
    Generic,
}

/// Association overlay: lookups of ids in `id_set` resolve inside
/// `assoc_table` instead of the scope that carries the overlay.
#[derive(Clone, Debug)]
pub struct ScopeAssoc {
    pub kind: AssocKind,
    pub assoc_table: ScopeId,
    pub id_set: FxHashSet<Atom>,
}

impl ScopeAssoc {
    #[must_use]
    pub fn new(kind: AssocKind, assoc_table: ScopeId) -> Self {
        ScopeAssoc {
            kind,
            assoc_table,
            id_set: FxHashSet::default(),
        }
    }

    pub fn add_item(&mut self, id: Atom) {
        self.id_set.insert(id);
    }

    #[must_use]
    pub fn covers(&self, id: Atom) -> bool {
        self.kind == AssocKind::Generic && self.id_set.contains(&id)
    }
}

/// One lexical symbol table.
#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    entries: FxHashMap<Atom, SymbolId>,
    pub assoc: Option<ScopeAssoc>,
}

/// Explicit lookup parameters for overlay-aware resolution.
pub struct SymbolQuery<'a> {
    pub scope: ScopeId,
    pub idx: Atom,
    pub parent: bool,
    /// optional overlay threaded by the caller (stored per-impl in the
    /// runables table rather than mutated onto scopes)
    pub assoc: Option<&'a ScopeAssoc>,
}

/// Arena of scopes and their symbols.
#[derive(Default, Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeArena {
    /// Create the arena with the global scope at `ScopeId::GLOBAL`.
    #[must_use]
    pub fn new() -> Self {
        let mut arena = ScopeArena::default();
        arena.scopes.push(Scope::default());
        arena
    }

    pub fn push_new(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            entries: FxHashMap::default(),
            assoc: None,
        });
        id
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// The parent scope, or the global scope for roots.
    #[must_use]
    pub fn parent_or_global(&self, id: ScopeId) -> ScopeId {
        self.scope(id).parent.unwrap_or(ScopeId::GLOBAL)
    }

    /// Whether `sub` is `root` or nested somewhere below it.
    #[must_use]
    pub fn is_sub_scope(&self, sub: ScopeId, root: ScopeId) -> bool {
        let mut cur = Some(sub);
        while let Some(s) = cur {
            if s == root {
                return true;
            }
            cur = self.scope(s).parent;
        }
        false
    }

    /// Insert without checking for an existing entry; the previous
    /// binding of the name in this scope, if any, is shadowed.
    pub fn insert(&mut self, scope: ScopeId, name: Atom, loc: Sloc, kind: SymbolKind) -> SymbolId {
        let sym = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol { name, loc, kind });
        self.scopes[scope.index()].entries.insert(name, sym);
        sym
    }

    /// Idempotent insert: an existing entry under `name` is returned
    /// untouched.
    pub fn check_insert(
        &mut self,
        scope: ScopeId,
        name: Atom,
        loc: Sloc,
        kind: SymbolKind,
    ) -> SymbolId {
        if let Some(&sym) = self.scopes[scope.index()].entries.get(&name) {
            return sym;
        }
        self.insert(scope, name, loc, kind)
    }

    /// Re-binding insert for variables: when the name already holds a
    /// variable in this scope, the prior binding is pushed onto its
    /// shielding ring instead of being replaced.
    pub fn insert_shielded_var(
        &mut self,
        scope: ScopeId,
        name: Atom,
        loc: Sloc,
        var: crate::symbol::CaVariable,
    ) -> SymbolId {
        if let Some(&sym) = self.scopes[scope.index()].entries.get(&name)
            && let SymbolKind::Variable(shield) = &mut self.symbols[sym.index()].kind
        {
            shield.rebind(var);
            return sym;
        }
        self.insert(scope, name, loc, SymbolKind::Variable(VarShielding::new(var)))
    }

    /// The scope lookups for `idx` should start in, honoring the
    /// overlay attached to `scope`.
    #[must_use]
    pub fn get_with_assoc(&self, scope: ScopeId, idx: Atom) -> ScopeId {
        match &self.scope(scope).assoc {
            Some(assoc) if assoc.covers(idx) => assoc.assoc_table,
            _ => scope,
        }
    }

    /// Plain lookup; `parent` walks the chain.
    #[must_use]
    pub fn getsym(&self, scope: ScopeId, name: Atom, parent: bool) -> Option<SymbolId> {
        self.getsym_with_scope(scope, name, parent).map(|(s, _)| s)
    }

    /// Lookup returning the owning scope too.
    ///
    /// Overlays are honored at every level of the walk: a scope whose
    /// overlay covers `name` redirects that step of the search into
    /// the overlay's scope.
    #[must_use]
    pub fn getsym_with_scope(
        &self,
        scope: ScopeId,
        name: Atom,
        parent: bool,
    ) -> Option<(SymbolId, ScopeId)> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let probe = self.get_with_assoc(s, name);
            if probe != s {
                // redirected: the walk proceeds from the overlay scope
                let mut o = Some(probe);
                while let Some(os) = o {
                    if let Some(&sym) = self.scope(os).entries.get(&name) {
                        return Some((sym, os));
                    }
                    o = self.scope(os).parent;
                }
            } else if let Some(&sym) = self.scope(s).entries.get(&name) {
                return Some((sym, s));
            }
            if !parent {
                return None;
            }
            cur = self.scope(s).parent;
        }
        None
    }

    /// Overlay-aware lookup with an explicitly threaded overlay: the
    /// overlay's scope is consulted for covered ids before the normal
    /// walk from `query.scope`.
    #[must_use]
    pub fn getsym_st2(&self, query: &SymbolQuery<'_>) -> Option<SymbolId> {
        self.getsym_st2_with_scope(query).map(|(s, _)| s)
    }

    #[must_use]
    pub fn getsym_st2_with_scope(
        &self,
        query: &SymbolQuery<'_>,
    ) -> Option<(SymbolId, ScopeId)> {
        if let Some(assoc) = query.assoc
            && assoc.covers(query.idx)
        {
            trace!(idx = query.idx.0, "overlay redirect");
            if let Some(hit) = self.getsym_with_scope(assoc.assoc_table, query.idx, true) {
                return Some(hit);
            }
        }
        self.getsym_with_scope(query.scope, query.idx, query.parent)
    }

    /// Find the datatype entry a bare type name resolves to.
    #[must_use]
    pub fn get_type_entry(
        &self,
        scope: ScopeId,
        typeid: Atom,
        parent: bool,
    ) -> Option<(SymbolId, ScopeId)> {
        let (sym, owner) = self.getsym_with_scope(scope, typeid, parent)?;
        match self.symbol(sym).kind {
            SymbolKind::DataType(_) => Some((sym, owner)),
            _ => None,
        }
    }

    /// Every symbol in the arena, for whole-compilation invariants.
    pub fn symbols_iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    #[must_use]
    pub fn scope_len(&self, scope: ScopeId) -> usize {
        self.scope(scope).entries.len()
    }
}
