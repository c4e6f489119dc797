//! Fixed-cap argument lists.
//!
//! Formal parameter lists, struct member lists and tuple member lists
//! all share one shape: up to `MAX_ARGS` entries plus the scope that
//! owns the entries' symbols. Function and struct lists carry names
//! (the types live on the symbols); general tuple lists carry typeids
//! by position.

use ca_common::ids::ScopeId;
use ca_common::interner::Atom;
use ca_common::limits::MAX_ARGS;
use smallvec::SmallVec;

/// Whether the list holds names or positional typeids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgListKind {
    /// argument / member names, symbol-backed
    Names(SmallVec<[Atom; MAX_ARGS]>),
    /// positional typeids of a general tuple
    Types(SmallVec<[Atom; MAX_ARGS]>),
}

#[derive(Clone, Debug)]
pub struct ArgList {
    pub kind: ArgListKind,
    /// trailing `...` variadic marker
    pub contain_varg: bool,
    /// the scope owning the entries' symbols
    pub scope: ScopeId,
}

impl ArgList {
    #[must_use]
    pub fn names(scope: ScopeId) -> Self {
        ArgList {
            kind: ArgListKind::Names(SmallVec::new()),
            contain_varg: false,
            scope,
        }
    }

    #[must_use]
    pub fn types(scope: ScopeId) -> Self {
        ArgList {
            kind: ArgListKind::Types(SmallVec::new()),
            contain_varg: false,
            scope,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.kind {
            ArgListKind::Names(v) | ArgListKind::Types(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a name entry; `false` when the list is full or the list
    /// is a positional type list.
    pub fn push_name(&mut self, name: Atom) -> bool {
        match &mut self.kind {
            ArgListKind::Names(v) if v.len() < MAX_ARGS => {
                v.push(name);
                true
            }
            _ => false,
        }
    }

    /// Append a positional typeid; `false` when full or name-kinded.
    pub fn push_type(&mut self, typeid: Atom) -> bool {
        match &mut self.kind {
            ArgListKind::Types(v) if v.len() < MAX_ARGS => {
                v.push(typeid);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn names_slice(&self) -> &[Atom] {
        match &self.kind {
            ArgListKind::Names(v) => v,
            ArgListKind::Types(_) => &[],
        }
    }

    #[must_use]
    pub fn types_slice(&self) -> &[Atom] {
        match &self.kind {
            ArgListKind::Types(v) => v,
            ArgListKind::Names(_) => &[],
        }
    }
}
