//! Shared id handles.
//!
//! These newtypes live here, below every other crate, so the AST can
//! record which scope owns a node without depending on the binder and
//! the binder can point back at AST nodes without depending on the AST
//! crate.

use serde::Serialize;

/// Handle into the AST node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into the scope arena (one per lexical symbol table).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The global (root) scope is always created first.
    pub const GLOBAL: ScopeId = ScopeId(0);

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into the symbol arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into the canonical type arena.
///
/// Two `TypeId`s are equal iff they denote the same canonicalized
/// type object; handle equality replaces the pointer equality of the
/// classic shared-pointer design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
