//! Symbol entries.

use crate::runables::Runables;
use ca_ast::arglist::ArgList;
use ca_ast::node::TypeImplInfo;
use ca_backend::ValueRef;
use ca_common::ids::{NodeId, ScopeId};
use ca_common::interner::Atom;
use ca_common::sloc::Sloc;
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

bitflags! {
    /// What kind of function a symbol names; several bits can be set
    /// (a generic method is `METHOD | GENERIC`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FuncKind: u8 {
        const FUNCTION         = 1 << 0;
        const METHOD           = 1 << 1;
        const METHOD_FOR_TRAIT = 1 << 2;
        const METHOD_IN_TRAIT  = 1 << 3;
        const GENERIC          = 1 << 4;
    }
}

/// One variable binding.
#[derive(Clone, Debug)]
pub struct CaVariable {
    pub name: Atom,
    /// typeid, once known
    pub datatype: Option<Atom>,
    pub loc: Sloc,
    pub global: bool,
    /// backend slot or value handle, filled during emission
    pub value: Option<ValueRef>,
}

impl CaVariable {
    #[must_use]
    pub fn new(name: Atom, datatype: Option<Atom>, loc: Sloc) -> Self {
        CaVariable {
            name,
            datatype,
            loc,
            global: false,
            value: None,
        }
    }
}

/// Re-binding support: `current` is the active binding, the deque
/// holds the other bindings of the same surface name in ring order.
///
/// The ring is rotated forward at the start of each semantic pass over
/// a `let`, and backward when the right-hand side must see the
/// previous binding (`let a = a;`).
#[derive(Clone, Debug)]
pub struct VarShielding {
    pub current: CaVariable,
    pub ring: VecDeque<CaVariable>,
}

impl VarShielding {
    #[must_use]
    pub fn new(var: CaVariable) -> Self {
        VarShielding {
            current: var,
            ring: VecDeque::new(),
        }
    }

    /// Install a new binding, pushing the previous one onto the ring.
    pub fn rebind(&mut self, var: CaVariable) {
        let prev = std::mem::replace(&mut self.current, var);
        self.ring.push_back(prev);
    }

    /// Rotate the ring: forward moves `current` to the back and pulls
    /// the front; backward is the inverse.
    pub fn rotate(&mut self, back: bool) {
        if self.ring.is_empty() {
            return;
        }
        if back {
            self.ring.push_front(self.current.clone());
            self.current = self.ring.pop_back().expect("non-empty ring");
        } else {
            self.ring.push_back(self.current.clone());
            self.current = self.ring.pop_front().expect("non-empty ring");
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.ring.len()
    }
}

/// Function signature data shared by declarations and definitions.
#[derive(Clone, Debug)]
pub struct FnSig {
    pub args: ArgList,
    pub rettype: Atom,
    /// mangled function label, set in pass 1
    pub mangled_id: Option<Atom>,
    pub kind: FuncKind,
    pub generic_types: Vec<Atom>,
}

/// Minimal struct-kind distinction kept on the symbol entry; the full
/// struct classification lives on the canonical type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataTypeKind {
    NamedStruct,
    NamedTuple,
}

/// A `type`/`struct` definition entry.
#[derive(Clone, Debug)]
pub struct DataTypeEntry {
    pub kind: DataTypeKind,
    /// the typeid this name stands for
    pub id: Atom,
    /// struct members, absent for plain aliases
    pub members: Option<ArgList>,
    /// the scope the definition names resolve in
    pub idtable: ScopeId,
    /// struct impl tables
    pub runables: Runables,
}

/// A trait definition entry.
#[derive(Clone, Debug)]
pub struct TraitDefEntry {
    /// the `TraitFn` AST node
    pub node: NodeId,
    /// trait item name → prototype-or-default AST node
    pub fnnodes: FxHashMap<Atom, NodeId>,
    /// items carrying a default body
    pub ids_with_def: Vec<Atom>,
    /// items without a default body
    pub ids_no_def: Vec<Atom>,
}

/// Tagged symbol payload.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    Variable(VarShielding),
    Label,
    /// forward-declared by a `goto` and not yet defined
    LabelHanging,
    FnDecl(FnSig),
    FnDef(FnSig),
    DataType(DataTypeEntry),
    TraitDef(TraitDefEntry),
    TraitImpl(TypeImplInfo),
}

/// A symbol table entry.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Atom,
    pub loc: Sloc,
    pub kind: SymbolKind,
}

impl Symbol {
    /// The active variable binding, when this symbol is a variable.
    #[must_use]
    pub fn variable(&self) -> Option<&CaVariable> {
        match &self.kind {
            SymbolKind::Variable(shield) => Some(&shield.current),
            _ => None,
        }
    }

    pub fn variable_mut(&mut self) -> Option<&mut CaVariable> {
        match &mut self.kind {
            SymbolKind::Variable(shield) => Some(&mut shield.current),
            _ => None,
        }
    }

    #[must_use]
    pub fn shielding(&self) -> Option<&VarShielding> {
        match &self.kind {
            SymbolKind::Variable(shield) => Some(shield),
            _ => None,
        }
    }

    pub fn shielding_mut(&mut self) -> Option<&mut VarShielding> {
        match &mut self.kind {
            SymbolKind::Variable(shield) => Some(shield),
            _ => None,
        }
    }

    #[must_use]
    pub fn fn_sig(&self) -> Option<&FnSig> {
        match &self.kind {
            SymbolKind::FnDecl(sig) | SymbolKind::FnDef(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn fn_sig_mut(&mut self) -> Option<&mut FnSig> {
        match &mut self.kind {
            SymbolKind::FnDecl(sig) | SymbolKind::FnDef(sig) => Some(sig),
            _ => None,
        }
    }

    #[must_use]
    pub fn datatype(&self) -> Option<&DataTypeEntry> {
        match &self.kind {
            SymbolKind::DataType(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn datatype_mut(&mut self) -> Option<&mut DataTypeEntry> {
        match &mut self.kind {
            SymbolKind::DataType(dt) => Some(dt),
            _ => None,
        }
    }
}
