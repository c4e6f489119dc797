//! Name binder for the CA compiler.
//!
//! This crate provides:
//! - `ScopeArena` - the tree of scoped symbol tables with parent links
//! - `ScopeAssoc` - the association overlay redirecting a set of ids
//!   to an alternate scope (`Self`, generic parameters)
//! - `Symbol` / `SymbolKind` - tagged symbol entries
//! - `VarShielding` - per-variable stack of prior bindings for nested
//!   re-binding (`let a = a;`)
//! - `Runables` - per-datatype impl tables for methods and traits

pub mod runables;
pub mod scope;
pub mod symbol;

pub use runables::{MethodImpl, Runables};
pub use scope::{AssocKind, Scope, ScopeArena, ScopeAssoc, SymbolQuery};
pub use symbol::{
    CaVariable, DataTypeEntry, DataTypeKind, FnSig, FuncKind, Symbol, SymbolKind, TraitDefEntry,
    VarShielding,
};
