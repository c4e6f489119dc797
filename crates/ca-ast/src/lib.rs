//! AST data model for the CA compiler.
//!
//! This crate provides:
//! - `AstNode` / `NodeKind` - tagged node variants with per-variant payloads
//! - `NodeArena` - flat node storage addressed by `NodeId`
//! - `CaLiteral` - literal containers (primitive, string, array, struct)
//! - `CaPattern` - `let`-binding patterns
//! - `ArgList` - fixed-cap formal/member argument lists
//! - `RootTree` - the linked list of top-level nodes the driver walks
//!
//! Nodes are built by the external parser through the constructor API
//! in the lowering crate; this crate is pure data.

pub mod arena;
pub mod arglist;
pub mod literal;
pub mod node;
pub mod pattern;

pub use arena::{NodeArena, RootTree};
pub use arglist::{ArgList, ArgListKind};
pub use literal::{CaLiteral, LitKind, LitValue};
pub use node::{
    AstNode, ExprOp, FieldName, ForVar, ForVarKind, GrammarContext, IdKind, NodeKind,
    RangeKind, TypeImplInfo, VarInitKind,
};
pub use pattern::{CaPattern, PatternKind};
