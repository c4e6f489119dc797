//! Common types and utilities for the CA compiler.
//!
//! This crate provides foundational types used across all ca crates:
//! - String interning (`Atom`, `Interner`)
//! - Interned-name forming helpers (`t:`/`l:`/`f:` prefixed ids)
//! - Shared id handles (`NodeId`, `ScopeId`, `SymbolId`)
//! - Source locations (`Sloc`, `Span`)
//! - Diagnostics (`Diagnostic`, `CaResult`)
//! - Source text snippets for error messages
//! - Compiler limits and thresholds

// String interning for identifier and signature deduplication
pub mod interner;
pub use interner::{Atom, Interner};

// Id handles - shared newtypes to break circular dependencies
pub mod ids;
pub use ids::{NodeId, ScopeId, SymbolId, TypeId};

// Interned-name forming helpers (type/label/function id forms)
pub mod names;

// Source locations (line/column)
pub mod sloc;
pub use sloc::{Sloc, Span};

// Diagnostics - errors as values, never process exits
pub mod diagnostics;
pub use diagnostics::{CaError, CaResult, Diagnostic};

// Source text access for diagnostic snippets
pub mod source_info;
pub use source_info::SourceInfo;

// Centralized limits and thresholds
pub mod limits;
