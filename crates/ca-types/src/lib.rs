//! The CA type system.
//!
//! Types are canonicalized descriptors (`CaType`) living in a
//! `TypeArena` keyed by their signature string. The public entry point
//! is [`TypeArena::get_by_name`]: given a scope and a typeid (the
//! interned handle of a `t:...` string) it unwinds the name into its
//! canonical signature, materializes a unique `CaType`, formalizes it
//! (pointer/array chains flattened to dimension 1, struct layout
//! computed with natural alignment) and caches it twice - by
//! `(scope, typeid)` and by canonical signature.
//!
//! Also here: literal inference and determination, the `as` cast
//! table, range and slice type constructors, and structural signature
//! comparison.

pub mod arena;
pub mod cast;
pub mod layout;
pub mod literal;
pub mod range;
pub mod signature;
pub mod types;
pub mod unwind;

pub use arena::TypeArena;
pub use cast::{as_type_convertible, cast_op, CastOp};
pub use types::{
    AllocPos, CaArray, CaPointer, CaRange, CaStruct, CaStructField, CaStructKind, CaType,
    CaTypePayload, CaTypeStatus, TypeTok,
};
