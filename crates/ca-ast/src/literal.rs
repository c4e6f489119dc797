//! Literal containers.
//!
//! A literal keeps its lexeme text interned so type inference can
//! re-parse it against the chosen target type (hex/octal/binary
//! prefixes, negative forms). `fixed_type` flips once inference or
//! determination has resolved `datatype`.

use ca_common::ids::{NodeId, TypeId};
use ca_common::interner::Atom;
use ca_common::sloc::Span;

/// Token kind of the literal lexeme.
///
/// `I64` is the signed-shaped integer text (carries a leading `-`),
/// `U64` the unsigned-shaped one; `I8`/`U8` are the two char forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LitKind {
    I64,
    U64,
    F64,
    Bool,
    I8,
    U8,
    CString,
    Array,
    Struct,
    Pointer,
}

/// Literal payload.
#[derive(Clone, Debug)]
pub enum LitValue {
    None,
    I64(i64),
    F64(f64),
    /// interned text plus byte length (text may contain NULs)
    Str {
        text: Atom,
        len: u32,
    },
    /// nested element literals of an array literal
    Array(Vec<CaLiteral>),
    /// nested field literals of a struct literal
    Struct(Vec<CaLiteral>),
    /// nested element expressions (when elements are not literals)
    Exprs(Vec<NodeId>),
}

/// A literal with its inference state.
#[derive(Clone, Debug)]
pub struct CaLiteral {
    /// true once `datatype` is resolved (postfix or inference)
    pub fixed_type: bool,
    pub kind: LitKind,
    /// postfix type token text (`u32` in `33u32`), when present
    pub postfix: Option<Atom>,
    /// the lexeme, interned
    pub text: Atom,
    /// resolved typeid (`t:...`), when determined
    pub datatype: Option<Atom>,
    /// resolved canonical type, for non-primitive literals
    pub catype: Option<TypeId>,
    pub span: Span,
    pub value: LitValue,
}

impl CaLiteral {
    #[must_use]
    pub fn new(kind: LitKind, text: Atom, span: Span) -> Self {
        CaLiteral {
            fixed_type: false,
            kind,
            postfix: None,
            text,
            datatype: None,
            catype: None,
            span,
            value: LitValue::None,
        }
    }

    /// The nested literals of an array literal.
    #[must_use]
    pub fn array_elems(&self) -> Option<&[CaLiteral]> {
        match &self.value {
            LitValue::Array(elems) => Some(elems),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> i64 {
        match self.value {
            LitValue::I64(v) => v,
            LitValue::F64(v) => v as i64,
            _ => 0,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self.value {
            LitValue::F64(v) => v,
            LitValue::I64(v) => v as f64,
            _ => 0.0,
        }
    }
}
