//! Canonical type descriptors.

use ca_ast::node::RangeKind;
use ca_common::ids::TypeId;
use ca_common::interner::Atom;
use ca_common::limits::MAX_DIM;
use smallvec::SmallVec;

/// Token kind of a type: the primitives plus the composite tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTok {
    Void,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Pointer,
    Array,
    Struct,
    Slice,
    Range,
    CString,
}

impl TypeTok {
    pub const PRIMITIVES: [TypeTok; 12] = [
        TypeTok::Void,
        TypeTok::I8,
        TypeTok::I16,
        TypeTok::I32,
        TypeTok::I64,
        TypeTok::U8,
        TypeTok::U16,
        TypeTok::U32,
        TypeTok::U64,
        TypeTok::F32,
        TypeTok::F64,
        TypeTok::Bool,
    ];

    /// The canonical source-level name of a primitive token.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TypeTok::Void => "void",
            TypeTok::I8 => "i8",
            TypeTok::I16 => "i16",
            TypeTok::I32 => "i32",
            TypeTok::I64 => "i64",
            TypeTok::U8 => "u8",
            TypeTok::U16 => "u16",
            TypeTok::U32 => "u32",
            TypeTok::U64 => "u64",
            TypeTok::F32 => "f32",
            TypeTok::F64 => "f64",
            TypeTok::Bool => "bool",
            TypeTok::Pointer => "pointer",
            TypeTok::Array => "array",
            TypeTok::Struct => "struct",
            TypeTok::Slice => "slice",
            TypeTok::Range => "range",
            TypeTok::CString => "cstring",
        }
    }

    #[must_use]
    pub fn from_primitive_name(name: &str) -> Option<TypeTok> {
        TypeTok::PRIMITIVES.into_iter().find(|t| t.name() == name)
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, TypeTok::I8 | TypeTok::I16 | TypeTok::I32 | TypeTok::I64)
    }

    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, TypeTok::U8 | TypeTok::U16 | TypeTok::U32 | TypeTok::U64)
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned() || matches!(self, TypeTok::Bool)
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, TypeTok::F32 | TypeTok::F64)
    }

    /// Byte size of a primitive; pointers are 8 bytes.
    #[must_use]
    pub const fn prim_size(self) -> u64 {
        match self {
            TypeTok::Void => 0,
            TypeTok::I8 | TypeTok::U8 | TypeTok::Bool => 1,
            TypeTok::I16 | TypeTok::U16 => 2,
            TypeTok::I32 | TypeTok::U32 | TypeTok::F32 => 4,
            _ => 8,
        }
    }

    /// Bit width of integer/float primitives for backend types.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            TypeTok::Bool => 1,
            TypeTok::I8 | TypeTok::U8 => 8,
            TypeTok::I16 | TypeTok::U16 => 16,
            TypeTok::I32 | TypeTok::U32 | TypeTok::F32 => 32,
            _ => 64,
        }
    }
}

/// Canonicalization state of a `CaType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaTypeStatus {
    /// not normalized
    None,
    /// primitive, nothing to normalize
    Orig,
    /// normalized by expanding (all dimensions 1)
    Expand,
    /// normalized by compacting
    Compact,
}

/// Where a pointer's pointee lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocPos {
    Stack,
    Heap,
}

#[derive(Clone, Debug)]
pub struct CaPointer {
    pub kernel: TypeId,
    /// number of pointer layers; 1 after expansion
    pub dimension: u32,
    pub allocpos: AllocPos,
}

#[derive(Clone, Debug)]
pub struct CaArray {
    pub elem: TypeId,
    /// number of array layers; 1 after expansion
    pub dimension: u32,
    /// per-layer lengths
    pub dims: SmallVec<[u64; MAX_DIM]>,
}

/// Struct classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaStructKind {
    NamedStruct,
    NamedTuple,
    GeneralTuple,
    Slice,
    Union,
    Enum,
    /// undetermined general form, refined during unwinding
    General,
}

impl CaStructKind {
    #[must_use]
    pub const fn is_tuple(self) -> bool {
        matches!(self, CaStructKind::NamedTuple | CaStructKind::GeneralTuple)
    }

    #[must_use]
    pub const fn is_named(self) -> bool {
        matches!(
            self,
            CaStructKind::NamedStruct
                | CaStructKind::NamedTuple
                | CaStructKind::Union
                | CaStructKind::Enum
        )
    }

    #[must_use]
    pub const fn has_named_fields(self) -> bool {
        matches!(self, CaStructKind::NamedStruct | CaStructKind::Union)
    }

    #[must_use]
    pub const fn is_general(self) -> bool {
        matches!(
            self,
            CaStructKind::Slice | CaStructKind::Union | CaStructKind::Enum
        )
    }
}

#[derive(Clone, Debug)]
pub struct CaStructField {
    /// `Atom::NONE` for tuple fields
    pub name: Atom,
    pub offset: u64,
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct CaStruct {
    pub kind: CaStructKind,
    pub name: Atom,
    pub fields: Vec<CaStructField>,
    pub max_align: u64,
    pub packed: bool,
}

impl CaStruct {
    #[must_use]
    pub fn field_pos(&self, name: Atom) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct CaRange {
    pub kind: RangeKind,
    pub inclusive: bool,
    pub start: Option<TypeId>,
    pub end: Option<TypeId>,
    /// the 2-field general tuple carrying `(start, end)` when both
    /// ends exist; a single element type for the one-ended forms
    pub packaged: Option<TypeId>,
}

/// Per-variant payload of a `CaType`.
#[derive(Clone, Debug)]
pub enum CaTypePayload {
    Primitive,
    Pointer(CaPointer),
    Array(CaArray),
    Struct(CaStruct),
    Range(CaRange),
}

/// A canonical type descriptor.
#[derive(Clone, Debug)]
pub struct CaType {
    pub tok: TypeTok,
    /// interned formal name
    pub formal_name: Atom,
    /// byte size; `-1` unbounded-recursive, `-2` still being computed
    pub size: i64,
    /// canonical `t:...` signature
    pub signature: Atom,
    pub status: CaTypeStatus,
    pub payload: CaTypePayload,
}

impl CaType {
    #[must_use]
    pub fn pointer(&self) -> Option<&CaPointer> {
        match &self.payload {
            CaTypePayload::Pointer(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn array(&self) -> Option<&CaArray> {
        match &self.payload {
            CaTypePayload::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn strukt(&self) -> Option<&CaStruct> {
        match &self.payload {
            CaTypePayload::Struct(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn range(&self) -> Option<&CaRange> {
        match &self.payload {
            CaTypePayload::Range(r) => Some(r),
            _ => None,
        }
    }

    /// Aggregate types need slot-based copies rather than plain
    /// load/store.
    #[must_use]
    pub fn is_complex(&self) -> bool {
        matches!(self.tok, TypeTok::Array | TypeTok::Struct | TypeTok::Slice)
    }
}
