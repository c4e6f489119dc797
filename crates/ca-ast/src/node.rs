//! AST node variants.
//!
//! Every node records the scope it was parsed in, its source span, an
//! optional resolved-symbol fast path, and a per-variant payload. The
//! variant set covers expressions, statements, functions, type and
//! trait definitions, and the handful of left-value helper forms the
//! grammar produces for assignment targets.

use crate::arglist::ArgList;
use crate::literal::CaLiteral;
use crate::pattern::CaPattern;
use ca_common::ids::{NodeId, ScopeId, SymbolId};
use ca_common::interner::Atom;
use ca_common::sloc::Span;

/// What role an identifier node plays at its use site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdKind {
    VarDef,
    VarAssign,
    VarUse,
    FnName,
    TypeName,
}

/// Grammar-context tag transferred from the parser into the walk
/// routines; only statement-expressions need one today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrammarContext {
    #[default]
    None,
    StmtExpr,
}

/// Operator of an `Expr` node. Operand-less constructs (`as`,
/// `sizeof`) are separate node variants because they carry type
/// payloads rather than child nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    /// `&&`, short-circuited
    LogicAnd,
    /// `||`, short-circuited
    LogicOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    /// unary `-`
    Minus,
    /// `!`: logical not on bool, bitwise not on integers
    Not,
    /// function call or named-tuple construction: `[name, arglist]`
    FnCall,
    /// actual-argument list carrier
    ArgListActual,
    /// general tuple construction: `[arglist]`
    Tuple,
    /// struct construction: `[structexpr]`
    Struct,
    /// array construction: `[arraydef]`
    Array,
    /// array element read: `[arrayitem-right]`
    ArrayItem,
    /// struct field read / method receiver: `[structfieldop-right]`
    StructItem,
    /// pointer dereference: `[expr]`
    Deref,
    /// address-of: `[expr]`
    Address,
    /// boxed heap allocation: `[expr]`
    Box,
    /// range construction: `[range]`
    Range,
    /// statement-expression block: `[stmtlist, expr]`
    StmtExpr,
    /// if-expression: `[if]`
    IfExpr,
}

impl ExprOp {
    /// Operators whose result is a value (used when reducing a
    /// statement expression group to its type).
    #[must_use]
    pub const fn is_valued(self) -> bool {
        !matches!(self, ExprOp::ArgListActual)
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            ExprOp::Lt | ExprOp::Gt | ExprOp::Le | ExprOp::Ge | ExprOp::Eq | ExprOp::Ne
        )
    }

    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, ExprOp::Shl | ExprOp::Shr)
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, ExprOp::LogicAnd | ExprOp::LogicOr)
    }
}

/// Range grammar forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeKind {
    /// `..`
    Full,
    /// `a..=b`
    Inclusive,
    /// `..=b`
    InclusiveTo,
    /// `a..b`
    RightExclusive,
    /// `..b`
    RightExclusiveTo,
    /// `a..`
    From,
}

/// `__zero_init__` vs `__noinit__` variable initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarInitKind {
    /// zero-fill the slot
    Zero,
    /// leave the memory as allocated
    NoInit,
}

/// The loop variable of a `for` statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForVar {
    pub kind: ForVarKind,
    pub name: Atom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForVarKind {
    /// iterate by value
    Value,
    /// `*v`: iterate by element pointer
    Pointer,
    /// `&v`: reserved reference form; same layout as pointer
    Reference,
}

/// Field selector of a struct-field operation: named for structs,
/// positional for tuples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldName {
    Named(Atom),
    Tuple(u32),
}

/// Which type (and optionally which trait) an `impl` block is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeImplInfo {
    pub class_name: Atom,
    pub trait_name: Option<Atom>,
}

/// A tagged AST node.
#[derive(Clone, Debug)]
pub struct AstNode {
    pub kind: NodeKind,
    /// The symbol table of the enclosing scope.
    pub scope: ScopeId,
    /// Resolved symbol fast path, filled on first successful lookup.
    pub entry: Option<SymbolId>,
    pub span: Span,
    pub grammar: GrammarContext,
}

impl AstNode {
    #[must_use]
    pub fn new(kind: NodeKind, scope: ScopeId, span: Span) -> Self {
        AstNode {
            kind,
            scope,
            entry: None,
            span,
            grammar: GrammarContext::None,
        }
    }
}

/// Per-variant payloads.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Empty,
    Literal(CaLiteral),
    Id {
        name: Atom,
        id_kind: IdKind,
    },
    Label {
        name: Atom,
    },
    LabelGoto {
        name: Atom,
    },
    Expr {
        op: ExprOp,
        operands: Vec<NodeId>,
        /// inferred/intended typeid, cached once known
        expr_type: Option<Atom>,
    },
    /// `expr as T`
    As {
        expr: NodeId,
        typeid: Atom,
    },
    /// `sizeof(T)`
    SizeOf {
        typeid: Atom,
    },
    FnDecl {
        name: Atom,
        ret: Atom,
        args: ArgList,
        is_extern: bool,
        generic_types: Vec<Atom>,
    },
    FnDef {
        decl: NodeId,
        body: NodeId,
    },
    /// `impl T { ... }` / `impl Tr for T { ... }`
    FnDefImpl {
        impl_info: TypeImplInfo,
        items: Vec<NodeId>,
    },
    /// `trait Tr { ... }` function list
    TraitFn {
        trait_name: Atom,
        items: Vec<NodeId>,
    },
    /// struct / tuple-struct type definition site
    Struct {
        name: Atom,
    },
    TypeDef {
        newname: Atom,
        typeid: Atom,
    },
    LetBind {
        pattern: Box<CaPattern>,
        expr: NodeId,
        /// top-level bindings become backend globals
        global: bool,
    },
    Assign {
        lhs: NodeId,
        /// compound assignment operator (`a += e`), when present
        op: Option<ExprOp>,
        expr: NodeId,
    },
    Ret {
        expr: Option<NodeId>,
    },
    DbgPrint {
        expr: NodeId,
    },
    DbgPrintType {
        typeid: Atom,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    Loop {
        body: NodeId,
    },
    For {
        var: ForVar,
        list: NodeId,
        body: NodeId,
    },
    Break,
    Continue,
    If {
        is_expr: bool,
        conds: Vec<NodeId>,
        bodies: Vec<NodeId>,
        else_body: Option<NodeId>,
    },
    LexicalBody {
        stmts: NodeId,
        /// set when this body is also a function body
        fn_buddy: Option<NodeId>,
    },
    StmtList {
        stmts: Vec<NodeId>,
    },
    /// actual argument list of a call or tuple construction
    ArgList {
        exprs: Vec<NodeId>,
    },
    /// array construction expression `[a, b, c]` / `[e; N]`
    ArrayDef {
        elems: Vec<NodeId>,
        /// repeat count for the `[e; N]` form
        repeat: Option<u64>,
    },
    /// `*..*lhs = ...` target
    DerefLeft {
        deref_count: u32,
        expr: NodeId,
    },
    ArrayItemLeft {
        array: NodeId,
        indices: Vec<NodeId>,
    },
    ArrayItemRight {
        array: NodeId,
        indices: Vec<NodeId>,
    },
    StructFieldOpLeft {
        expr: NodeId,
        field: FieldName,
        /// `.` when true, `->` when false
        direct: bool,
    },
    StructFieldOpRight {
        expr: NodeId,
        field: FieldName,
        direct: bool,
    },
    /// struct construction expression `S { a: 1, b: 2 }` / `S(1, 2)`
    StructExpr {
        name: Atom,
        fields: Vec<(Option<Atom>, NodeId)>,
        named: bool,
    },
    Box {
        expr: NodeId,
    },
    Drop {
        name: Atom,
    },
    Range {
        kind: RangeKind,
        inclusive: bool,
        start: Option<NodeId>,
        end: Option<NodeId>,
    },
    /// `a::b::c(...)` call path
    Domain {
        relative: bool,
        parts: Vec<Atom>,
    },
    /// `<AA as TT>::method`
    DomainAs {
        main: Vec<Atom>,
        trait_path: Vec<Atom>,
        fnname: Atom,
    },
    VarDefZeroValue {
        init: VarInitKind,
    },
}
