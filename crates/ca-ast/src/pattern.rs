//! `let`-binding patterns.

use ca_common::interner::Atom;
use ca_common::sloc::Sloc;

/// Pattern variants of a `let` binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternKind {
    /// plain variable binding
    Var,
    /// `[p1, p2, ...]`
    Array,
    /// `Name(p1, p2, ...)` named tuple
    Tuple,
    /// `(p1, p2, ...)` general tuple
    GenTuple,
    /// `Name { f1: p1, ... }`
    Struct,
    /// `_`
    IgnoreOne,
    /// `..`; absorbs a positional gap, at most once per list
    IgnoreRange,
}

/// A pattern tree node.
#[derive(Clone, Debug)]
pub struct CaPattern {
    pub kind: PatternKind,
    /// struct name, tuple name or variable name
    pub name: Atom,
    /// explicit type annotation (`let p: T = ...`), when present
    pub datatype: Option<Atom>,
    /// field selector used by the parent to locate this child:
    /// an interned name for struct fields, a position for tuples
    pub fieldname: Option<FieldSel>,
    /// additional names aliasing the same value (`a @ b @ ...`)
    pub morebind: Vec<Atom>,
    pub loc: Sloc,
    pub items: Vec<CaPattern>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSel {
    Named(Atom),
    Pos(u32),
}

impl CaPattern {
    #[must_use]
    pub fn var(name: Atom, loc: Sloc) -> Self {
        CaPattern {
            kind: PatternKind::Var,
            name,
            datatype: None,
            fieldname: None,
            morebind: Vec::new(),
            loc,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn new(kind: PatternKind, name: Atom, items: Vec<CaPattern>, loc: Sloc) -> Self {
        CaPattern {
            kind,
            name,
            datatype: None,
            fieldname: None,
            morebind: Vec::new(),
            loc,
            items,
        }
    }

    /// Position of the `..` item, when the pattern list has one.
    #[must_use]
    pub fn ignore_range_pos(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|p| p.kind == PatternKind::IgnoreRange)
    }

    /// Walk every variable name bound by this pattern (morebinds
    /// included), in source order.
    pub fn for_each_binding(&self, f: &mut impl FnMut(Atom)) {
        match self.kind {
            PatternKind::Var => {
                f(self.name);
                for &m in &self.morebind {
                    f(m);
                }
            }
            PatternKind::IgnoreOne | PatternKind::IgnoreRange => {}
            _ => {
                for &m in &self.morebind {
                    f(m);
                }
                for item in &self.items {
                    item.for_each_binding(f);
                }
            }
        }
    }
}
