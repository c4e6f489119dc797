use ca_ast::node::{ExprOp, IdKind, NodeKind};
use ca_ast::NodeArena;
use ca_common::ids::ScopeId;
use ca_common::interner::Interner;
use ca_common::sloc::{Sloc, Span};

#[test]
fn nodes_keep_scope_and_span() {
    let mut interner = Interner::new();
    let mut arena = NodeArena::new();
    let name = interner.insert("x");
    let span = Span::new(Sloc::new(2, 4), Sloc::new(2, 5));
    let id = arena.alloc(
        NodeKind::Id {
            name,
            id_kind: IdKind::VarUse,
        },
        ScopeId(3),
        span,
    );
    let node = arena.get(id);
    assert_eq!(node.scope, ScopeId(3));
    assert_eq!(node.span, span);
    assert!(node.entry.is_none());
}

#[test]
fn expr_nodes_hold_operands() {
    let mut interner = Interner::new();
    let mut arena = NodeArena::new();
    let scope = ScopeId::GLOBAL;
    let span = Span::default();
    let a = arena.alloc(
        NodeKind::Id {
            name: interner.insert("a"),
            id_kind: IdKind::VarUse,
        },
        scope,
        span,
    );
    let b = arena.alloc(
        NodeKind::Id {
            name: interner.insert("b"),
            id_kind: IdKind::VarUse,
        },
        scope,
        span,
    );
    let add = arena.alloc(
        NodeKind::Expr {
            op: ExprOp::Add,
            operands: vec![a, b],
            expr_type: None,
        },
        scope,
        span,
    );
    match &arena.get(add).kind {
        NodeKind::Expr { op, operands, expr_type } => {
            assert_eq!(*op, ExprOp::Add);
            assert_eq!(operands, &vec![a, b]);
            assert!(expr_type.is_none());
        }
        other => panic!("expected expr node, found {other:?}"),
    }
}
