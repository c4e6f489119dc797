//! Flat AST node storage.

use crate::node::{AstNode, NodeKind};
use ca_common::ids::{NodeId, ScopeId, SymbolId};
use ca_common::sloc::Span;

/// Arena of AST nodes addressed by `NodeId`.
#[derive(Default, Debug)]
pub struct NodeArena {
    nodes: Vec<AstNode>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, scope: ScopeId, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode::new(kind, scope, span));
        id
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.index()]
    }

    /// Record the resolved symbol fast path on a node.
    pub fn set_entry(&mut self, id: NodeId, entry: SymbolId) {
        self.nodes[id.index()].entry = Some(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The program: top-level nodes in source order plus the root scope.
pub struct RootTree {
    pub nodes: Vec<NodeId>,
    pub root_scope: ScopeId,
    /// span of the whole program
    pub prog_span: Span,
    /// span covered by statements that fold into the synthesized `main`
    pub main_span: Span,
}

impl RootTree {
    #[must_use]
    pub fn new(root_scope: ScopeId) -> Self {
        RootTree {
            nodes: Vec::new(),
            root_scope,
            prog_span: Span::default(),
            main_span: Span::default(),
        }
    }

    pub fn push(&mut self, node: NodeId, span: Span) {
        self.nodes.push(node);
        self.prog_span = if self.nodes.len() == 1 {
            span
        } else {
            self.prog_span.merge(span)
        };
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.nodes.len()
    }
}
