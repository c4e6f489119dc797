//! The compiler context.
//!
//! All process-wide state lives here and is threaded explicitly:
//! the interner, the AST node arena, the scope arena, the type arena,
//! driver options and (optionally) the source text for diagnostics.

use crate::infer;
use crate::options::CompileOptions;
use ca_ast::NodeArena;
use ca_binder::scope::ScopeArena;
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, ScopeId, TypeId};
use ca_common::interner::{Atom, Interner};
use ca_common::names;
use ca_common::sloc::Sloc;
use ca_common::source_info::SourceInfo;
use ca_types::TypeArena;

#[derive(Debug)]
pub struct CompilerContext {
    pub interner: Interner,
    pub nodes: NodeArena,
    pub scopes: ScopeArena,
    pub types: TypeArena,
    pub options: CompileOptions,
    pub source: Option<SourceInfo>,
}

impl CompilerContext {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        let mut interner = Interner::new();
        let types = TypeArena::new(&mut interner);
        CompilerContext {
            interner,
            nodes: NodeArena::new(),
            scopes: ScopeArena::new(),
            types,
            options,
            source: None,
        }
    }

    /// Intern shorthand.
    pub fn name(&mut self, s: &str) -> Atom {
        self.interner.insert(s)
    }

    /// Resolve a typeid to its canonical type, resolving any embedded
    /// `typeof(expr)` holes through expression inference first.
    pub fn get_type(&mut self, scope: ScopeId, typeid: Atom) -> CaResult<TypeId> {
        let typeid = self.resolve_typeof_holes(scope, typeid)?;
        self.types
            .get_by_name(&mut self.interner, &self.scopes, scope, typeid)
    }

    /// Resolve with a node's location attached to failures.
    pub fn get_type_at(&mut self, scope: ScopeId, typeid: Atom, loc: Sloc) -> CaResult<TypeId> {
        self.get_type(scope, typeid).map_err(|e| {
            let name = names::type_name(self.interner.get(typeid)).to_owned();
            Diagnostic::error(loc, format!("cannot find data type '{name}'"))
                .with_note(None, e.to_string())
                .into()
        })
    }

    /// Replace every `+:<node>` hole in a type name by the inferred
    /// type of the referenced expression.
    fn resolve_typeof_holes(&mut self, scope: ScopeId, typeid: Atom) -> CaResult<Atom> {
        let text = self.interner.get(typeid).to_owned();
        if !text.contains(names::TYPEOF_PREFIX) {
            return Ok(typeid);
        }

        let mut out = String::new();
        let mut rest = text.as_str();
        while let Some(pos) = rest.find(names::TYPEOF_PREFIX) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            let Some((node, consumed)) = names::typeof_hole_node(tail) else {
                return Err(Diagnostic::error(
                    Sloc::synthetic(),
                    format!("(internal) malformed typeof hole in `{text}`"),
                )
                .into());
            };
            let inferred = infer::inference_expr_type(self, node)?;
            out.push_str(names::type_name(self.interner.get(inferred)));
            rest = &tail[consumed..];
        }
        out.push_str(rest);
        let _ = scope;
        Ok(self.interner.insert(&out))
    }

    /// The bare canonical name of a typeid (`t:` stripped), owned.
    #[must_use]
    pub fn type_name_of(&self, typeid: Atom) -> String {
        names::type_name(self.interner.get(typeid)).to_owned()
    }

    /// The signature text of a canonical type, owned.
    #[must_use]
    pub fn sig_text(&self, ty: TypeId) -> String {
        self.type_name_of(self.types.get(ty).signature)
    }

    /// The span of a node, for diagnostics.
    #[must_use]
    pub fn span_of(&self, node: NodeId) -> ca_common::sloc::Span {
        self.nodes.get(node).span
    }
}
