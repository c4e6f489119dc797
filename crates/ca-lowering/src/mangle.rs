//! Function-name mangling and redeclaration checking.
//!
//! Top-level free functions keep their plain source name. Nested
//! functions get the `_CA$` prefix, an `L<id>` component per enclosing
//! block and an `F` per enclosing function, followed by
//! `<len><name>` components for each function ancestor and the
//! function itself. Struct methods prefix `SF`, trait-for-struct
//! methods `TSF` with the trait and struct names length-encoded before
//! the method name.

use crate::context::CompilerContext;
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{ScopeId, SymbolId};
use ca_common::interner::Atom;
use ca_common::names;

pub const MANGLED_NAME_PREFIX: &str = "_CA$";

/// One level of the lexical nesting the emitter tracks for mangling.
#[derive(Clone, Copy, Debug)]
pub enum LexicalKind {
    Global,
    Block(u32),
    Function(Atom),
}

#[derive(Clone, Copy, Debug)]
pub struct LexicalScope {
    pub kind: LexicalKind,
    pub scope: ScopeId,
}

impl LexicalScope {
    #[must_use]
    pub fn global(scope: ScopeId) -> Self {
        LexicalScope {
            kind: LexicalKind::Global,
            scope,
        }
    }

    #[must_use]
    pub fn block(id: u32, scope: ScopeId) -> Self {
        LexicalScope {
            kind: LexicalKind::Block(id),
            scope,
        }
    }

    #[must_use]
    pub fn function(name: Atom, scope: ScopeId) -> Self {
        LexicalScope {
            kind: LexicalKind::Function(name),
            scope,
        }
    }
}

fn push_len_name(out: &mut String, name: &str) {
    out.push_str(&name.len().to_string());
    out.push_str(name);
}

/// Mangle a free (possibly nested) function name against the lexical
/// stack prefix `stack[1..]`.
pub fn mangle_function_name(
    ctx: &CompilerContext,
    stack: &[LexicalScope],
    fnname: Atom,
) -> String {
    let local = ctx.interner.get(fnname);
    if stack.len() <= 1 {
        return local.to_string();
    }

    let mut out = String::from(MANGLED_NAME_PREFIX);
    // first pass: structure prefix
    for ls in &stack[1..] {
        match ls.kind {
            LexicalKind::Block(id) => {
                out.push('L');
                out.push_str(&id.to_string());
            }
            LexicalKind::Function(_) => out.push('F'),
            LexicalKind::Global => {}
        }
    }
    out.push('F');
    // second pass: name components
    for ls in &stack[1..] {
        if let LexicalKind::Function(name) = ls.kind {
            push_len_name(&mut out, ctx.interner.get(name));
        }
    }
    push_len_name(&mut out, local);
    out
}

/// Mangle a struct method (`SF`) or trait-for-struct method (`TSF`).
pub fn mangle_method_name(
    ctx: &CompilerContext,
    stack: &[LexicalScope],
    fnname: Atom,
    class_name: Atom,
    trait_name: Option<Atom>,
) -> String {
    let mut out = String::from(MANGLED_NAME_PREFIX);
    for ls in &stack[1..] {
        match ls.kind {
            LexicalKind::Block(id) => {
                out.push('L');
                out.push_str(&id.to_string());
            }
            LexicalKind::Function(_) => out.push('F'),
            LexicalKind::Global => {}
        }
    }
    if trait_name.is_some() {
        out.push('T');
    }
    out.push_str("SF");
    for ls in &stack[1..] {
        if let LexicalKind::Function(name) = ls.kind {
            push_len_name(&mut out, ctx.interner.get(name));
        }
    }
    if let Some(t) = trait_name {
        push_len_name(&mut out, ctx.interner.get(t));
    }
    push_len_name(&mut out, ctx.interner.get(class_name));
    push_len_name(&mut out, ctx.interner.get(fnname));
    out
}

/// Verify a redeclaration against the first prototype registered under
/// the same mangled id: parameter types and return type must agree.
/// Works over the declaration nodes so it applies even when the two
/// declarations share one symbol-table entry.
pub fn post_check_fn_proto(
    ctx: &mut CompilerContext,
    prev_decl: ca_common::ids::NodeId,
    curr_decl: ca_common::ids::NodeId,
) -> CaResult<()> {
    use ca_ast::node::NodeKind;
    let NodeKind::FnDecl { name, ret: prev_ret_id, args: prev_args, .. } =
        ctx.nodes.get(prev_decl).kind.clone()
    else {
        return Ok(());
    };
    let NodeKind::FnDecl { ret: curr_ret_id, args: curr_args, .. } =
        ctx.nodes.get(curr_decl).kind.clone()
    else {
        return Ok(());
    };

    let prev_loc = ctx.nodes.get(prev_decl).span.beg;
    let fname = ctx.interner.get(name).to_owned();

    let prev_names = prev_args.names_slice().to_vec();
    let curr_names = curr_args.names_slice().to_vec();
    if prev_names.len() != curr_names.len() {
        return Err(Diagnostic::error(
            prev_loc,
            format!("function '{fname}' parameter count not identical"),
        )
        .into());
    }

    for (i, (&pn, &cn)) in prev_names.iter().zip(curr_names.iter()).enumerate() {
        let prev_ty = param_catype(ctx, prev_args.scope, pn)?;
        let curr_ty = param_catype(ctx, curr_args.scope, cn)?;
        if !ctx.types.check_identical(prev_ty, curr_ty) {
            return Err(Diagnostic::error(
                prev_loc,
                format!(
                    "function '{fname}' parameter {} type not identical, `{}` != `{}` see: line {}, col {}.",
                    i,
                    ctx.sig_text(prev_ty),
                    ctx.sig_text(curr_ty),
                    prev_loc.row,
                    prev_loc.col
                ),
            )
            .into());
        }
    }

    let prev_ret = ctx.get_type(prev_args.scope, prev_ret_id)?;
    let curr_ret = ctx.get_type(curr_args.scope, curr_ret_id)?;
    if !ctx.types.check_identical(prev_ret, curr_ret) {
        return Err(Diagnostic::error(
            prev_loc,
            format!(
                "function '{fname}' return type not identical, see: line {}, col {}.",
                prev_loc.row, prev_loc.col
            ),
        )
        .into());
    }
    Ok(())
}

/// Resolve a parameter's canonical type, rotating its shielding ring
/// forward so the declaration-time binding is read, and back after.
fn param_catype(
    ctx: &mut CompilerContext,
    scope: ScopeId,
    name: Atom,
) -> CaResult<ca_common::ids::TypeId> {
    let sym = ctx.scopes.getsym(scope, name, false).ok_or_else(|| {
        Diagnostic::error(
            ca_common::sloc::Sloc::synthetic(),
            format!(
                "function internal error: cannot find parameter `{}`",
                ctx.interner.get(name)
            ),
        )
    })?;

    if let Some(shield) = ctx.scopes.symbol_mut(sym).shielding_mut() {
        shield.rotate(false);
    }
    let typeid = ctx
        .scopes
        .symbol(sym)
        .variable()
        .and_then(|v| v.datatype)
        .ok_or_else(|| {
            Diagnostic::error(
                ca_common::sloc::Sloc::synthetic(),
                format!("parameter `{}` has no type", ctx.interner.get(name)),
            )
        })?;
    let result = ctx.get_type(scope, typeid);
    if let Some(shield) = ctx.scopes.symbol_mut(sym).shielding_mut() {
        shield.rotate(true);
    }
    result
}

/// Strip the struct-impl prefix from a method id
/// (`f:Class::fn` / `f:Class::<Trait>::fn` → `fn`).
#[must_use]
pub fn method_local_name(id_text: &str) -> &str {
    let bare = id_text
        .strip_prefix(names::FUNCTION_PREFIX)
        .unwrap_or(id_text);
    bare.rsplit("::").next().unwrap_or(bare)
}
