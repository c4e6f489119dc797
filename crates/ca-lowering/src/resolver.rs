//! Method, trait and domain resolution.
//!
//! Given an invocation site, answer "which function entry is being
//! called" - a free function, a named-tuple construction (same call
//! syntax), a method found through the receiver's struct, a
//! `Type::method` domain call, or a fully qualified
//! `<Type as Trait>::method`.

use crate::context::CompilerContext;
use crate::infer;
use ca_ast::node::{ExprOp, FieldName, NodeKind};
use ca_binder::runables::MethodLookup;
use ca_binder::scope::ScopeAssoc;
use ca_binder::symbol::{DataTypeKind, SymbolKind};
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, SymbolId, TypeId};
use ca_common::interner::Atom;
use ca_common::names;
use ca_types::{CaTypePayload, TypeTok};
use tracing::debug;

/// What a call site resolved to.
pub enum CallTarget {
    /// a free function (or extern prototype)
    Function { sym: SymbolId, name: Atom },
    /// named tuple construction sharing the call syntax
    TupleCtor { cls_sym: SymbolId, typeid: Atom },
    /// a method on a struct, found directly or through a trait impl
    Method {
        entry: SymbolId,
        mangled: Atom,
        cls_sym: SymbolId,
        trait_name: Option<Atom>,
        /// `Self`-binding overlay for inherited trait defaults
        assoc: Option<ScopeAssoc>,
        /// the receiver expression providing `self`, when present
        receiver: Option<NodeId>,
    },
}

fn err_at<T>(ctx: &CompilerContext, node: NodeId, msg: String) -> CaResult<T> {
    let span = ctx.span_of(node);
    Err(Diagnostic::error_range(span.beg, span.end, msg).into())
}

/// Normalize a method receiver: `.` needs a struct (or slice), `->`
/// needs a pointer to one.
pub fn receiver_struct_type(
    ctx: &CompilerContext,
    node: NodeId,
    base: TypeId,
    direct: bool,
) -> CaResult<TypeId> {
    let ty = ctx.types.get(base);
    if direct {
        match ty.tok {
            TypeTok::Struct | TypeTok::Slice => Ok(base),
            _ => err_at(
                ctx,
                node,
                format!("incorrect struct type `{}` for field operation", ctx.sig_text(base)),
            ),
        }
    } else {
        match &ty.payload {
            CaTypePayload::Pointer(p)
                if matches!(ctx.types.get(p.kernel).tok, TypeTok::Struct | TypeTok::Slice) =>
            {
                Ok(p.kernel)
            }
            _ => err_at(
                ctx,
                node,
                format!(
                    "incorrect struct pointer type `{}` for field operation",
                    ctx.sig_text(base)
                ),
            ),
        }
    }
}

/// Resolution outcome of a method search on a concrete struct.
pub struct MethodResolution {
    pub entry: SymbolId,
    pub mangled: Atom,
    pub cls_sym: SymbolId,
    pub assoc: Option<ScopeAssoc>,
}

/// Find the class (struct) entry a struct type names, searching from
/// the call site's scope.
pub fn class_entry_for_type(
    ctx: &mut CompilerContext,
    node: NodeId,
    struct_ty: TypeId,
) -> CaResult<SymbolId> {
    let name = match &ctx.types.get(struct_ty).payload {
        CaTypePayload::Struct(s) if !s.name.is_none() => s.name,
        _ => {
            return err_at(
                ctx,
                node,
                format!("type `{}` has no method table", ctx.sig_text(struct_ty)),
            );
        }
    };
    let typeid = names::form_type_id(&mut ctx.interner, name);
    let scope = ctx.nodes.get(node).scope;
    match ctx.scopes.get_type_entry(scope, typeid, true) {
        Some((sym, _)) => Ok(sym),
        None => {
            let n = ctx.interner.get(name).to_owned();
            err_at(ctx, node, format!("cannot find symbol entry for type '{n}'"))
        }
    }
}

/// Look `method` up in the class entry's impl tables, raising the
/// ambiguity diagnostic when several traits apply.
pub fn resolve_method_in_class(
    ctx: &CompilerContext,
    node: NodeId,
    cls_sym: SymbolId,
    method: Atom,
    trait_name: Option<Atom>,
) -> CaResult<MethodResolution> {
    let cls = ctx.scopes.symbol(cls_sym);
    let Some(dt) = cls.datatype() else {
        return err_at(ctx, node, "expected a data type entry".to_string());
    };

    match dt.runables.find_entry(method, trait_name) {
        MethodLookup::Found(info) => {
            let assoc = dt.runables.find_entry_assoc(method, trait_name).cloned();
            debug!(method = method.0, "method resolved");
            Ok(MethodResolution {
                entry: info.entry,
                mangled: info.mangled,
                cls_sym,
                assoc,
            })
        }
        MethodLookup::Ambiguous(candidates) => {
            let span = ctx.span_of(node);
            let mut diag = Diagnostic::error_range(
                span.beg,
                span.end,
                "multiple applicable items in scope",
            );
            let cls_name = ctx.type_name_of(dt.id);
            for (i, (tname, info)) in candidates.iter().enumerate() {
                let loc = ctx.scopes.symbol(info.entry).loc;
                diag = diag.with_note(
                    Some(loc),
                    format!(
                        "candidate #{} is defined in an impl of the trait `{}` for the type `{}`",
                        i + 1,
                        ctx.interner.get(*tname),
                        cls_name
                    ),
                );
            }
            Err(diag.into())
        }
        MethodLookup::NotFound => {
            let mname = ctx.interner.get(method).to_owned();
            let cls_name = ctx.type_name_of(dt.id);
            match trait_name {
                Some(t) => {
                    let tname = ctx.interner.get(t).to_owned();
                    err_at(
                        ctx,
                        node,
                        format!(
                            "cannot find method `{mname}` for struct `{cls_name}` on trait `{tname}`"
                        ),
                    )
                }
                None => err_at(
                    ctx,
                    node,
                    format!("cannot find method `{mname}` for struct '{cls_name}'"),
                ),
            }
        }
    }
}

/// Resolve the callee of a `FnCall` expression's name node.
pub fn resolve_call_name(ctx: &mut CompilerContext, name_node: NodeId) -> CaResult<CallTarget> {
    let kind = ctx.nodes.get(name_node).kind.clone();
    match kind {
        NodeKind::Id { name, .. } => resolve_plain_name(ctx, name_node, name),
        NodeKind::Expr { op: ExprOp::StructItem, operands, .. } => {
            let NodeKind::StructFieldOpRight { expr, field, direct } =
                ctx.nodes.get(operands[0]).kind.clone()
            else {
                return err_at(ctx, name_node, "(internal) malformed method call".to_string());
            };
            let FieldName::Named(method) = field else {
                return err_at(ctx, name_node, "method name cannot be numeric".to_string());
            };
            let base = infer::expr_catype(ctx, expr)?;
            let struct_ty = receiver_struct_type(ctx, name_node, base, direct)?;
            let cls_sym = class_entry_for_type(ctx, name_node, struct_ty)?;
            let res = resolve_method_in_class(ctx, name_node, cls_sym, method, None)?;
            Ok(CallTarget::Method {
                entry: res.entry,
                mangled: res.mangled,
                cls_sym: res.cls_sym,
                trait_name: None,
                assoc: res.assoc,
                receiver: Some(expr),
            })
        }
        NodeKind::Domain { parts, .. } => match parts.as_slice() {
            [single] => resolve_plain_name(ctx, name_node, *single),
            [class, method] => {
                let typeid = names::form_type_id(&mut ctx.interner, *class);
                let scope = ctx.nodes.get(name_node).scope;
                let Some((cls_sym, _)) = ctx.scopes.get_type_entry(scope, typeid, true) else {
                    let n = ctx.interner.get(*class).to_owned();
                    return err_at(
                        ctx,
                        name_node,
                        format!("cannot find symbol entry for type '{n}'"),
                    );
                };
                let res = resolve_method_in_class(ctx, name_node, cls_sym, *method, None)?;
                Ok(CallTarget::Method {
                    entry: res.entry,
                    mangled: res.mangled,
                    cls_sym: res.cls_sym,
                    trait_name: None,
                    assoc: res.assoc,
                    receiver: None,
                })
            }
            _ => err_at(ctx, name_node, "unsupported domain path depth".to_string()),
        },
        NodeKind::DomainAs { main, trait_path, fnname } => {
            let (Some(&class), Some(&trait_name)) = (main.last(), trait_path.last()) else {
                return err_at(ctx, name_node, "malformed qualified call".to_string());
            };
            let typeid = names::form_type_id(&mut ctx.interner, class);
            let scope = ctx.nodes.get(name_node).scope;
            let Some((cls_sym, _)) = ctx.scopes.get_type_entry(scope, typeid, true) else {
                let n = ctx.interner.get(class).to_owned();
                return err_at(
                    ctx,
                    name_node,
                    format!("cannot find symbol entry for type '{n}'"),
                );
            };
            let res = resolve_method_in_class(ctx, name_node, cls_sym, fnname, Some(trait_name))?;
            Ok(CallTarget::Method {
                entry: res.entry,
                mangled: res.mangled,
                cls_sym: res.cls_sym,
                trait_name: Some(trait_name),
                assoc: res.assoc,
                receiver: None,
            })
        }
        other => err_at(
            ctx,
            name_node,
            format!("cannot call this construct: {other:?}"),
        ),
    }
}

fn resolve_plain_name(
    ctx: &mut CompilerContext,
    node: NodeId,
    name: Atom,
) -> CaResult<CallTarget> {
    let scope = ctx.nodes.get(node).scope;
    // function and named-tuple construction share one syntax; the
    // symbol kind disambiguates
    if let Some(sym) = ctx.scopes.getsym(scope, name, true) {
        match &ctx.scopes.symbol(sym).kind {
            SymbolKind::FnDecl(_) | SymbolKind::FnDef(_) => {
                return Ok(CallTarget::Function { sym, name });
            }
            _ => {}
        }
    }
    let typeid = names::form_type_id(&mut ctx.interner, name);
    if let Some((sym, _)) = ctx.scopes.get_type_entry(scope, typeid, true) {
        let dt = ctx.scopes.symbol(sym).datatype().expect("datatype entry");
        if dt.kind == DataTypeKind::NamedTuple {
            return Ok(CallTarget::TupleCtor {
                cls_sym: sym,
                typeid,
            });
        }
    }
    let n = ctx.interner.get(name).to_owned();
    err_at(ctx, node, format!("function '{n}' not defined"))
}

/// The declared return typeid of a call target.
pub fn call_target_rettype(
    ctx: &mut CompilerContext,
    target: &CallTarget,
    node: NodeId,
) -> CaResult<Atom> {
    match target {
        CallTarget::Function { sym, .. } | CallTarget::Method { entry: sym, .. } => {
            match ctx.scopes.symbol(*sym).fn_sig() {
                Some(sig) => Ok(sig.rettype),
                None => err_at(ctx, node, "call target is not a function".to_string()),
            }
        }
        CallTarget::TupleCtor { typeid, .. } => Ok(*typeid),
    }
}
