//! Expression type inference and determination.
//!
//! `inference_expr_type` computes a type bottom-up when the context
//! provides none; `determine_expr_type` pushes a context type down
//! into an expression, fixing free literals along the way. Binary
//! operand groups are reduced together: a typed operand wins and the
//! literal side is determined against it.

use crate::context::CompilerContext;
use crate::resolver;
use ca_ast::node::{ExprOp, FieldName, NodeKind, RangeKind};
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, TypeId};
use ca_common::interner::Atom;
use ca_common::names;
use ca_common::sloc::Sloc;
use ca_types::range::catype_from_range;
use ca_types::{CaTypePayload, TypeTok};

fn err_at<T>(ctx: &CompilerContext, node: NodeId, msg: String) -> CaResult<T> {
    let span = ctx.span_of(node);
    Err(Diagnostic::error_range(span.beg, span.end, msg).into())
}

/// Whether the node is a literal that has not been fixed to a type
/// yet (and can therefore be determined freely).
pub fn is_free_literal(ctx: &CompilerContext, node: NodeId) -> bool {
    match &ctx.nodes.get(node).kind {
        NodeKind::Literal(lit) => !lit.fixed_type,
        _ => false,
    }
}

/// The already-known type of an expression tree, without inferring.
#[must_use]
pub fn get_expr_type_from_tree(ctx: &CompilerContext, node: NodeId) -> Option<Atom> {
    match &ctx.nodes.get(node).kind {
        NodeKind::Literal(lit) => lit.datatype,
        NodeKind::Expr { expr_type, .. } => *expr_type,
        NodeKind::Id { name, .. } => {
            let scope = ctx.nodes.get(node).scope;
            let sym = ctx.scopes.getsym(scope, *name, true)?;
            ctx.scopes.symbol(sym).variable()?.datatype
        }
        _ => None,
    }
}

/// Reduce a binary operand pair to a single type: a typed side wins
/// and the free-literal side is determined against it; two typed
/// sides must agree.
pub fn reduce_binary(ctx: &mut CompilerContext, lhs: NodeId, rhs: NodeId) -> CaResult<Atom> {
    let lhs_free = is_free_literal(ctx, lhs);
    let rhs_free = is_free_literal(ctx, rhs);
    match (lhs_free, rhs_free) {
        (false, true) => {
            let t = inference_expr_type(ctx, lhs)?;
            determine_expr_type(ctx, rhs, t)?;
            Ok(t)
        }
        (true, false) => {
            let t = inference_expr_type(ctx, rhs)?;
            determine_expr_type(ctx, lhs, t)?;
            Ok(t)
        }
        (true, true) => {
            // both free: infer the left, push into the right
            let t = inference_expr_type(ctx, lhs)?;
            determine_expr_type(ctx, rhs, t)?;
            Ok(t)
        }
        (false, false) => {
            let lt = inference_expr_type(ctx, lhs)?;
            let rt = inference_expr_type(ctx, rhs)?;
            let scope = ctx.nodes.get(lhs).scope;
            let lty = ctx.get_type(scope, lt)?;
            let rty = ctx.get_type(scope, rt)?;
            if !ctx.types.check_identical(lty, rty) {
                return err_at(
                    ctx,
                    rhs,
                    format!(
                        "expected a type `{}`, but found `{}`",
                        ctx.sig_text(lty),
                        ctx.sig_text(rty)
                    ),
                );
            }
            Ok(lt)
        }
    }
}

/// Infer the type of an expression when the surrounding context does
/// not provide one. The result is cached on expression nodes.
pub fn inference_expr_type(ctx: &mut CompilerContext, node: NodeId) -> CaResult<Atom> {
    let scope = ctx.nodes.get(node).scope;
    let kind = ctx.nodes.get(node).kind.clone();
    let inferred = match kind {
        NodeKind::Literal(_) => {
            if let NodeKind::Literal(lit) = &mut ctx.nodes.get_mut(node).kind {
                if lit.fixed_type {
                    lit.datatype.expect("fixed literal has a datatype")
                } else {
                    ca_types::literal::inference_literal_type(
                        &mut ctx.types,
                        &mut ctx.interner,
                        lit,
                    )?
                }
            } else {
                unreachable!()
            }
        }
        NodeKind::Id { name, .. } => {
            let Some(sym) = ctx.scopes.getsym(scope, name, true) else {
                let n = ctx.interner.get(name).to_owned();
                return err_at(ctx, node, format!("cannot find variable `{n}`"));
            };
            ctx.nodes.set_entry(node, sym);
            match ctx.scopes.symbol(sym).variable().and_then(|v| v.datatype) {
                Some(t) => t,
                None => {
                    let n = ctx.interner.get(name).to_owned();
                    return err_at(ctx, node, format!("the type of variable `{n}` is not determined yet"));
                }
            }
        }
        NodeKind::As { typeid, .. } => typeid,
        NodeKind::SizeOf { .. } => names::form_type_id_by_str(&mut ctx.interner, "u64"),
        NodeKind::Range { kind, inclusive, start, end } => {
            infer_range_type(ctx, node, kind, inclusive, start, end)?
        }
        NodeKind::If { is_expr, bodies, .. } if is_expr => {
            // the type of an if-expression is the type of its bodies
            let mut t = None;
            for &b in &bodies {
                let bt = inference_expr_type(ctx, b)?;
                t = Some(bt);
            }
            match t {
                Some(t) => t,
                None => return err_at(ctx, node, "if expression has no body".to_string()),
            }
        }
        NodeKind::StmtList { stmts } => {
            let Some(&last) = stmts.last() else {
                return err_at(ctx, node, "empty statement list has no type".to_string());
            };
            inference_expr_type(ctx, last)?
        }
        NodeKind::LexicalBody { stmts, .. } => inference_expr_type(ctx, stmts)?,
        NodeKind::ArrayItemRight { array, indices } => {
            infer_array_item_type(ctx, node, array, &indices)?
        }
        NodeKind::StructFieldOpRight { expr, field, direct } => {
            infer_struct_field_type(ctx, node, expr, field, direct)?
        }
        NodeKind::Expr { op, operands, expr_type } => {
            if let Some(t) = expr_type {
                t
            } else {
                let t = infer_expr_op(ctx, node, scope, op, &operands)?;
                if let NodeKind::Expr { expr_type, .. } = &mut ctx.nodes.get_mut(node).kind {
                    *expr_type = Some(t);
                }
                t
            }
        }
        other => {
            return err_at(
                ctx,
                node,
                format!("cannot infer a type for this construct: {other:?}"),
            );
        }
    };
    Ok(inferred)
}

fn infer_expr_op(
    ctx: &mut CompilerContext,
    node: NodeId,
    scope: ca_common::ids::ScopeId,
    op: ExprOp,
    operands: &[NodeId],
) -> CaResult<Atom> {
    use ExprOp::*;
    match op {
        Add | Sub => {
            // pointer +/- integer keeps the pointer type; the offset
            // side is typed on its own
            if !is_free_literal(ctx, operands[0]) {
                let lt = inference_expr_type(ctx, operands[0])?;
                let lty = ctx.get_type(scope, lt)?;
                if ctx.types.get(lty).tok == TypeTok::Pointer {
                    ensure_literal_fixed(ctx, operands[1])?;
                    inference_expr_type(ctx, operands[1])?;
                    return Ok(lt);
                }
            }
            reduce_binary(ctx, operands[0], operands[1])
        }
        Mul | Div | Rem | BitAnd | BitOr | BitXor => {
            reduce_binary(ctx, operands[0], operands[1])
        }
        Shl | Shr => {
            // shift result takes the left-hand type; the right side
            // is coerced at emission
            let t = inference_expr_type(ctx, operands[0])?;
            inference_expr_type(ctx, operands[1])?;
            Ok(t)
        }
        Lt | Gt | Le | Ge | Eq | Ne => {
            reduce_binary(ctx, operands[0], operands[1])?;
            Ok(names::form_type_id_by_str(&mut ctx.interner, "bool"))
        }
        LogicAnd | LogicOr => {
            let b = names::form_type_id_by_str(&mut ctx.interner, "bool");
            determine_expr_type(ctx, operands[0], b)?;
            determine_expr_type(ctx, operands[1], b)?;
            Ok(b)
        }
        Minus | Not => inference_expr_type(ctx, operands[0]),
        Deref => {
            let t = inference_expr_type(ctx, operands[0])?;
            let ty = ctx.get_type(scope, t)?;
            match &ctx.types.get(ty).payload {
                CaTypePayload::Pointer(p) => Ok(ctx.types.get(p.kernel).signature),
                _ => err_at(
                    ctx,
                    node,
                    format!("only pointer type can do dereference, `{}` cannot", ctx.sig_text(ty)),
                ),
            }
        }
        Address => {
            let t = inference_expr_type(ctx, operands[0])?;
            Ok(names::form_pointer_id(&mut ctx.interner, t))
        }
        Box => {
            let t = inference_expr_type(ctx, operands[0])?;
            Ok(names::form_pointer_id(&mut ctx.interner, t))
        }
        FnCall => {
            let target = resolver::resolve_call_name(ctx, operands[0])?;
            resolver::call_target_rettype(ctx, &target, node)
        }
        Tuple => {
            let NodeKind::ArgList { exprs } = ctx.nodes.get(operands[0]).kind.clone() else {
                return err_at(ctx, node, "(internal) tuple without argument list".to_string());
            };
            let mut tids = Vec::with_capacity(exprs.len());
            for e in exprs {
                tids.push(inference_expr_type(ctx, e)?);
            }
            Ok(names::form_tuple_id(&mut ctx.interner, &tids))
        }
        Struct => {
            let NodeKind::StructExpr { name, .. } = &ctx.nodes.get(operands[0]).kind else {
                return err_at(ctx, node, "(internal) struct expr payload missing".to_string());
            };
            Ok(names::form_type_id(&mut ctx.interner, *name))
        }
        Array => {
            let NodeKind::ArrayDef { elems, repeat } = ctx.nodes.get(operands[0]).kind.clone()
            else {
                return err_at(ctx, node, "(internal) array expr payload missing".to_string());
            };
            let Some(&first) = elems.first() else {
                return err_at(ctx, node, "cannot infer the type of an empty array".to_string());
            };
            let elem_t = inference_expr_type(ctx, first)?;
            for &e in elems.iter().skip(1) {
                determine_expr_type(ctx, e, elem_t)?;
            }
            let len = repeat.unwrap_or(elems.len() as u64);
            Ok(names::form_array_id(&mut ctx.interner, elem_t, len))
        }
        ArrayItem => inference_expr_type(ctx, operands[0]),
        StructItem => inference_expr_type(ctx, operands[0]),
        Range => inference_expr_type(ctx, operands[0]),
        StmtExpr => {
            let Some(&last) = operands.last() else {
                return err_at(ctx, node, "empty statement expression".to_string());
            };
            inference_expr_type(ctx, last)
        }
        IfExpr => inference_expr_type(ctx, operands[0]),
        ArgListActual => err_at(ctx, node, "argument list has no value type".to_string()),
    }
}

fn infer_range_type(
    ctx: &mut CompilerContext,
    node: NodeId,
    kind: RangeKind,
    inclusive: bool,
    start: Option<NodeId>,
    end: Option<NodeId>,
) -> CaResult<Atom> {
    let scope = ctx.nodes.get(node).scope;
    let start_ty = match start {
        Some(s) => {
            let t = inference_expr_type(ctx, s)?;
            Some(ctx.get_type(scope, t)?)
        }
        None => None,
    };
    let end_ty = match end {
        Some(e) => {
            let t = inference_expr_type(ctx, e)?;
            Some(ctx.get_type(scope, t)?)
        }
        None => None,
    };
    let span = ctx.span_of(node);
    let id = catype_from_range(
        &mut ctx.types,
        &mut ctx.interner,
        span,
        kind,
        inclusive,
        start_ty,
        end_ty,
    )?;
    Ok(ctx.types.get(id).signature)
}

fn infer_array_item_type(
    ctx: &mut CompilerContext,
    node: NodeId,
    array: NodeId,
    indices: &[NodeId],
) -> CaResult<Atom> {
    let scope = ctx.nodes.get(node).scope;
    let arr_t = inference_expr_type(ctx, array)?;
    let mut ty = ctx.get_type(scope, arr_t)?;
    for &idx in indices {
        let is_range = matches!(
            ctx.nodes.get(idx).kind,
            NodeKind::Range { .. } | NodeKind::Expr { op: ExprOp::Range, .. }
        );
        let elem = match &ctx.types.get(ty).payload {
            CaTypePayload::Array(a) => a.elem,
            CaTypePayload::Struct(s) if ctx.types.get(ty).tok == TypeTok::Slice => {
                // indexing a slice: element behind the data pointer
                let ptr = s.fields[0].ty;
                match &ctx.types.get(ptr).payload {
                    CaTypePayload::Pointer(p) => p.kernel,
                    _ => {
                        return err_at(ctx, node, "(internal) slice without pointer field".to_string());
                    }
                }
            }
            _ => {
                return err_at(
                    ctx,
                    node,
                    format!("type `{}` not an array type", ctx.sig_text(ty)),
                );
            }
        };
        if is_range {
            // range-indexing produces a slice over the element type
            let slice = ca_types::range::slice_create_catype(&mut ctx.types, &mut ctx.interner, elem);
            ty = slice;
        } else {
            let u64_t = names::form_type_id_by_str(&mut ctx.interner, "u64");
            if is_free_literal(ctx, idx) {
                determine_expr_type(ctx, idx, u64_t)?;
            } else {
                inference_expr_type(ctx, idx)?;
            }
            ty = elem;
        }
    }
    Ok(ctx.types.get(ty).signature)
}

fn infer_struct_field_type(
    ctx: &mut CompilerContext,
    node: NodeId,
    expr: NodeId,
    field: FieldName,
    direct: bool,
) -> CaResult<Atom> {
    let scope = ctx.nodes.get(node).scope;
    let base_t = inference_expr_type(ctx, expr)?;
    let base = ctx.get_type(scope, base_t)?;
    let struct_ty = resolver::receiver_struct_type(ctx, node, base, direct)?;
    let s = match &ctx.types.get(struct_ty).payload {
        CaTypePayload::Struct(s) => s,
        _ => {
            return err_at(
                ctx,
                node,
                format!("type `{}` has no fields", ctx.sig_text(struct_ty)),
            );
        }
    };
    let fty = match field {
        FieldName::Named(name) => match s.field_pos(name) {
            Some(pos) => s.fields[pos].ty,
            None => {
                let fname = ctx.interner.get(name).to_owned();
                return err_at(
                    ctx,
                    node,
                    format!(
                        "cannot find field `{}` from datatype `{}`",
                        fname,
                        ctx.sig_text(struct_ty)
                    ),
                );
            }
        },
        FieldName::Tuple(pos) => match s.fields.get(pos as usize) {
            Some(f) => f.ty,
            None => {
                return err_at(
                    ctx,
                    node,
                    format!(
                        "tuple numbered field `{}` out of range of datatype `{}`",
                        pos,
                        ctx.sig_text(struct_ty)
                    ),
                );
            }
        },
    };
    Ok(ctx.types.get(fty).signature)
}

/// Push a context type down into an expression tree, determining free
/// literals and checking typed subtrees.
pub fn determine_expr_type(ctx: &mut CompilerContext, node: NodeId, typeid: Atom) -> CaResult<()> {
    let scope = ctx.nodes.get(node).scope;
    let target = ctx.get_type_at(scope, typeid, ctx.span_of(node).beg)?;

    let kind = ctx.nodes.get(node).kind.clone();
    match kind {
        NodeKind::Literal(_) => {
            if let NodeKind::Literal(lit) = &mut ctx.nodes.get_mut(node).kind {
                ca_types::literal::determine_literal_type(
                    &mut ctx.types,
                    &mut ctx.interner,
                    lit,
                    target,
                )?;
            }
        }
        NodeKind::Id { name, .. } => {
            let Some(sym) = ctx.scopes.getsym(scope, name, true) else {
                let n = ctx.interner.get(name).to_owned();
                return err_at(ctx, node, format!("cannot find variable `{n}`"));
            };
            let existing = ctx.scopes.symbol(sym).variable().and_then(|v| v.datatype);
            match existing {
                None => {
                    let sig = ctx.types.get(target).signature;
                    if let Some(var) = ctx.scopes.symbol_mut(sym).variable_mut() {
                        var.datatype = Some(sig);
                    }
                }
                Some(t) => {
                    let have = ctx.get_type(scope, t)?;
                    if !ctx.types.check_identical(have, target) {
                        return err_at(
                            ctx,
                            node,
                            format!(
                                "expected a type `{}`, but found `{}`",
                                ctx.sig_text(target),
                                ctx.sig_text(have)
                            ),
                        );
                    }
                }
            }
        }
        NodeKind::Expr { op, operands, .. } => {
            determine_expr_op(ctx, node, op, &operands, typeid, target)?;
            if let NodeKind::Expr { expr_type, .. } = &mut ctx.nodes.get_mut(node).kind {
                *expr_type = Some(ctx.types.get(target).signature);
            }
        }
        NodeKind::If { is_expr, bodies, .. } if is_expr => {
            for &b in &bodies {
                determine_expr_type(ctx, b, typeid)?;
            }
        }
        NodeKind::StmtList { stmts } => {
            if let Some(&last) = stmts.last() {
                determine_expr_type(ctx, last, typeid)?;
            }
        }
        NodeKind::LexicalBody { stmts, .. } => determine_expr_type(ctx, stmts, typeid)?,
        _ => {
            // other constructs: the inferred type must match
            let t = inference_expr_type(ctx, node)?;
            let have = ctx.get_type(scope, t)?;
            if !ctx.types.check_identical(have, target) {
                return err_at(
                    ctx,
                    node,
                    format!(
                        "expected a type `{}`, but found `{}`",
                        ctx.sig_text(target),
                        ctx.sig_text(have)
                    ),
                );
            }
        }
    }
    Ok(())
}

fn determine_expr_op(
    ctx: &mut CompilerContext,
    node: NodeId,
    op: ExprOp,
    operands: &[NodeId],
    typeid: Atom,
    target: TypeId,
) -> CaResult<()> {
    use ExprOp::*;
    match op {
        Add | Sub | Mul | Div | Rem | BitAnd | BitOr | BitXor => {
            determine_expr_type(ctx, operands[0], typeid)?;
            determine_expr_type(ctx, operands[1], typeid)
        }
        Shl | Shr => determine_expr_type(ctx, operands[0], typeid),
        Lt | Gt | Le | Ge | Eq | Ne | LogicAnd | LogicOr => {
            if ctx.types.get(target).tok != TypeTok::Bool {
                return err_at(
                    ctx,
                    node,
                    format!("`{}` expected, comparison yields `bool`", ctx.sig_text(target)),
                );
            }
            Ok(())
        }
        Minus | Not => determine_expr_type(ctx, operands[0], typeid),
        Array => {
            let (elem_sig, len) = match &ctx.types.get(target).payload {
                CaTypePayload::Array(a) => {
                    (ctx.types.get(a.elem).signature, a.dims[0])
                }
                _ => {
                    return err_at(
                        ctx,
                        node,
                        format!("array expression cannot have type `{}`", ctx.sig_text(target)),
                    );
                }
            };
            let NodeKind::ArrayDef { elems, repeat } = ctx.nodes.get(operands[0]).kind.clone()
            else {
                return err_at(ctx, node, "(internal) array payload missing".to_string());
            };
            if repeat.is_none() && elems.len() as u64 != len {
                return err_at(
                    ctx,
                    node,
                    format!(
                        "expected an array with a fixed size of {} elements, found one with {} elements",
                        len,
                        elems.len()
                    ),
                );
            }
            for &e in &elems {
                determine_expr_type(ctx, e, elem_sig)?;
            }
            Ok(())
        }
        Tuple => {
            let fields: Vec<Atom> = match &ctx.types.get(target).payload {
                CaTypePayload::Struct(s) => s
                    .fields
                    .iter()
                    .map(|f| ctx.types.get(f.ty).signature)
                    .collect(),
                _ => {
                    return err_at(
                        ctx,
                        node,
                        format!("tuple expression cannot have type `{}`", ctx.sig_text(target)),
                    );
                }
            };
            let NodeKind::ArgList { exprs } = ctx.nodes.get(operands[0]).kind.clone() else {
                return err_at(ctx, node, "(internal) tuple payload missing".to_string());
            };
            if exprs.len() != fields.len() {
                return err_at(
                    ctx,
                    node,
                    format!(
                        "tuple expression has {} fields but type `{}` has {}",
                        exprs.len(),
                        ctx.sig_text(target),
                        fields.len()
                    ),
                );
            }
            for (e, f) in exprs.iter().zip(fields) {
                determine_expr_type(ctx, *e, f)?;
            }
            Ok(())
        }
        Box => {
            let kernel = match &ctx.types.get(target).payload {
                CaTypePayload::Pointer(p) => ctx.types.get(p.kernel).signature,
                _ => {
                    return err_at(
                        ctx,
                        node,
                        format!("box expression cannot have type `{}`", ctx.sig_text(target)),
                    );
                }
            };
            determine_expr_type(ctx, operands[0], kernel)
        }
        StmtExpr => {
            if let Some(&last) = operands.last() {
                determine_expr_type(ctx, last, typeid)?;
            }
            Ok(())
        }
        IfExpr => determine_expr_type(ctx, operands[0], typeid),
        _ => {
            // remaining forms carry their own types; verify agreement
            let t = inference_expr_type(ctx, node)?;
            let scope = ctx.nodes.get(node).scope;
            let have = ctx.get_type(scope, t)?;
            if !ctx.types.check_identical(have, target) {
                return err_at(
                    ctx,
                    node,
                    format!(
                        "expected a type `{}`, but found `{}`",
                        ctx.sig_text(target),
                        ctx.sig_text(have)
                    ),
                );
            }
            Ok(())
        }
    }
}

/// Convenience: the canonical type of an inferred expression.
pub fn expr_catype(ctx: &mut CompilerContext, node: NodeId) -> CaResult<TypeId> {
    let t = inference_expr_type(ctx, node)?;
    let scope = ctx.nodes.get(node).scope;
    ctx.get_type(scope, t)
}

/// Widen a free literal node to its default type before emission.
pub fn ensure_literal_fixed(ctx: &mut CompilerContext, node: NodeId) -> CaResult<()> {
    if is_free_literal(ctx, node) {
        inference_expr_type(ctx, node)?;
    }
    Ok(())
}

/// Locations for synthesized nodes.
#[must_use]
pub fn synthetic_loc() -> Sloc {
    Sloc::synthetic()
}
