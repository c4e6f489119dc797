//! Call emission: free functions, methods, domain calls and the
//! named-tuple construction that shares the call syntax.

use super::{err_node, Emitter, OperandKind, OperandValue};
use crate::infer;
use crate::resolver::{self, CallTarget};
use ca_ast::node::NodeKind;
use ca_backend::ValueRef;
use ca_binder::scope::ScopeAssoc;
use ca_common::diagnostics::CaResult;
use ca_common::ids::{NodeId, SymbolId};
use ca_common::interner::Atom;
use ca_types::TypeTok;

impl Emitter<'_> {
    pub(crate) fn walk_expr_call(
        &mut self,
        node: NodeId,
        name_node: NodeId,
        args_node: NodeId,
    ) -> CaResult<OperandValue> {
        let NodeKind::ArgList { exprs } = self.ctx.nodes.get(args_node).kind.clone() else {
            return err_node(self.ctx, node, "(internal) call without argument list".to_string());
        };

        let target = resolver::resolve_call_name(self.ctx, name_node)?;
        match target {
            CallTarget::TupleCtor { typeid, .. } => {
                self.walk_expr_named_tuple(node, typeid, &exprs)
            }
            CallTarget::Function { sym, .. } => self.emit_call(node, sym, None, None, &exprs),
            CallTarget::Method { entry, assoc, receiver, .. } => {
                self.emit_call(node, entry, receiver, assoc, &exprs)
            }
        }
    }

    /// Named tuple construction: `S(1, 2)` fills fields by position.
    fn walk_expr_named_tuple(
        &mut self,
        node: NodeId,
        typeid: Atom,
        exprs: &[NodeId],
    ) -> CaResult<OperandValue> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "tuple construction outside a function".to_string());
        };
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        let strukt = match self.ctx.types.get(catype).strukt() {
            Some(s) => s.clone(),
            None => {
                return err_node(
                    self.ctx,
                    node,
                    format!("`{}` is not a tuple type", self.ctx.sig_text(catype)),
                );
            }
        };
        if exprs.len() != strukt.fields.len() {
            return err_node(
                self.ctx,
                node,
                format!(
                    "tuple `{}` expects {} fields but {} were provided",
                    self.ctx.sig_text(catype),
                    strukt.fields.len(),
                    exprs.len()
                ),
            );
        }

        let tref = self.backend_type(catype);
        let slot = self.be.entry_block_alloca(func, tref, "namedtuple");
        let i32t = self.be.type_int(32);
        let zero = self.be.const_int(i32t, 0);
        for (i, (&e, field)) in exprs.iter().zip(&strukt.fields).enumerate() {
            let fsig = self.ctx.types.get(field.ty).signature;
            infer::determine_expr_type(self.ctx, e, fsig)?;
            let op = self.walk_expr(e)?;
            let idx = self.be.const_int(i32t, i as i64);
            let fp = self.be.gep(tref, slot, &[zero, idx], "tupinit");
            self.copy_to_slot(op, fp);
        }
        Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
    }

    /// Shared emission for function and method calls.
    fn emit_call(
        &mut self,
        node: NodeId,
        sym: SymbolId,
        receiver: Option<NodeId>,
        assoc: Option<ScopeAssoc>,
        actuals: &[NodeId],
    ) -> CaResult<OperandValue> {
        let Some(sig) = self.ctx.scopes.symbol(sym).fn_sig().cloned() else {
            return err_node(self.ctx, node, "call target is not a function".to_string());
        };
        let Some(mangled) = sig.mangled_id else {
            return err_node(
                self.ctx,
                node,
                "(internal) function has no prototype registered from pass 1".to_string(),
            );
        };
        let mangled_text = self.ctx.interner.get(mangled).to_owned();
        let Some(func) = self.be.get_func(&mangled_text) else {
            return err_node(
                self.ctx,
                node,
                format!("(internal) backend prototype `{mangled_text}` missing"),
            );
        };

        let mut args: Vec<ValueRef> = Vec::with_capacity(actuals.len() + 1);
        let mut formal_idx = 0usize;
        if let Some(recv) = receiver {
            // the receiver becomes the borrowed `self` argument:
            // a struct value passes its address, a pointer passes
            // its value
            let rop = self.walk_expr(recv)?;
            let selfv = match self.ctx.types.get(rop.catype).tok {
                TypeTok::Struct | TypeTok::Slice => rop.value,
                TypeTok::Pointer => {
                    let (v, _) = self.right_value(rop, true);
                    v
                }
                _ => {
                    return err_node(
                        self.ctx,
                        node,
                        format!(
                            "incorrect struct `{}` when calling a method",
                            self.ctx.sig_text(rop.catype)
                        ),
                    );
                }
            };
            args.push(selfv);
            formal_idx = 1;
        }

        let formal_names = sig.args.names_slice().to_vec();
        let formal_count = formal_names.len();
        let provided = actuals.len() + args.len();
        if !sig.args.contain_varg && provided != formal_count {
            return err_node(
                self.ctx,
                node,
                format!(
                    "the number of parameters passed in ({provided}) does not match the number of parameters ({formal_count}) declared"
                ),
            );
        }
        if sig.args.contain_varg && provided < formal_count {
            return err_node(
                self.ctx,
                node,
                format!(
                    "at least {formal_count} parameters are required, but only {provided} were passed in"
                ),
            );
        }

        // formal types for trait defaults resolve `Self` through the
        // recorded overlay
        let args_scope = sig.args.scope;
        let saved_assoc = match &assoc {
            Some(a) => {
                let saved = self.ctx.scopes.scope(args_scope).assoc.clone();
                self.ctx.scopes.scope_mut(args_scope).assoc = Some(a.clone());
                Some(saved)
            }
            None => None,
        };

        let result = (|| -> CaResult<(Vec<ValueRef>, ca_common::ids::TypeId)> {
            let mut args = args;
            for (i, &arg) in actuals.iter().enumerate() {
                let fi = formal_idx + i;
                if fi < formal_count {
                    // each actual is determined against its formal
                    let Some(psym) = self.ctx.scopes.getsym(args_scope, formal_names[fi], false)
                    else {
                        return err_node(
                            self.ctx,
                            node,
                            "(internal) formal parameter symbol missing".to_string(),
                        );
                    };
                    let pty = self.param_type(node, args_scope, psym)?;
                    let psig = self.ctx.types.get(pty).signature;
                    infer::determine_expr_type(self.ctx, arg, psig)?;
                    let (v, aty) = self.walk_right_value(arg, true)?;
                    if !self.ctx.types.check_identical(aty, pty) {
                        return err_node(
                            self.ctx,
                            arg,
                            format!(
                                "expected a type `{}`, but found `{}` for argument {}",
                                self.ctx.sig_text(pty),
                                self.ctx.sig_text(aty),
                                fi
                            ),
                        );
                    }
                    args.push(v);
                } else {
                    // trailing variadic arguments stay free
                    infer::ensure_literal_fixed(self.ctx, arg)?;
                    let (v, _) = self.walk_right_value(arg, true)?;
                    args.push(v);
                }
            }

            let span = self.ctx.span_of(node);
            let ret_ty = self.ctx.get_type_at(args_scope, sig.rettype, span.beg)?;
            Ok((args, ret_ty))
        })();

        if let Some(saved) = saved_assoc {
            self.ctx.scopes.scope_mut(args_scope).assoc = saved;
        }
        let (args, ret_ty) = result?;

        let is_void = self.ctx.types.get(ret_ty).tok == TypeTok::Void;
        let name = if is_void { "" } else { "calltmp" };
        let v = self.be.call(func, &args, name);
        Ok(OperandValue::new(OperandKind::CallInst, v, ret_ty))
    }

    /// Formal parameter type via the rotation dance, shared with the
    /// declaration path.
    fn param_type(
        &mut self,
        node: NodeId,
        scope: ca_common::ids::ScopeId,
        psym: SymbolId,
    ) -> CaResult<ca_common::ids::TypeId> {
        if let Some(shield) = self.ctx.scopes.symbol_mut(psym).shielding_mut() {
            shield.rotate(false);
        }
        let typeid = self
            .ctx
            .scopes
            .symbol(psym)
            .variable()
            .and_then(|v| v.datatype);
        let result = match typeid {
            Some(t) => {
                let span = self.ctx.span_of(node);
                self.ctx.get_type_at(scope, t, span.beg)
            }
            None => err_node(self.ctx, node, "parameter has no declared type".to_string()),
        };
        if let Some(shield) = self.ctx.scopes.symbol_mut(psym).shielding_mut() {
            shield.rotate(true);
        }
        result
    }
}
