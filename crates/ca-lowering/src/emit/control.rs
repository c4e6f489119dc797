//! Statement and control-flow emission: assignment, return, if,
//! while, loop, for, break/continue, goto/label.

use super::{err_node, Emitter, LoopControl, OperandKind, OperandValue};
use crate::infer;
use ca_ast::node::{ExprOp, ForVar, ForVarKind, NodeKind, RangeKind};
use ca_backend::{BinOp, ICmpKind, ValueRef};
use ca_binder::symbol::SymbolKind;
use ca_common::diagnostics::CaResult;
use ca_common::ids::{NodeId, TypeId};
use ca_common::interner::Atom;
use ca_types::{CaTypePayload, TypeTok};

impl Emitter<'_> {
    // =========================================================================
    // Assignment
    // =========================================================================

    /// The address (and type) a left-value form denotes.
    fn left_value_addr(&mut self, lhs: NodeId) -> CaResult<OperandValue> {
        let kind = self.ctx.nodes.get(lhs).kind.clone();
        match kind {
            NodeKind::Id { .. } => self.walk_id(lhs),
            NodeKind::DerefLeft { deref_count, expr } => {
                let (mut addr, mut ty) = self.walk_right_value(expr, true)?;
                for _ in 1..deref_count {
                    // each extra `*` loads one pointer layer
                    let kernel = match &self.ctx.types.get(ty).payload {
                        CaTypePayload::Pointer(p) => p.kernel,
                        _ => {
                            return err_node(
                                self.ctx,
                                lhs,
                                format!(
                                    "only pointer type can do dereference, `{}` cannot",
                                    self.ctx.sig_text(ty)
                                ),
                            );
                        }
                    };
                    let kref = self.backend_type(kernel);
                    addr = self.be.load(kref, addr, "deref");
                    ty = kernel;
                }
                let kernel = match &self.ctx.types.get(ty).payload {
                    CaTypePayload::Pointer(p) => p.kernel,
                    _ => {
                        return err_node(
                            self.ctx,
                            lhs,
                            format!(
                                "only pointer type can do dereference, `{}` cannot",
                                self.ctx.sig_text(ty)
                            ),
                        );
                    }
                };
                Ok(OperandValue::new(OperandKind::Alloc, addr, kernel))
            }
            NodeKind::ArrayItemLeft { array, indices } => {
                self.walk_arrayitem_addr(lhs, array, &indices)
            }
            NodeKind::StructFieldOpLeft { expr, field, direct } => {
                self.walk_structfield_addr(lhs, expr, field, direct)
            }
            other => err_node(
                self.ctx,
                lhs,
                format!("cannot assign into this construct: {other:?}"),
            ),
        }
    }

    pub(crate) fn walk_assign(
        &mut self,
        node: NodeId,
        lhs: NodeId,
        op: Option<ExprOp>,
        expr: NodeId,
    ) -> CaResult<()> {
        let target = self.left_value_addr(lhs)?;
        let sig = self.ctx.types.get(target.catype).signature;
        infer::determine_expr_type(self.ctx, expr, sig)?;

        match op {
            None => {
                let rhs = self.walk_expr(expr)?;
                if !self.ctx.types.check_identical(rhs.catype, target.catype) {
                    return err_node(
                        self.ctx,
                        node,
                        format!(
                            "expected a type `{}`, but found `{}`",
                            self.ctx.sig_text(target.catype),
                            self.ctx.sig_text(rhs.catype)
                        ),
                    );
                }
                self.copy_to_slot(rhs, target.value);
            }
            Some(binop) => {
                // compound assignment: load, combine, store back
                let tref = self.backend_type(target.catype);
                let cur = self.be.load(tref, target.value, "lhsval");
                let (rv, _) = self.walk_right_value(expr, true)?;
                let v = self.apply_arith(node, binop, target.catype, cur, rv)?;
                self.be.store(v, target.value);
            }
        }
        Ok(())
    }

    /// Arithmetic used by compound assignment; the operand types have
    /// already been reduced to `catype`.
    pub(crate) fn apply_arith(
        &mut self,
        node: NodeId,
        op: ExprOp,
        catype: TypeId,
        lv: ValueRef,
        rv: ValueRef,
    ) -> CaResult<ValueRef> {
        let tok = self.ctx.types.get(catype).tok;
        let is_float = tok.is_float();
        let signed = tok.is_signed();
        let bop = match (op, is_float) {
            (ExprOp::Add, false) => BinOp::Add,
            (ExprOp::Add, true) => BinOp::FAdd,
            (ExprOp::Sub, false) => BinOp::Sub,
            (ExprOp::Sub, true) => BinOp::FSub,
            (ExprOp::Mul, false) => BinOp::Mul,
            (ExprOp::Mul, true) => BinOp::FMul,
            (ExprOp::Div, true) => BinOp::FDiv,
            (ExprOp::Div, false) if signed => BinOp::SDiv,
            (ExprOp::Div, false) => BinOp::UDiv,
            (ExprOp::Rem, true) => BinOp::FRem,
            (ExprOp::Rem, false) if signed => BinOp::SRem,
            (ExprOp::Rem, false) => BinOp::URem,
            (ExprOp::BitAnd, false) => BinOp::And,
            (ExprOp::BitOr, false) => BinOp::Or,
            (ExprOp::BitXor, false) => BinOp::Xor,
            (ExprOp::Shl, false) => BinOp::Shl,
            (ExprOp::Shr, false) if signed => BinOp::AShr,
            (ExprOp::Shr, false) => BinOp::LShr,
            _ => {
                return err_node(
                    self.ctx,
                    node,
                    format!("operator {op:?} cannot be used in compound assignment here"),
                );
            }
        };
        Ok(self.be.binop(bop, lv, rv, "opassign"))
    }

    // =========================================================================
    // Return
    // =========================================================================

    pub(crate) fn walk_ret(&mut self, node: NodeId, expr: Option<NodeId>) -> CaResult<()> {
        let Some(frame) = self.fn_stack.last() else {
            return err_node(self.ctx, node, "return outside a function".to_string());
        };
        let ret_bb = frame.ret_bb;
        let ret_slot = frame.ret_slot;
        let ret_type = frame.ret_type;
        let func = frame.func;

        match (expr, ret_slot) {
            (Some(e), Some(slot)) => {
                let sig = self.ctx.types.get(ret_type).signature;
                infer::determine_expr_type(self.ctx, e, sig)?;
                let op = self.walk_expr(e)?;
                if !self.ctx.types.check_identical(op.catype, ret_type) {
                    return err_node(
                        self.ctx,
                        node,
                        format!(
                            "return value type `{}` does not match function return type `{}`",
                            self.ctx.sig_text(op.catype),
                            self.ctx.sig_text(ret_type)
                        ),
                    );
                }
                self.copy_to_slot(op, slot);
            }
            (Some(_), None) => {
                return err_node(
                    self.ctx,
                    node,
                    "return a value from a void function".to_string(),
                );
            }
            (None, Some(_)) => {
                return err_node(
                    self.ctx,
                    node,
                    "no value returned from a function with a return type".to_string(),
                );
            }
            (None, None) => {}
        }

        self.be.br(ret_bb);
        // dead code after a return lands in an unreachable successor
        let dead = self.be.append_block(func, "after_ret");
        self.be.set_insert_point(dead);
        Ok(())
    }

    // =========================================================================
    // If
    // =========================================================================

    fn walk_cond_value(&mut self, cond: NodeId) -> CaResult<ValueRef> {
        let bool_tid = ca_common::names::form_type_id_by_str(&mut self.ctx.interner, "bool");
        if infer::is_free_literal(self.ctx, cond) {
            infer::determine_expr_type(self.ctx, cond, bool_tid)?;
        }
        let (v, ty) = self.walk_right_value(cond, true)?;
        if self.ctx.types.get(ty).tok != TypeTok::Bool {
            return err_node(
                self.ctx,
                cond,
                format!(
                    "condition only accept `bool` type, but find `{}`",
                    self.ctx.sig_text(ty)
                ),
            );
        }
        Ok(v)
    }

    pub(crate) fn walk_if_stmt(
        &mut self,
        node: NodeId,
        conds: &[NodeId],
        bodies: &[NodeId],
        else_body: Option<NodeId>,
    ) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "if outside a function".to_string());
        };
        let out_bb = self.be.append_block(func, "ifout");

        for (i, (&cond, &body)) in conds.iter().zip(bodies).enumerate() {
            let then_bb = self.be.append_block(func, "ifthen");
            let next_bb = if i + 1 < conds.len() || else_body.is_some() {
                self.be.append_block(func, "ifelse")
            } else {
                out_bb
            };

            let cv = self.walk_cond_value(cond)?;
            self.be.cond_br(cv, then_bb, next_bb);

            self.be.set_insert_point(then_bb);
            self.walk_stmt(body)?;
            if let Some(cur) = self.be.current_block()
                && !self.be.block_terminated(cur)
            {
                self.be.br(out_bb);
            }

            self.be.set_insert_point(next_bb);
        }

        if let Some(e) = else_body {
            self.walk_stmt(e)?;
            if let Some(cur) = self.be.current_block()
                && !self.be.block_terminated(cur)
            {
                self.be.br(out_bb);
            }
            self.be.set_insert_point(out_bb);
        }
        Ok(())
    }

    pub(crate) fn walk_if_expr(
        &mut self,
        node: NodeId,
        conds: &[NodeId],
        bodies: &[NodeId],
        else_body: Option<NodeId>,
    ) -> CaResult<OperandValue> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "if expression outside a function".to_string());
        };
        let Some(else_body) = else_body else {
            return err_node(
                self.ctx,
                node,
                "if expression requires an else branch".to_string(),
            );
        };

        // both branches store into one join slot of the common type
        let typeid = infer::inference_expr_type(self.ctx, bodies[0])?;
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        let tref = self.backend_type(catype);
        let slot = self.be.entry_block_alloca(func, tref, "ifexpr");

        let out_bb = self.be.append_block(func, "ifexprout");
        for (i, (&cond, &body)) in conds.iter().zip(bodies).enumerate() {
            let then_bb = self.be.append_block(func, "ifthen");
            let next_bb = if i + 1 < conds.len() {
                self.be.append_block(func, "ifelse")
            } else {
                self.be.append_block(func, "ifelsefinal")
            };

            let cv = self.walk_cond_value(cond)?;
            self.be.cond_br(cv, then_bb, next_bb);

            self.be.set_insert_point(then_bb);
            infer::determine_expr_type(self.ctx, body, typeid)?;
            let bop = self.walk_expr(body)?;
            if !self.ctx.types.check_identical(bop.catype, catype) {
                return err_node(
                    self.ctx,
                    node,
                    format!(
                        "if branches have different types: `{}` and `{}`",
                        self.ctx.sig_text(catype),
                        self.ctx.sig_text(bop.catype)
                    ),
                );
            }
            self.copy_to_slot(bop, slot);
            self.be.br(out_bb);

            self.be.set_insert_point(next_bb);
        }

        infer::determine_expr_type(self.ctx, else_body, typeid)?;
        let eop = self.walk_expr(else_body)?;
        if !self.ctx.types.check_identical(eop.catype, catype) {
            return err_node(
                self.ctx,
                node,
                format!(
                    "if branches have different types: `{}` and `{}`",
                    self.ctx.sig_text(catype),
                    self.ctx.sig_text(eop.catype)
                ),
            );
        }
        self.copy_to_slot(eop, slot);
        self.be.br(out_bb);

        self.be.set_insert_point(out_bb);
        Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
    }

    // =========================================================================
    // While / loop / break / continue
    // =========================================================================

    pub(crate) fn walk_while(&mut self, node: NodeId, cond: NodeId, body: NodeId) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "while outside a function".to_string());
        };
        let cond_bb = self.be.append_block(func, "condbb");
        let while_bb = self.be.append_block(func, "whilebb");
        let end_bb = self.be.append_block(func, "endwhilebb");

        self.be.br(cond_bb);
        self.be.set_insert_point(cond_bb);
        let cv = self.walk_cond_value(cond)?;
        self.be.cond_br(cv, while_bb, end_bb);

        self.be.set_insert_point(while_bb);
        self.loop_controls.push(LoopControl {
            cond_bb,
            out_bb: end_bb,
            label: None,
        });
        let r = self.walk_stmt(body);
        self.loop_controls.pop();
        r?;
        if let Some(cur) = self.be.current_block()
            && !self.be.block_terminated(cur)
        {
            self.be.br(cond_bb);
        }

        self.be.set_insert_point(end_bb);
        Ok(())
    }

    pub(crate) fn walk_loop(&mut self, node: NodeId, body: NodeId) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "loop outside a function".to_string());
        };
        let loop_bb = self.be.append_block(func, "loopbb");
        let end_bb = self.be.append_block(func, "endloopbb");

        self.be.br(loop_bb);
        self.be.set_insert_point(loop_bb);
        self.loop_controls.push(LoopControl {
            cond_bb: loop_bb,
            out_bb: end_bb,
            label: None,
        });
        let r = self.walk_stmt(body);
        self.loop_controls.pop();
        r?;
        if let Some(cur) = self.be.current_block()
            && !self.be.block_terminated(cur)
        {
            self.be.br(loop_bb);
        }
        self.be.set_insert_point(end_bb);
        Ok(())
    }

    pub(crate) fn walk_break(&mut self, node: NodeId) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "break outside a function".to_string());
        };
        let Some(ctrl) = self.loop_controls.last() else {
            return err_node(self.ctx, node, "break outside a loop".to_string());
        };
        self.be.br(ctrl.out_bb);
        let dead = self.be.append_block(func, "after_break");
        self.be.set_insert_point(dead);
        Ok(())
    }

    pub(crate) fn walk_continue(&mut self, node: NodeId) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "continue outside a function".to_string());
        };
        let Some(ctrl) = self.loop_controls.last() else {
            return err_node(self.ctx, node, "continue outside a loop".to_string());
        };
        self.be.br(ctrl.cond_bb);
        let dead = self.be.append_block(func, "after_continue");
        self.be.set_insert_point(dead);
        Ok(())
    }

    // =========================================================================
    // Goto / label
    // =========================================================================

    fn label_block(&mut self, name: Atom) -> ca_backend::BlockRef {
        let func = self.curr_func().expect("label inside a function");
        if let Some(frame) = self.fn_stack.last()
            && let Some(&bb) = frame.label_map.get(&name)
        {
            return bb;
        }
        let text = format!("l:{}", self.ctx.interner.get(name));
        let bb = self.be.append_block(func, &text);
        if let Some(frame) = self.fn_stack.last_mut() {
            frame.label_map.insert(name, bb);
        }
        bb
    }

    pub(crate) fn walk_goto(&mut self, node: NodeId, name: Atom) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "goto outside a function".to_string());
        };
        let span = self.ctx.span_of(node);
        let bb = self.label_block(name);

        // forward goto: the label hangs until its definition appears
        let scope = self.ctx.nodes.get(node).scope;
        let label_id = ca_common::names::form_label_id(&mut self.ctx.interner, name);
        let defined = matches!(
            self.ctx
                .scopes
                .getsym(scope, label_id, true)
                .map(|s| &self.ctx.scopes.symbol(s).kind),
            Some(SymbolKind::Label)
        );
        if !defined
            && let Some(frame) = self.fn_stack.last_mut()
        {
            frame.hanging_labels.entry(name).or_insert(span.beg);
        }

        self.be.br(bb);
        let dead = self.be.append_block(func, "after_goto");
        self.be.set_insert_point(dead);
        Ok(())
    }

    pub(crate) fn walk_label(&mut self, node: NodeId, name: Atom) -> CaResult<()> {
        let bb = self.label_block(name);
        if let Some(frame) = self.fn_stack.last_mut() {
            frame.hanging_labels.remove(&name);
        }
        // the symbol graduates from hanging to defined
        let scope = self.ctx.nodes.get(node).scope;
        let label_id = ca_common::names::form_label_id(&mut self.ctx.interner, name);
        if let Some(sym) = self.ctx.scopes.getsym(scope, label_id, true)
            && matches!(self.ctx.scopes.symbol(sym).kind, SymbolKind::LabelHanging)
        {
            self.ctx.scopes.symbol_mut(sym).kind = SymbolKind::Label;
        }

        if let Some(cur) = self.be.current_block()
            && !self.be.block_terminated(cur)
        {
            self.be.br(bb);
        }
        self.be.set_insert_point(bb);
        Ok(())
    }

    // =========================================================================
    // For
    // =========================================================================

    pub(crate) fn walk_for(
        &mut self,
        node: NodeId,
        var: ForVar,
        list: NodeId,
        body: NodeId,
    ) -> CaResult<()> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "for outside a function".to_string());
        };

        infer::inference_expr_type(self.ctx, list)?;
        let list_op = self.walk_expr(list)?;
        let list_ty = list_op.catype;
        let list_tok = self.ctx.types.get(list_ty).tok;
        if list_tok != TypeTok::Array && list_tok != TypeTok::Range {
            return err_node(
                self.ctx,
                list,
                format!(
                    "currently only support iterate array and range type in for statement, but find `{}`",
                    self.ctx.sig_text(list_ty)
                ),
            );
        }

        // resolve the loop variable entry created during parse
        let scope = self.ctx.nodes.get(node).scope;
        let Some(var_sym) = self.ctx.scopes.getsym(scope, var.name, false) else {
            let n = self.ctx.interner.get(var.name).to_owned();
            return err_node(self.ctx, node, format!("cannot find variable `{n}` in symbol table"));
        };

        // element type of the iteration
        let mut item_ty: TypeId = match self.ctx.types.get(list_ty).payload.clone() {
            CaTypePayload::Array(a) => a.elem,
            CaTypePayload::Range(r) => {
                if r.kind == RangeKind::Full {
                    return err_node(
                        self.ctx,
                        list,
                        "cannot iterate the full range `..`".to_string(),
                    );
                }
                if r.kind == RangeKind::From {
                    return err_node(
                        self.ctx,
                        list,
                        "cannot iterate a range without an upper bound".to_string(),
                    );
                }
                let packaged = r.packaged.expect("bounded range packages a type");
                let elem = match self.ctx.types.get(packaged).payload.clone() {
                    CaTypePayload::Struct(s) => s.fields[0].ty,
                    _ => packaged,
                };
                if !self.ctx.types.get(elem).tok.is_integer() {
                    return err_node(
                        self.ctx,
                        list,
                        format!(
                            "type `{}` not support step into next yet",
                            self.ctx.sig_text(elem)
                        ),
                    );
                }
                elem
            }
            _ => unreachable!(),
        };

        if var.kind == ForVarKind::Pointer || var.kind == ForVarKind::Reference {
            item_ty = self
                .ctx
                .types
                .make_pointer_type(&mut self.ctx.interner, item_ty);
        }
        let item_sig = self.ctx.types.get(item_ty).signature;
        if let Some(v) = self.ctx.scopes.symbol_mut(var_sym).variable_mut() {
            v.datatype = Some(item_sig);
        }

        let i64t = self.be.type_int(64);
        let zero64 = self.be.const_int(i64t, 0);

        // begin/end bounds and the index slot type
        let (range_kind, range_inclusive) = match self.ctx.types.get(list_ty).payload.clone() {
            CaTypePayload::Range(r) => (Some(r.kind), r.inclusive),
            _ => (None, false),
        };

        let (begin_v, end_v, index_tref, one) = if list_tok == TypeTok::Array {
            let len = match &self.ctx.types.get(list_ty).payload {
                CaTypePayload::Array(a) => a.dims[0],
                _ => unreachable!(),
            };
            let end = self.be.const_int(i64t, len as i64);
            let one = self.be.const_int(i64t, 1);
            (zero64, end, i64t, one)
        } else {
            let item_tref = self.backend_type(item_ty);
            let one = self.be.const_int(item_tref, 1);
            match range_kind.expect("range list") {
                RangeKind::Inclusive | RangeKind::RightExclusive => {
                    // bounds live in the packaged tuple (fields 0, 1)
                    let tref = self.backend_type(list_ty);
                    let pack = self.be.load(tref, list_op.value, "rangev");
                    let b = self.be.extract_value(pack, 0, "rbegin");
                    let e = self.be.extract_value(pack, 1, "rend");
                    (b, e, item_tref, one)
                }
                RangeKind::InclusiveTo | RangeKind::RightExclusiveTo => {
                    let tref = self.backend_type(item_ty);
                    let e = self.be.load(tref, list_op.value, "rend");
                    let e = if range_kind == Some(RangeKind::InclusiveTo) {
                        self.be.binop(BinOp::Add, e, one, "rendincl")
                    } else {
                        e
                    };
                    let zero = self.be.const_int(item_tref, 0);
                    (zero, e, item_tref, one)
                }
                _ => unreachable!("rejected above"),
            }
        };

        let cond_bb = self.be.append_block(func, "condbb");
        let loop_bb = self.be.append_block(func, "loopbb");
        let end_bb = self.be.append_block(func, "endloopbb");

        let index_slot = self.be.entry_block_alloca(func, index_tref, "idx");
        self.be.store(begin_v, index_slot);

        let item_tref = self.backend_type(item_ty);
        let var_name = self.ctx.interner.get(var.name).to_owned();
        let item_slot = self.be.entry_block_alloca(func, item_tref, &var_name);
        if let Some(v) = self.ctx.scopes.symbol_mut(var_sym).variable_mut() {
            v.value = Some(item_slot);
        }

        self.be.br(cond_bb);
        self.be.set_insert_point(cond_bb);
        let idx_v = self.be.load(index_tref, index_slot, "idxv");

        // the compare predicate follows element signedness; inclusive
        // two-ended ranges compare with <=
        let signed = list_tok == TypeTok::Range && self.ctx.types.get(item_ty).tok.is_signed();
        let le = list_tok == TypeTok::Range
            && matches!(range_kind, Some(RangeKind::Inclusive))
            && range_inclusive;
        let pred = match (le, signed) {
            (true, true) => ICmpKind::Sle,
            (true, false) => ICmpKind::Ule,
            (false, true) => ICmpKind::Slt,
            (false, false) => ICmpKind::Ult,
        };
        let cont = self.be.icmp(pred, idx_v, end_v, "forcond");
        self.be.cond_br(cont, loop_bb, end_bb);

        self.be.set_insert_point(loop_bb);
        // current element: array loads (or addresses) the slot; range
        // iterates the index itself
        if list_tok == TypeTok::Array {
            let arr_tref = self.backend_type(list_ty);
            let elem_ptr = self.be.gep(arr_tref, list_op.value, &[zero64, idx_v], "forelem");
            if var.kind == ForVarKind::Pointer || var.kind == ForVarKind::Reference {
                self.be.store(elem_ptr, item_slot);
            } else {
                let elem_v = self.be.load(item_tref, elem_ptr, "forelemv");
                self.be.store(elem_v, item_slot);
            }
        } else {
            self.be.store(idx_v, item_slot);
        }

        // advance the index before the body so continue works
        let idx_v2 = self.be.load(index_tref, index_slot, "idxv");
        let inc = self.be.binop(BinOp::Add, idx_v2, one, "inc");
        self.be.store(inc, index_slot);

        self.loop_controls.push(LoopControl {
            cond_bb,
            out_bb: end_bb,
            label: None,
        });
        let r = self.walk_stmt(body);
        self.loop_controls.pop();
        r?;

        if let Some(cur) = self.be.current_block()
            && !self.be.block_terminated(cur)
        {
            self.be.br(cond_bb);
        }
        self.be.set_insert_point(end_bb);
        Ok(())
    }
}
