//! Expression emission: literals, identifiers, operators, casts.

use super::{err_node, Emitter, OperandKind, OperandValue};
use crate::infer;
use ca_ast::literal::{CaLiteral, LitKind, LitValue};
use ca_ast::node::{ExprOp, NodeKind};
use ca_backend::{BinOp, CastKind, FCmpKind, ICmpKind, ValueRef};
use ca_common::diagnostics::CaResult;
use ca_common::ids::{NodeId, TypeId};
use ca_types::cast::{cast_op, CastOp};
use ca_types::{CaTypePayload, TypeTok};

impl Emitter<'_> {
    /// Walk an expression; every call returns exactly one operand
    /// descriptor.
    pub(crate) fn walk_expr(&mut self, node: NodeId) -> CaResult<OperandValue> {
        let kind = self.ctx.nodes.get(node).kind.clone();
        match kind {
            NodeKind::Literal(_) => self.walk_literal(node),
            NodeKind::Id { .. } => self.walk_id(node),
            NodeKind::As { expr, typeid } => self.walk_expr_as(node, expr, typeid),
            NodeKind::SizeOf { typeid } => self.walk_expr_sizeof(node, typeid),
            NodeKind::ArrayItemRight { array, indices } => {
                self.walk_arrayitem_addr(node, array, &indices)
            }
            NodeKind::StructFieldOpRight { expr, field, direct } => {
                self.walk_structfield_addr(node, expr, field, direct)
            }
            NodeKind::Range { .. } => self.walk_range(node),
            NodeKind::If { is_expr, conds, bodies, else_body } if is_expr => {
                self.walk_if_expr(node, &conds, &bodies, else_body)
            }
            NodeKind::StmtList { stmts } => self.walk_stmt_expr_list(node, &stmts),
            NodeKind::LexicalBody { stmts, .. } => self.walk_expr(stmts),
            NodeKind::Expr { op, operands, .. } => self.walk_expr_op(node, op, &operands),
            other => err_node(
                self.ctx,
                node,
                format!("cannot use this construct as an expression: {other:?}"),
            ),
        }
    }

    fn walk_expr_op(
        &mut self,
        node: NodeId,
        op: ExprOp,
        operands: &[NodeId],
    ) -> CaResult<OperandValue> {
        use ExprOp::*;
        match op {
            Add | Sub | Mul | Div | Rem | BitAnd | BitOr | BitXor | Shl | Shr | Lt | Gt | Le
            | Ge | Eq | Ne => self.walk_expr_op2(node, op, operands[0], operands[1]),
            LogicAnd | LogicOr => self.walk_expr_landor(node, op, operands[0], operands[1]),
            Minus => self.walk_expr_minus(node, operands[0]),
            Not => self.walk_expr_not(node, operands[0]),
            FnCall => self.walk_expr_call(node, operands[0], operands[1]),
            Tuple => self.walk_expr_gentuple(node, operands[0]),
            Struct => self.walk_expr_struct(node, operands[0]),
            Array => self.walk_expr_array(node, operands[0]),
            ArrayItem | StructItem | Range => self.walk_expr(operands[0]),
            Deref => self.walk_expr_deref(node, operands[0]),
            Address => self.walk_expr_address(node, operands[0]),
            Box => self.walk_expr_box(node, operands[0]),
            StmtExpr => self.walk_stmt_expr_list(node, operands),
            IfExpr => self.walk_expr(operands[0]),
            ArgListActual => err_node(
                self.ctx,
                node,
                "argument list used as an expression".to_string(),
            ),
        }
    }

    pub(crate) fn walk_stmt_expr_list(
        &mut self,
        node: NodeId,
        parts: &[NodeId],
    ) -> CaResult<OperandValue> {
        let Some((&last, stmts)) = parts.split_last() else {
            return err_node(self.ctx, node, "empty statement expression".to_string());
        };
        for &s in stmts {
            self.walk_stmt(s)?;
        }
        self.walk_expr(last)
    }

    // =========================================================================
    // Literals
    // =========================================================================

    pub(crate) fn walk_literal(&mut self, node: NodeId) -> CaResult<OperandValue> {
        let scope = self.ctx.nodes.get(node).scope;
        infer::ensure_literal_fixed(self.ctx, node)?;
        let lit = match &self.ctx.nodes.get(node).kind {
            NodeKind::Literal(lit) => lit.clone(),
            _ => unreachable!(),
        };
        let catype = match lit.catype {
            Some(ct) => ct,
            None => {
                let tid = lit.datatype.expect("fixed literal has a datatype");
                let span = self.ctx.span_of(node);
                self.ctx.get_type_at(scope, tid, span.beg)?
            }
        };
        self.emit_literal_value(node, &lit, catype)
    }

    pub(crate) fn emit_literal_value(
        &mut self,
        node: NodeId,
        lit: &CaLiteral,
        catype: TypeId,
    ) -> CaResult<OperandValue> {
        // string literals materialize as global strings whatever
        // pointer type they were determined into
        if lit.kind == LitKind::CString {
            let bytes = match &lit.value {
                LitValue::Str { text, .. } => self.ctx.interner.get_bytes(*text).to_vec(),
                _ => self.ctx.interner.get_bytes(lit.text).to_vec(),
            };
            let v = self.be.const_global_string(&bytes);
            return Ok(OperandValue::new(OperandKind::Const, v, catype));
        }

        let tok = self.ctx.types.get(catype).tok;
        match tok {
            TypeTok::Array | TypeTok::Struct | TypeTok::Slice => {
                // aggregate literals become a global constant; the
                // operand is its address
                let cv = self.literal_aggregate_const(node, lit, catype)?;
                let tref = self.backend_type(catype);
                let slot = self.be.global_const(tref, "litagg", cv);
                Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
            }
            TypeTok::Pointer => {
                let tref = self.backend_type(catype);
                let v = self.be.const_null_ptr(tref);
                Ok(OperandValue::new(OperandKind::Const, v, catype))
            }
            TypeTok::Bool => {
                let v = self.be.const_bool(lit.as_i64() != 0);
                Ok(OperandValue::new(OperandKind::Const, v, catype))
            }
            t if t.is_float() => {
                let tref = self.backend_type(catype);
                let v = self.be.const_float(tref, lit.as_f64());
                Ok(OperandValue::new(OperandKind::Const, v, catype))
            }
            t if t.is_integer() => {
                let tref = self.backend_type(catype);
                let v = self.be.const_int(tref, lit.as_i64());
                Ok(OperandValue::new(OperandKind::Const, v, catype))
            }
            _ => err_node(
                self.ctx,
                node,
                format!("literal cannot have type `{}`", self.ctx.sig_text(catype)),
            ),
        }
    }

    fn literal_aggregate_const(
        &mut self,
        node: NodeId,
        lit: &CaLiteral,
        catype: TypeId,
    ) -> CaResult<ValueRef> {
        match (&lit.value, self.ctx.types.get(catype).payload.clone()) {
            (LitValue::Array(elems), CaTypePayload::Array(a)) => {
                let mut parts = Vec::with_capacity(elems.len());
                for sub in elems {
                    let part = self.literal_scalar_or_aggregate(node, sub, a.elem)?;
                    parts.push(part);
                }
                let tref = self.backend_type(catype);
                Ok(self.be.const_aggregate(tref, &parts))
            }
            (LitValue::Struct(elems), CaTypePayload::Struct(s)) => {
                let mut parts = Vec::with_capacity(elems.len());
                for (sub, field) in elems.iter().zip(&s.fields) {
                    let part = self.literal_scalar_or_aggregate(node, sub, field.ty)?;
                    parts.push(part);
                }
                let tref = self.backend_type(catype);
                Ok(self.be.const_aggregate(tref, &parts))
            }
            _ => err_node(
                self.ctx,
                node,
                "(internal) aggregate literal without aggregate payload".to_string(),
            ),
        }
    }

    fn literal_scalar_or_aggregate(
        &mut self,
        node: NodeId,
        lit: &CaLiteral,
        ty: TypeId,
    ) -> CaResult<ValueRef> {
        match lit.kind {
            LitKind::Array | LitKind::Struct => self.literal_aggregate_const(node, lit, ty),
            _ => {
                let op = self.emit_literal_value(node, lit, ty)?;
                Ok(op.value)
            }
        }
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    pub(crate) fn walk_id(&mut self, node: NodeId) -> CaResult<OperandValue> {
        let NodeKind::Id { name, .. } = self.ctx.nodes.get(node).kind else {
            unreachable!()
        };
        let scope = self.ctx.nodes.get(node).scope;
        let Some(sym) = self.ctx.scopes.getsym(scope, name, true) else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(self.ctx, node, format!("cannot find variable `{n}`"));
        };
        self.ctx.nodes.set_entry(node, sym);

        let Some(var) = self.ctx.scopes.symbol(sym).variable() else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(self.ctx, node, format!("`{n}` is not a variable"));
        };
        let Some(slot) = var.value else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(
                self.ctx,
                node,
                format!("variable `{n}` is used before being defined"),
            );
        };
        let Some(typeid) = var.datatype else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(self.ctx, node, format!("the type of variable `{n}` is not determined yet"));
        };
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
    }

    // =========================================================================
    // Binary operators
    // =========================================================================

    pub(crate) fn walk_expr_op2(
        &mut self,
        node: NodeId,
        op: ExprOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> CaResult<OperandValue> {
        // pointer +/- integer lowers to element-typed address math and
        // skips the operand-type reduction
        if matches!(op, ExprOp::Add | ExprOp::Sub) && !infer::is_free_literal(self.ctx, lhs) {
            let lt = infer::inference_expr_type(self.ctx, lhs)?;
            let scope = self.ctx.nodes.get(lhs).scope;
            let lty = self.ctx.get_type(scope, lt)?;
            if self.ctx.types.get(lty).tok == TypeTok::Pointer {
                infer::ensure_literal_fixed(self.ctx, rhs)?;
                let (lv, lty) = self.walk_right_value(lhs, true)?;
                let (rv, rty) = self.walk_right_value(rhs, true)?;
                return self.pointer_arith(node, op, lv, lty, rv, rty);
            }
        }

        let typeid = infer::reduce_binary(self.ctx, lhs, rhs)?;
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;

        let (lv, lty) = self.walk_right_value(lhs, true)?;
        let (rv, rty) = self.walk_right_value(rhs, true)?;

        let tok = self.ctx.types.get(catype).tok;
        if op.is_comparison() {
            let v = self.emit_compare(node, op, tok, lv, rv)?;
            let bool_ty = self.ctx.types.get_primitive_by_token(TypeTok::Bool);
            return Ok(OperandValue::new(OperandKind::Calc, v, bool_ty));
        }

        if op.is_shift() {
            let lw = self.ctx.types.get(lty).tok.bits();
            let rw = self.ctx.types.get(rty).tok.bits();
            // coerce the shift amount to the width of the shifted value
            let rv = if lw != rw {
                let tref = self.backend_type(lty);
                if rw < lw {
                    self.be.cast(CastKind::ZExt, rv, tref, "shamt")
                } else {
                    self.be.cast(CastKind::Trunc, rv, tref, "shamt")
                }
            } else {
                rv
            };
            let bop = match op {
                ExprOp::Shl => BinOp::Shl,
                _ if self.ctx.types.get(lty).tok.is_signed() => BinOp::AShr,
                _ => BinOp::LShr,
            };
            let v = self.be.binop(bop, lv, rv, "shift");
            return Ok(OperandValue::new(OperandKind::Calc, v, lty));
        }

        let is_float = tok.is_float();
        let signed = tok.is_signed();
        if !is_float && !tok.is_integer() {
            return err_node(
                self.ctx,
                node,
                format!(
                    "binary operation on unsupported type `{}`",
                    self.ctx.sig_text(catype)
                ),
            );
        }
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
            (ExprOp::BitAnd, _) => BinOp::And,
            (ExprOp::BitOr, _) => BinOp::Or,
            (ExprOp::BitXor, _) => BinOp::Xor,
            _ => {
                return err_node(self.ctx, node, format!("unsupported binary operator {op:?}"));
            }
        };
        if matches!(bop, BinOp::And | BinOp::Or | BinOp::Xor) && is_float {
            return err_node(
                self.ctx,
                node,
                "bitwise operation on floating point type".to_string(),
            );
        }
        let v = self.be.binop(bop, lv, rv, "calc");
        Ok(OperandValue::new(OperandKind::Calc, v, catype))
    }

    fn emit_compare(
        &mut self,
        node: NodeId,
        op: ExprOp,
        tok: TypeTok,
        lv: ValueRef,
        rv: ValueRef,
    ) -> CaResult<ValueRef> {
        if tok.is_float() {
            let kind = match op {
                ExprOp::Lt => FCmpKind::Olt,
                ExprOp::Gt => FCmpKind::Ogt,
                ExprOp::Le => FCmpKind::Ole,
                ExprOp::Ge => FCmpKind::Oge,
                ExprOp::Eq => FCmpKind::Oeq,
                _ => FCmpKind::One,
            };
            return Ok(self.be.fcmp(kind, lv, rv, "cmp"));
        }
        if !tok.is_integer() && tok != TypeTok::Pointer {
            return err_node(
                self.ctx,
                node,
                format!("comparison on unsupported type `{}`", tok.name()),
            );
        }
        let signed = tok.is_signed();
        let kind = match (op, signed) {
            (ExprOp::Lt, true) => ICmpKind::Slt,
            (ExprOp::Lt, false) => ICmpKind::Ult,
            (ExprOp::Gt, true) => ICmpKind::Sgt,
            (ExprOp::Gt, false) => ICmpKind::Ugt,
            (ExprOp::Le, true) => ICmpKind::Sle,
            (ExprOp::Le, false) => ICmpKind::Ule,
            (ExprOp::Ge, true) => ICmpKind::Sge,
            (ExprOp::Ge, false) => ICmpKind::Uge,
            (ExprOp::Eq, _) => ICmpKind::Eq,
            _ => ICmpKind::Ne,
        };
        Ok(self.be.icmp(kind, lv, rv, "cmp"))
    }

    fn pointer_arith(
        &mut self,
        node: NodeId,
        op: ExprOp,
        lv: ValueRef,
        lty: TypeId,
        rv: ValueRef,
        rty: TypeId,
    ) -> CaResult<OperandValue> {
        if !self.ctx.types.get(rty).tok.is_integer() {
            return err_node(
                self.ctx,
                node,
                "pointer arithmetic needs an integer offset".to_string(),
            );
        }
        let kernel = match &self.ctx.types.get(lty).payload {
            CaTypePayload::Pointer(p) => p.kernel,
            _ => unreachable!(),
        };
        let idx = if op == ExprOp::Sub {
            self.be.neg(rv, "ptrsubidx")
        } else {
            rv
        };
        let elem_ty = self.backend_type(kernel);
        let v = self.be.gep(elem_ty, lv, &[idx], "ptrop");
        Ok(OperandValue::new(OperandKind::Calc, v, lty))
    }

    // =========================================================================
    // Short-circuit logic
    // =========================================================================

    pub(crate) fn walk_expr_landor(
        &mut self,
        node: NodeId,
        op: ExprOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> CaResult<OperandValue> {
        let bool_tid = ca_common::names::form_type_id_by_str(&mut self.ctx.interner, "bool");
        infer::determine_expr_type(self.ctx, lhs, bool_tid)?;
        infer::determine_expr_type(self.ctx, rhs, bool_tid)?;
        let bool_ty = self.ctx.types.get_primitive_by_token(TypeTok::Bool);

        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "logical operator outside a function".to_string());
        };

        let (lv, _) = self.walk_right_value(lhs, true)?;
        let lhs_end = self.be.current_block().expect("insert point");

        let rhs_bb = self.be.append_block(func, "landor_rhs");
        let merge_bb = self.be.append_block(func, "landor_end");

        let short_circuit = if op == ExprOp::LogicAnd {
            self.be.cond_br(lv, rhs_bb, merge_bb);
            self.be.const_bool(false)
        } else {
            self.be.cond_br(lv, merge_bb, rhs_bb);
            self.be.const_bool(true)
        };

        self.be.set_insert_point(rhs_bb);
        let (rv, _) = self.walk_right_value(rhs, true)?;
        let rhs_end = self.be.current_block().expect("insert point");
        self.be.br(merge_bb);

        self.be.set_insert_point(merge_bb);
        let i1 = self.be.type_int(1);
        let v = self.be.phi(
            i1,
            &[(short_circuit, lhs_end), (rv, rhs_end)],
            "landor",
        );
        Ok(OperandValue::new(OperandKind::Phi, v, bool_ty))
    }

    // =========================================================================
    // Unary operators
    // =========================================================================

    pub(crate) fn walk_expr_minus(&mut self, node: NodeId, operand: NodeId) -> CaResult<OperandValue> {
        let (v, ty) = self.walk_right_value(operand, true)?;
        let tok = self.ctx.types.get(ty).tok;
        if tok.is_float() {
            let r = self.be.fneg(v, "neg");
            return Ok(OperandValue::new(OperandKind::Calc, r, ty));
        }
        if tok.is_signed() {
            let r = self.be.neg(v, "neg");
            return Ok(OperandValue::new(OperandKind::Calc, r, ty));
        }
        err_node(
            self.ctx,
            node,
            format!(
                "unary `-` requires a signed numeric type, but found `{}`",
                self.ctx.sig_text(ty)
            ),
        )
    }

    pub(crate) fn walk_expr_not(&mut self, node: NodeId, operand: NodeId) -> CaResult<OperandValue> {
        let (v, ty) = self.walk_right_value(operand, true)?;
        let tok = self.ctx.types.get(ty).tok;
        if !tok.is_integer() {
            return err_node(
                self.ctx,
                node,
                format!(
                    "`!` requires an integer or bool type, but found `{}`",
                    self.ctx.sig_text(ty)
                ),
            );
        }
        let r = self.be.not(v, "not");
        Ok(OperandValue::new(OperandKind::Calc, r, ty))
    }

    // =========================================================================
    // `as` conversion
    // =========================================================================

    pub(crate) fn walk_expr_as(
        &mut self,
        node: NodeId,
        expr: NodeId,
        typeid: ca_common::interner::Atom,
    ) -> CaResult<OperandValue> {
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let target = self.ctx.get_type_at(scope, typeid, span.beg)?;

        // free literals take the target type directly, without a cast
        if infer::is_free_literal(self.ctx, expr) {
            infer::determine_expr_type(self.ctx, expr, typeid)?;
            return self.walk_expr(expr);
        }

        let op = self.walk_expr(expr)?;
        let from_tok = self.ctx.types.get(op.catype).tok;
        let to_tok = self.ctx.types.get(target).tok;

        // array decay keeps the slot address: bitcast into a fresh
        // temporary of the pointer type
        if from_tok == TypeTok::Array && to_tok == TypeTok::Pointer {
            let Some(func) = self.curr_func() else {
                return err_node(self.ctx, node, "`as` outside a function".to_string());
            };
            let tref = self.backend_type(target);
            let casted = self.be.cast(CastKind::BitCast, op.value, tref, "decay");
            let slot = self.be.entry_block_alloca(func, tref, "decayslot");
            self.be.store(casted, slot);
            return Ok(OperandValue::new(OperandKind::Alloc, slot, target));
        }

        let (v, _) = self.right_value(op, true);
        match cast_op(from_tok, to_tok) {
            CastOp::None => Ok(OperandValue::new(OperandKind::Calc, v, target)),
            CastOp::Forbidden => err_node(
                self.ctx,
                node,
                format!(
                    "cannot convert `{}` into `{}` with `as`",
                    self.ctx.sig_text(op.catype),
                    self.ctx.sig_text(target)
                ),
            ),
            CastOp::Op(k) => {
                if self.ctx.types.check_identical(op.catype, target) {
                    // same signature: the table cell is a no-op
                    return Ok(OperandValue::new(OperandKind::Calc, v, target));
                }
                let tref = self.backend_type(target);
                let r = self.be.cast(k, v, tref, "as");
                Ok(OperandValue::new(OperandKind::Calc, r, target))
            }
        }
    }

    pub(crate) fn walk_expr_sizeof(
        &mut self,
        node: NodeId,
        typeid: ca_common::interner::Atom,
    ) -> CaResult<OperandValue> {
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        let size = self.ctx.types.get(catype).size.max(0);
        let u64_ty = self.ctx.types.get_primitive_by_token(TypeTok::U64);
        let i64t = self.be.type_int(64);
        let v = self.be.const_int(i64t, size);
        Ok(OperandValue::new(OperandKind::Const, v, u64_ty))
    }
}
