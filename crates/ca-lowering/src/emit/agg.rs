//! Aggregate and address emission: arrays, structs, tuples, element
//! and field access, slices, deref/address-of, box/drop, ranges.

use super::{err_node, Emitter, OperandKind, OperandValue};
use crate::infer;
use ca_ast::node::{ExprOp, FieldName, NodeKind, RangeKind};
use ca_backend::{CastKind, ValueRef};
use ca_common::diagnostics::CaResult;
use ca_common::ids::{NodeId, TypeId};
use ca_common::interner::Atom;
use ca_common::names;
use ca_types::range::slice_create_catype;
use ca_types::{CaTypePayload, TypeTok};

impl Emitter<'_> {
    /// Copy an operand into a destination slot (load-through then
    /// store; aggregates move wholesale).
    pub(crate) fn copy_to_slot(&mut self, src: OperandValue, dest: ValueRef) {
        let (v, _) = self.right_value(src, true);
        self.be.store(v, dest);
    }

    // =========================================================================
    // Array construction
    // =========================================================================

    pub(crate) fn walk_expr_array(&mut self, node: NodeId, def: NodeId) -> CaResult<OperandValue> {
        let NodeKind::ArrayDef { elems, repeat } = self.ctx.nodes.get(def).kind.clone() else {
            return err_node(self.ctx, node, "(internal) array payload missing".to_string());
        };
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "array expression outside a function".to_string());
        };

        let typeid = infer::inference_expr_type(self.ctx, node)?;
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        let (elem_ty, len) = match &self.ctx.types.get(catype).payload {
            CaTypePayload::Array(a) => (a.elem, a.dims[0]),
            _ => {
                return err_node(self.ctx, node, "(internal) array expr with non-array type".to_string());
            }
        };

        let arr_tref = self.backend_type(catype);
        let slot = self.be.entry_block_alloca(func, arr_tref, "arr");
        let i64t = self.be.type_int(64);
        let zero = self.be.const_int(i64t, 0);

        if let Some(n) = repeat {
            let first = elems.first().copied().ok_or_else(|| {
                ca_common::diagnostics::Diagnostic::error(span.beg, "repeat form without element")
            })?;
            let op = self.walk_expr(first)?;
            let elem_size = self.ctx.types.get(elem_ty).size;
            let is_zero_byte = elem_size == 1
                && matches!(
                    &self.ctx.nodes.get(first).kind,
                    NodeKind::Literal(lit) if lit.as_i64() == 0
                );
            if is_zero_byte {
                // repeated zero bytes collapse into one memset
                self.be.memset(slot, 0, n, 1);
            } else {
                let (v, _) = self.right_value(op, true);
                for i in 0..n {
                    let idx = self.be.const_int(i64t, i as i64);
                    let ep = self.be.gep(arr_tref, slot, &[zero, idx], "rep");
                    self.be.store(v, ep);
                }
            }
        } else {
            for (i, &e) in elems.iter().enumerate() {
                let op = self.walk_expr(e)?;
                let idx = self.be.const_int(i64t, i as i64);
                let ep = self.be.gep(arr_tref, slot, &[zero, idx], "elem");
                self.copy_to_slot(op, ep);
            }
            let _ = len;
        }
        Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
    }

    // =========================================================================
    // Struct and tuple construction
    // =========================================================================

    pub(crate) fn walk_expr_struct(&mut self, node: NodeId, sexpr: NodeId) -> CaResult<OperandValue> {
        let NodeKind::StructExpr { name, fields, named } = self.ctx.nodes.get(sexpr).kind.clone()
        else {
            return err_node(self.ctx, node, "(internal) struct payload missing".to_string());
        };
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "struct expression outside a function".to_string());
        };

        let typeid = names::form_type_id(&mut self.ctx.interner, name);
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        let strukt = match self.ctx.types.get(catype).strukt() {
            Some(s) => s.clone(),
            None => {
                let n = self.ctx.interner.get(name).to_owned();
                return err_node(self.ctx, node, format!("`{n}` is not a struct type"));
            }
        };

        if fields.len() != strukt.fields.len() {
            return err_node(
                self.ctx,
                node,
                format!(
                    "struct expression has {} fields but type `{}` has {}",
                    fields.len(),
                    self.ctx.sig_text(catype),
                    strukt.fields.len()
                ),
            );
        }

        let tref = self.backend_type(catype);
        let slot = self.be.entry_block_alloca(func, tref, "structexpr");
        let i32t = self.be.type_int(32);
        let zero = self.be.const_int(i32t, 0);

        let mut covered = vec![false; strukt.fields.len()];
        for (i, (fname, fexpr)) in fields.iter().enumerate() {
            let pos = match (named, fname) {
                (true, Some(n)) => match strukt.field_pos(*n) {
                    Some(p) => p,
                    None => {
                        let f = self.ctx.interner.get(*n).to_owned();
                        return err_node(
                            self.ctx,
                            node,
                            format!(
                                "cannot find field `{f}` from datatype `{}`",
                                self.ctx.sig_text(catype)
                            ),
                        );
                    }
                },
                _ => i,
            };
            if covered[pos] {
                let f = fname
                    .map(|n| self.ctx.interner.get(n).to_owned())
                    .unwrap_or_else(|| pos.to_string());
                return err_node(self.ctx, node, format!("field `{f}` specified more than once"));
            }
            covered[pos] = true;

            let fty = strukt.fields[pos].ty;
            let fsig = self.ctx.types.get(fty).signature;
            infer::determine_expr_type(self.ctx, *fexpr, fsig)?;
            let op = self.walk_expr(*fexpr)?;
            let idx = self.be.const_int(i32t, pos as i64);
            let fp = self.be.gep(tref, slot, &[zero, idx], "field");
            self.copy_to_slot(op, fp);
        }

        Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
    }

    pub(crate) fn walk_expr_gentuple(
        &mut self,
        node: NodeId,
        arglist: NodeId,
    ) -> CaResult<OperandValue> {
        let NodeKind::ArgList { exprs } = self.ctx.nodes.get(arglist).kind.clone() else {
            return err_node(self.ctx, node, "(internal) tuple payload missing".to_string());
        };
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "tuple expression outside a function".to_string());
        };

        let mut parts = Vec::with_capacity(exprs.len());
        let mut types = Vec::with_capacity(exprs.len());
        for &e in &exprs {
            let op = self.walk_expr(e)?;
            types.push(op.catype);
            parts.push(op);
        }
        let catype = self
            .ctx
            .types
            .make_tuple_type(&mut self.ctx.interner, &types);

        let tref = self.backend_type(catype);
        let slot = self.be.entry_block_alloca(func, tref, "tuple");
        let i32t = self.be.type_int(32);
        let zero = self.be.const_int(i32t, 0);
        for (i, op) in parts.into_iter().enumerate() {
            let idx = self.be.const_int(i32t, i as i64);
            let fp = self.be.gep(tref, slot, &[zero, idx], "tupfield");
            self.copy_to_slot(op, fp);
        }
        Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
    }

    // =========================================================================
    // Element access (left and right value share the address path)
    // =========================================================================

    /// The range payload of an index expression, when it is one.
    fn index_range_parts(
        &self,
        idx: NodeId,
    ) -> Option<(RangeKind, bool, Option<NodeId>, Option<NodeId>)> {
        let mut n = idx;
        if let NodeKind::Expr { op: ExprOp::Range, operands, .. } = &self.ctx.nodes.get(n).kind {
            n = operands[0];
        }
        match &self.ctx.nodes.get(n).kind {
            NodeKind::Range { kind, inclusive, start, end } => {
                Some((*kind, *inclusive, *start, *end))
            }
            _ => None,
        }
    }

    pub(crate) fn walk_arrayitem_addr(
        &mut self,
        node: NodeId,
        array: NodeId,
        indices: &[NodeId],
    ) -> CaResult<OperandValue> {
        let base = self.walk_expr(array)?;
        let mut ptr = base.value;
        let mut catype = base.catype;

        let i64t = self.be.type_int(64);
        let zero = self.be.const_int(i64t, 0);

        for (n, &idx) in indices.iter().enumerate() {
            if let Some((kind, inclusive, start, end)) = self.index_range_parts(idx) {
                if n + 1 != indices.len() {
                    return err_node(
                        self.ctx,
                        node,
                        "range index must be the last index".to_string(),
                    );
                }
                return self.build_slice(node, ptr, catype, kind, inclusive, start, end);
            }

            match self.ctx.types.get(catype).payload.clone() {
                CaTypePayload::Array(a) => {
                    let (iv, _) = self.walk_right_value(idx, true)?;
                    let arr_tref = self.backend_type(catype);
                    ptr = self.be.gep(arr_tref, ptr, &[zero, iv], "aitem");
                    catype = a.elem;
                }
                CaTypePayload::Struct(_) if self.ctx.types.get(catype).tok == TypeTok::Slice => {
                    let elem = self.slice_elem_type(catype);
                    let slice_tref = self.backend_type(catype);
                    let data_pp = self.be.gep(slice_tref, ptr, &[zero, zero], "sliceptr");
                    let elem_tref = self.backend_type(elem);
                    let data_ptr_ty = self.be.type_ptr(elem_tref);
                    let data = self.be.load(data_ptr_ty, data_pp, "slicedata");
                    let (iv, _) = self.walk_right_value(idx, true)?;
                    ptr = self.be.gep(elem_tref, data, &[iv], "sitem");
                    catype = elem;
                }
                _ => {
                    return err_node(
                        self.ctx,
                        node,
                        format!("type `{}` not an array type", self.ctx.sig_text(catype)),
                    );
                }
            }
        }
        Ok(OperandValue::new(OperandKind::Alloc, ptr, catype))
    }

    fn slice_elem_type(&self, slice: TypeId) -> TypeId {
        let s = self.ctx.types.get(slice).strukt().expect("slice struct");
        match &self.ctx.types.get(s.fields[0].ty).payload {
            CaTypePayload::Pointer(p) => p.kernel,
            _ => s.fields[0].ty,
        }
    }

    /// Materialize a slice value `{&base[start], len}` from a
    /// range-indexed array.
    fn build_slice(
        &mut self,
        node: NodeId,
        arr_ptr: ValueRef,
        arr_catype: TypeId,
        kind: RangeKind,
        inclusive: bool,
        start: Option<NodeId>,
        end: Option<NodeId>,
    ) -> CaResult<OperandValue> {
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "slicing outside a function".to_string());
        };
        let (elem, arr_len) = match &self.ctx.types.get(arr_catype).payload {
            CaTypePayload::Array(a) => (a.elem, a.dims[0]),
            _ => {
                return err_node(
                    self.ctx,
                    node,
                    format!("cannot slice type `{}`", self.ctx.sig_text(arr_catype)),
                );
            }
        };

        let i64t = self.be.type_int(64);
        let zero = self.be.const_int(i64t, 0);
        let one = self.be.const_int(i64t, 1);

        let start_v = match start {
            Some(s) => {
                let (v, ty) = self.walk_right_value(s, true)?;
                self.index_to_i64(v, ty)
            }
            None => zero,
        };
        let end_v = match end {
            Some(e) => {
                let (v, ty) = self.walk_right_value(e, true)?;
                let v = self.index_to_i64(v, ty);
                if inclusive {
                    self.be.binop(ca_backend::BinOp::Add, v, one, "inclend")
                } else {
                    v
                }
            }
            None => self.be.const_int(i64t, arr_len as i64),
        };
        let _ = kind;

        let len_v = self.be.binop(ca_backend::BinOp::Sub, end_v, start_v, "slicelen");
        let arr_tref = self.backend_type(arr_catype);
        let base = self.be.gep(arr_tref, arr_ptr, &[zero, start_v], "slicebase");

        let slice_ty = slice_create_catype(&mut self.ctx.types, &mut self.ctx.interner, elem);
        let slice_tref = self.backend_type(slice_ty);
        let slot = self.be.entry_block_alloca(func, slice_tref, "slice");
        let i32t = self.be.type_int(32);
        let z32 = self.be.const_int(i32t, 0);
        let o32 = self.be.const_int(i32t, 1);
        let p0 = self.be.gep(slice_tref, slot, &[z32, z32], "sptr");
        self.be.store(base, p0);
        let p1 = self.be.gep(slice_tref, slot, &[z32, o32], "slen");
        self.be.store(len_v, p1);

        Ok(OperandValue::new(OperandKind::Alloc, slot, slice_ty))
    }

    fn index_to_i64(&mut self, v: ValueRef, ty: TypeId) -> ValueRef {
        let tok = self.ctx.types.get(ty).tok;
        let i64t = self.be.type_int(64);
        if tok.bits() == 64 {
            v
        } else if tok.is_signed() {
            self.be.cast(CastKind::SExt, v, i64t, "idx")
        } else {
            self.be.cast(CastKind::ZExt, v, i64t, "idx")
        }
    }

    // =========================================================================
    // Field access
    // =========================================================================

    pub(crate) fn walk_structfield_addr(
        &mut self,
        node: NodeId,
        expr: NodeId,
        field: FieldName,
        direct: bool,
    ) -> CaResult<OperandValue> {
        let base = self.walk_expr(expr)?;
        let (struct_ty, base_ptr) = if direct {
            (base.catype, base.value)
        } else {
            // `->`: load the pointer, then address into the pointee
            let (pv, pty) = self.right_value(base, true);
            match &self.ctx.types.get(pty).payload {
                CaTypePayload::Pointer(p) => (p.kernel, pv),
                _ => {
                    return err_node(
                        self.ctx,
                        node,
                        format!(
                            "`->` requires a pointer to struct, but found `{}`",
                            self.ctx.sig_text(pty)
                        ),
                    );
                }
            }
        };

        let strukt = match self.ctx.types.get(struct_ty).strukt() {
            Some(s) => s.clone(),
            None => {
                return err_node(
                    self.ctx,
                    node,
                    format!("type `{}` has no fields", self.ctx.sig_text(struct_ty)),
                );
            }
        };

        let pos = match field {
            FieldName::Named(n) => match strukt.field_pos(n) {
                Some(p) => p,
                None => {
                    let f = self.ctx.interner.get(n).to_owned();
                    return err_node(
                        self.ctx,
                        node,
                        format!(
                            "cannot find field `{f}` from datatype `{}`",
                            self.ctx.sig_text(struct_ty)
                        ),
                    );
                }
            },
            FieldName::Tuple(p) => {
                if p as usize >= strukt.fields.len() {
                    return err_node(
                        self.ctx,
                        node,
                        format!(
                            "tuple numbered field `{p}` out of range of datatype `{}`",
                            self.ctx.sig_text(struct_ty)
                        ),
                    );
                }
                p as usize
            }
        };

        let tref = self.backend_type(struct_ty);
        let i32t = self.be.type_int(32);
        let zero = self.be.const_int(i32t, 0);
        let idx = self.be.const_int(i32t, pos as i64);
        let fp = self.be.gep(tref, base_ptr, &[zero, idx], "sfield");
        Ok(OperandValue::new(
            OperandKind::Alloc,
            fp,
            strukt.fields[pos].ty,
        ))
    }

    // =========================================================================
    // Deref / address-of
    // =========================================================================

    pub(crate) fn walk_expr_deref(&mut self, node: NodeId, expr: NodeId) -> CaResult<OperandValue> {
        let op = self.walk_expr(expr)?;
        let (pv, pty) = self.right_value(op, true);
        match &self.ctx.types.get(pty).payload {
            CaTypePayload::Pointer(p) => {
                Ok(OperandValue::new(OperandKind::Alloc, pv, p.kernel))
            }
            _ => err_node(
                self.ctx,
                node,
                format!(
                    "only pointer type can do dereference, `{}` cannot",
                    self.ctx.sig_text(pty)
                ),
            ),
        }
    }

    pub(crate) fn walk_expr_address(&mut self, node: NodeId, expr: NodeId) -> CaResult<OperandValue> {
        let op = self.walk_expr(expr)?;
        if !matches!(op.kind, OperandKind::Alloc | OperandKind::HeapAlloc) {
            return err_node(self.ctx, node, "cannot take the address of a temporary".to_string());
        }
        let ptr_ty = self
            .ctx
            .types
            .make_pointer_type(&mut self.ctx.interner, op.catype);
        Ok(OperandValue::new(OperandKind::Calc, op.value, ptr_ty))
    }

    // =========================================================================
    // Box / drop
    // =========================================================================

    pub(crate) fn walk_expr_box(&mut self, node: NodeId, expr: NodeId) -> CaResult<OperandValue> {
        let op = self.walk_expr(expr)?;
        let pointee = op.catype;
        let size = self.ctx.types.get(pointee).size.max(0);

        let malloc = self.box_fn();
        let i64t = self.be.type_int(64);
        let size_v = self.be.const_int(i64t, size);
        let raw = self.be.call(malloc, &[size_v], "heap");

        let pointee_tref = self.backend_type(pointee);
        let ptr_tref = self.be.type_ptr(pointee_tref);
        let heap = self.be.cast(CastKind::BitCast, raw, ptr_tref, "boxed");

        self.copy_to_slot(op, heap);

        let ptr_ty = self
            .ctx
            .types
            .make_pointer_type(&mut self.ctx.interner, pointee);
        let _ = node;
        Ok(OperandValue::new(OperandKind::HeapAlloc, heap, ptr_ty))
    }

    pub(crate) fn walk_drop(&mut self, node: NodeId, name: Atom) -> CaResult<()> {
        let scope = self.ctx.nodes.get(node).scope;
        let Some(sym) = self.ctx.scopes.getsym(scope, name, true) else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(
                self.ctx,
                node,
                format!("cannot find variable `{n}` in symbol table when dropping"),
            );
        };
        let Some(var) = self.ctx.scopes.symbol(sym).variable() else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(self.ctx, node, format!("'{n}' Not a variable when dropping"));
        };
        let Some(slot) = var.value else {
            let n = self.ctx.interner.get(name).to_owned();
            return err_node(self.ctx, node, format!("variable `{n}` has no storage to drop"));
        };
        let typeid = var.datatype;

        let ptr_ty = match typeid {
            Some(t) => {
                let span = self.ctx.span_of(node);
                self.ctx.get_type_at(scope, t, span.beg)?
            }
            None => {
                return err_node(self.ctx, node, "dropped variable has no type".to_string());
            }
        };
        let tref = self.backend_type(ptr_ty);
        let heapv = self.be.load(tref, slot, "heapv");
        let free = self.drop_fn();
        self.be.call(free, &[heapv], "");
        Ok(())
    }

    // =========================================================================
    // Range values
    // =========================================================================

    pub(crate) fn walk_range(&mut self, node: NodeId) -> CaResult<OperandValue> {
        let NodeKind::Range { kind, start, end, .. } = self.ctx.nodes.get(node).kind.clone()
        else {
            return err_node(self.ctx, node, "(internal) not a range".to_string());
        };
        let Some(func) = self.curr_func() else {
            return err_node(self.ctx, node, "range expression outside a function".to_string());
        };

        let typeid = infer::inference_expr_type(self.ctx, node)?;
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;

        match kind {
            RangeKind::Full => err_node(
                self.ctx,
                node,
                "the full range `..` has no value of its own".to_string(),
            ),
            RangeKind::Inclusive | RangeKind::RightExclusive => {
                let (s, e) = (start.expect("two-ended range"), end.expect("two-ended range"));
                let sop = self.walk_expr(s)?;
                let eop = self.walk_expr(e)?;
                let tref = self.backend_type(catype);
                let slot = self.be.entry_block_alloca(func, tref, "range");
                let i32t = self.be.type_int(32);
                let z = self.be.const_int(i32t, 0);
                let o = self.be.const_int(i32t, 1);
                let p0 = self.be.gep(tref, slot, &[z, z], "rstart");
                self.copy_to_slot(sop, p0);
                let p1 = self.be.gep(tref, slot, &[z, o], "rend");
                self.copy_to_slot(eop, p1);
                Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
            }
            RangeKind::InclusiveTo | RangeKind::RightExclusiveTo | RangeKind::From => {
                let bound = start.or(end).expect("one-ended range");
                let bop = self.walk_expr(bound)?;
                let tref = self.backend_type(catype);
                let slot = self.be.entry_block_alloca(func, tref, "range");
                self.copy_to_slot(bop, slot);
                Ok(OperandValue::new(OperandKind::Alloc, slot, catype))
            }
        }
    }
}
