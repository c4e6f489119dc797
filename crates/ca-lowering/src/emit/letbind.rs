//! `let`-binding emission: pattern inference, shielding rotation and
//! value binding.
//!
//! Binding is two steps. Inference first: an annotated pattern (or a
//! pattern whose structure names a type) imposes its type on the
//! right-hand side; otherwise the right-hand side's type is inferred
//! and distributed across the pattern. Emission second: the pattern is
//! walked again, extracting sub-values by field/element address and
//! installing the slot on each bound variable's active shielding
//! frame.
//!
//! The right-hand side is always evaluated under a backward rotation
//! so `let a = a;` reads the previous binding of `a`.

use super::{err_node, Emitter, GenericReplace, OperandKind};
use crate::infer;
use ca_ast::node::{ExprOp, NodeKind, VarInitKind};
use ca_ast::pattern::{CaPattern, FieldSel, PatternKind};
use ca_backend::ValueRef;
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, ScopeId, TypeId};
use ca_common::interner::Atom;
use ca_common::names;
use ca_types::{CaStructKind, CaTypePayload};

/// Where a bound value comes from during emission.
#[derive(Clone, Copy)]
enum BindSource {
    /// no initializer: zero-fill or leave the memory untouched
    Uninit(VarInitKind),
    /// a scalar right-value
    Scalar(ValueRef),
    /// the address of an aggregate to extract from
    Slot(ValueRef),
}

impl Emitter<'_> {
    pub(crate) fn walk_letbind(&mut self, node: NodeId) -> CaResult<()> {
        let NodeKind::LetBind { pattern, expr, global } = self.ctx.nodes.get(node).kind.clone()
        else {
            return err_node(self.ctx, node, "(internal) not a let binding".to_string());
        };
        let cap = *pattern;
        let scope = self.ctx.nodes.get(node).scope;

        // the ring was left at the last binding by the previous pass;
        // one forward rotation brings the current binding in scope
        self.rotate_pattern(&cap, scope, false);

        if let NodeKind::VarDefZeroValue { init } = self.ctx.nodes.get(expr).kind {
            // `let x: T = __zero_init__` / `__noinit__`
            let catype = self.pattern_check_get_type(&cap, expr)?.ok_or_else(|| {
                Diagnostic::error(
                    cap.loc,
                    "uninitialized binding requires a determined type".to_string(),
                )
            })?;
            self.determine_letbind_type(&cap, catype, scope)?;
            self.bind_pattern_value(scope, &cap, BindSource::Uninit(init), catype, global)?;
            return Ok(());
        }

        // 1. type both sides
        self.inference_letbind_type(&cap, expr)?;

        // 2. the right side evaluates against the previous bindings
        self.rotate_pattern(&cap, scope, true);
        let op_result = self.walk_expr(expr);
        self.rotate_pattern(&cap, scope, false);
        let op = op_result?;

        // 3. bind pattern variables, extracting through the slot for
        // aggregates and loading scalars; a heap frame's value is
        // already the pointer r-value
        let source = if op.kind == OperandKind::Alloc {
            if self.ctx.types.get(op.catype).is_complex() {
                BindSource::Slot(op.value)
            } else {
                let (v, _) = self.right_value(op, true);
                BindSource::Scalar(v)
            }
        } else {
            BindSource::Scalar(op.value)
        };
        self.bind_pattern_value(scope, &cap, source, op.catype, global)
    }

    // =========================================================================
    // Shielding rotation over patterns
    // =========================================================================

    pub(crate) fn rotate_pattern(&mut self, cap: &CaPattern, scope: ScopeId, back: bool) {
        match cap.kind {
            PatternKind::Var => {
                self.rotate_one(cap.name, scope, back);
                for &m in &cap.morebind {
                    self.rotate_one(m, scope, back);
                }
            }
            PatternKind::Array
            | PatternKind::Tuple
            | PatternKind::GenTuple
            | PatternKind::Struct => {
                for &m in &cap.morebind {
                    self.rotate_one(m, scope, back);
                }
                for item in &cap.items {
                    self.rotate_pattern(item, scope, back);
                }
            }
            PatternKind::IgnoreOne | PatternKind::IgnoreRange => {}
        }
    }

    fn rotate_one(&mut self, name: Atom, scope: ScopeId, back: bool) {
        if let Some(sym) = self.ctx.scopes.getsym(scope, name, false)
            && let Some(shield) = self.ctx.scopes.symbol_mut(sym).shielding_mut()
        {
            shield.rotate(back);
        }
    }

    // =========================================================================
    // Inference
    // =========================================================================

    /// The type the pattern itself determines: its annotation, the
    /// named type it references, or the structural composition of
    /// already-typed parts. `None` when only the right side can tell.
    fn pattern_check_get_type(
        &mut self,
        cap: &CaPattern,
        expr: NodeId,
    ) -> CaResult<Option<TypeId>> {
        let scope = self.ctx.nodes.get(expr).scope;
        let structural = self.catype_from_pattern(cap, scope)?;
        if let Some(annot) = cap.datatype {
            let post = self.ctx.get_type_at(scope, annot, cap.loc)?;
            if let Some(s) = structural
                && !self.ctx.types.check_identical(post, s)
            {
                return Err(Diagnostic::error(
                    cap.loc,
                    format!(
                        "specified type `{}` not equal pattern type `{}`",
                        self.ctx.sig_text(post),
                        self.ctx.sig_text(s)
                    ),
                )
                .into());
            }
            return Ok(Some(post));
        }
        Ok(structural)
    }

    fn catype_from_pattern(
        &mut self,
        cap: &CaPattern,
        scope: ScopeId,
    ) -> CaResult<Option<TypeId>> {
        match cap.kind {
            PatternKind::Var => {
                let Some(sym) = self.ctx.scopes.getsym(scope, cap.name, false) else {
                    return Ok(None);
                };
                match self.ctx.scopes.symbol(sym).variable().and_then(|v| v.datatype) {
                    Some(t) => Ok(Some(self.ctx.get_type(scope, t)?)),
                    None => Ok(None),
                }
            }
            PatternKind::Tuple | PatternKind::Struct => {
                let tid = names::form_type_id(&mut self.ctx.interner, cap.name);
                Ok(Some(self.ctx.get_type_at(scope, tid, cap.loc)?))
            }
            PatternKind::Array => {
                let mut elem: Option<TypeId> = None;
                for item in &cap.items {
                    let Some(t) = self.catype_from_pattern(item, scope)? else {
                        return Ok(None);
                    };
                    if let Some(prev) = elem
                        && !self.ctx.types.check_identical(prev, t)
                    {
                        return Err(Diagnostic::error(
                            cap.loc,
                            format!(
                                "array pattern expected `{}`, but found `{}`",
                                self.ctx.sig_text(prev),
                                self.ctx.sig_text(t)
                            ),
                        )
                        .into());
                    }
                    elem = Some(t);
                }
                match elem {
                    Some(e) => Ok(Some(self.ctx.types.make_array_type(
                        &mut self.ctx.interner,
                        e,
                        cap.items.len() as u64,
                    ))),
                    None => Ok(None),
                }
            }
            PatternKind::GenTuple => {
                let mut parts = Vec::with_capacity(cap.items.len());
                for item in &cap.items {
                    match self.catype_from_pattern(item, scope)? {
                        Some(t) => parts.push(t),
                        None => return Ok(None),
                    }
                }
                Ok(Some(
                    self.ctx.types.make_tuple_type(&mut self.ctx.interner, &parts),
                ))
            }
            PatternKind::IgnoreOne | PatternKind::IgnoreRange => Ok(None),
        }
    }

    fn inference_letbind_type(&mut self, cap: &CaPattern, expr: NodeId) -> CaResult<()> {
        if let Some(catype) = self.pattern_check_get_type(cap, expr)? {
            let scope = self.ctx.nodes.get(expr).scope;
            self.determine_letbind_type(cap, catype, scope)?;
            let sig = self.ctx.types.get(catype).signature;
            self.rotate_pattern(cap, scope, true);
            let r = infer::determine_expr_type(self.ctx, expr, sig);
            self.rotate_pattern(cap, scope, false);
            return r;
        }
        self.inference_letbind_both_sides(cap, cap, expr)
    }

    /// Infer types when neither annotation nor pattern structure
    /// decides; `top` is the whole pattern, rotated as one so the
    /// right side of `let (b, a) = (a, b)` sees the outer bindings.
    fn inference_letbind_both_sides(
        &mut self,
        top: &CaPattern,
        cap: &CaPattern,
        expr: NodeId,
    ) -> CaResult<()> {
        let scope = self.ctx.nodes.get(expr).scope;
        match cap.kind {
            PatternKind::IgnoreOne | PatternKind::IgnoreRange | PatternKind::Var => {
                self.rotate_pattern(top, scope, true);
                let t = infer::inference_expr_type(self.ctx, expr);
                self.rotate_pattern(top, scope, false);
                let t = t?;
                if cap.kind == PatternKind::Var {
                    self.register_pattern_var_type(cap, t, scope);
                }
                Ok(())
            }
            PatternKind::GenTuple => {
                if matches!(self.ctx.nodes.get(expr).kind, NodeKind::Id { .. }) {
                    // the type comes whole from the named right side
                    self.rotate_pattern(top, scope, true);
                    let t = infer::inference_expr_type(self.ctx, expr);
                    self.rotate_pattern(top, scope, false);
                    let t = t?;
                    let catype = self.ctx.get_type(scope, t)?;
                    self.determine_letbind_type(cap, catype, scope)?;
                    for &m in &cap.morebind {
                        self.register_var_type(m, self.ctx.types.get(catype).signature, scope);
                    }
                    return Ok(());
                }

                let NodeKind::Expr { op: ExprOp::Tuple, operands, .. } =
                    self.ctx.nodes.get(expr).kind.clone()
                else {
                    return Err(Diagnostic::error(
                        cap.loc,
                        "the right side expression is not a general tuple".to_string(),
                    )
                    .into());
                };
                let NodeKind::ArgList { exprs } = self.ctx.nodes.get(operands[0]).kind.clone()
                else {
                    return err_node(self.ctx, expr, "(internal) tuple payload missing".to_string());
                };

                let gap = cap.ignore_range_pos();
                if gap.is_none() && cap.items.len() != exprs.len() {
                    return Err(Diagnostic::error(
                        cap.loc,
                        format!(
                            "pattern have different fields `{}` than `{}` of right expression",
                            cap.items.len(),
                            exprs.len()
                        ),
                    )
                    .into());
                }

                match gap {
                    None => {
                        for (item, &e) in cap.items.iter().zip(&exprs) {
                            self.inference_letbind_both_sides(top, item, e)?;
                        }
                        let Some(catype) = self.catype_from_pattern(cap, scope)? else {
                            return Err(Diagnostic::error(
                                cap.loc,
                                "cannot determine the general tuple type from the pattern"
                                    .to_string(),
                            )
                            .into());
                        };
                        for &m in &cap.morebind {
                            self.register_var_type(m, self.ctx.types.get(catype).signature, scope);
                        }
                        let sig = self.ctx.types.get(catype).signature;
                        self.rotate_pattern(top, scope, true);
                        let r = infer::determine_expr_type(self.ctx, expr, sig);
                        self.rotate_pattern(top, scope, false);
                        r
                    }
                    Some(pos) => {
                        // `..` absorbs the middle of the value; the
                        // tuple's own type comes from the right side
                        for (item, &e) in cap.items[..pos].iter().zip(&exprs) {
                            self.inference_letbind_both_sides(top, item, e)?;
                        }
                        let offset = exprs.len() - cap.items.len();
                        for (i, item) in cap.items.iter().enumerate().skip(pos + 1) {
                            self.inference_letbind_both_sides(top, item, exprs[i + offset])?;
                        }
                        self.rotate_pattern(top, scope, true);
                        let t = infer::inference_expr_type(self.ctx, expr);
                        self.rotate_pattern(top, scope, false);
                        let t = t?;
                        for &m in &cap.morebind {
                            self.register_var_type(m, t, scope);
                        }
                        Ok(())
                    }
                }
            }
            PatternKind::Array => {
                self.rotate_pattern(top, scope, true);
                let t = infer::inference_expr_type(self.ctx, expr);
                self.rotate_pattern(top, scope, false);
                let t = t?;
                let catype = self.ctx.get_type(scope, t)?;
                let (elem, len) = match &self.ctx.types.get(catype).payload {
                    CaTypePayload::Array(a) => (a.elem, a.dims[0]),
                    _ => {
                        return Err(Diagnostic::error(
                            cap.loc,
                            format!(
                                "expected array type but find `{}` for right side",
                                self.ctx.sig_text(catype)
                            ),
                        )
                        .into());
                    }
                };

                let gap = cap.ignore_range_pos();
                if gap.is_none() && cap.items.len() as u64 != len {
                    return Err(Diagnostic::error(
                        cap.loc,
                        format!(
                            "pattern have different fields `{}` than `{}` of right expression",
                            cap.items.len(),
                            len
                        ),
                    )
                    .into());
                }

                match gap {
                    None => self.determine_letbind_type(cap, catype, scope)?,
                    Some(pos) => {
                        for item in &cap.items[..pos] {
                            self.determine_letbind_type(item, elem, scope)?;
                        }
                        for item in &cap.items[pos + 1..] {
                            self.determine_letbind_type(item, elem, scope)?;
                        }
                    }
                }
                for &m in &cap.morebind {
                    self.register_var_type(m, self.ctx.types.get(catype).signature, scope);
                }
                Ok(())
            }
            PatternKind::Tuple | PatternKind::Struct => Err(Diagnostic::error(
                cap.loc,
                "(internal) named pattern should have been resolved by its name".to_string(),
            )
            .into()),
        }
    }

    // =========================================================================
    // Type distribution across patterns
    // =========================================================================

    fn register_var_type(&mut self, name: Atom, sig: Atom, scope: ScopeId) {
        if let Some(sym) = self.ctx.scopes.getsym(scope, name, false) {
            let old = self.ctx.scopes.symbol(sym).variable().and_then(|v| v.datatype);
            if self.assoc_depth > 0 {
                // instantiation must be reversible on scope exit
                self.generic_stack.push(GenericReplace { sym, old });
            }
            if let Some(var) = self.ctx.scopes.symbol_mut(sym).variable_mut() {
                var.datatype = Some(sig);
            }
        }
    }

    fn register_pattern_var_type(&mut self, cap: &CaPattern, sig: Atom, scope: ScopeId) {
        self.register_var_type(cap.name, sig, scope);
        for &m in &cap.morebind {
            self.register_var_type(m, sig, scope);
        }
    }

    /// Distribute a determined type across the pattern tree.
    fn determine_letbind_type(
        &mut self,
        cap: &CaPattern,
        catype: TypeId,
        scope: ScopeId,
    ) -> CaResult<()> {
        match cap.kind {
            PatternKind::Var => {
                let sig = self.ctx.types.get(catype).signature;
                self.register_pattern_var_type(cap, sig, scope);
                Ok(())
            }
            PatternKind::Tuple | PatternKind::GenTuple | PatternKind::Struct => {
                self.determine_letbind_struct(cap, catype, scope)
            }
            PatternKind::Array => {
                let elem = match &self.ctx.types.get(catype).payload {
                    CaTypePayload::Array(a) => a.elem,
                    _ => {
                        return Err(Diagnostic::error(
                            cap.loc,
                            format!(
                                "required an array type, but found `{}`",
                                self.ctx.sig_text(catype)
                            ),
                        )
                        .into());
                    }
                };
                for item in &cap.items {
                    if item.kind == PatternKind::IgnoreRange {
                        continue;
                    }
                    self.determine_letbind_type(item, elem, scope)?;
                }
                Ok(())
            }
            PatternKind::IgnoreOne => Ok(()),
            PatternKind::IgnoreRange => Err(Diagnostic::error(
                cap.loc,
                "(internal) `..` outside a pattern list".to_string(),
            )
            .into()),
        }
    }

    fn determine_letbind_struct(
        &mut self,
        cap: &CaPattern,
        catype: TypeId,
        scope: ScopeId,
    ) -> CaResult<()> {
        let strukt = match self.ctx.types.get(catype).strukt() {
            Some(s) => s.clone(),
            None => {
                return Err(Diagnostic::error(
                    cap.loc,
                    format!(
                        "required a struct type, but found `{}` type",
                        self.ctx.sig_text(catype)
                    ),
                )
                .into());
            }
        };

        // a named pattern must name this very type
        if !cap.name.is_none() && cap.kind != PatternKind::GenTuple {
            let tid = names::form_type_id(&mut self.ctx.interner, cap.name);
            let named = self.ctx.get_type_at(scope, tid, cap.loc)?;
            if !self.ctx.types.check_identical(named, catype) {
                return Err(Diagnostic::error(
                    cap.loc,
                    format!(
                        "`{}` type required, but find `{}` pattern type",
                        self.ctx.sig_text(catype),
                        self.ctx.sig_text(named)
                    ),
                )
                .into());
            }
        }

        let fieldnum = strukt.fields.len();
        if cap.items.len() > fieldnum {
            return Err(Diagnostic::error(
                cap.loc,
                format!(
                    "pattern have more field `{}` than `{}` of datatype `{}`",
                    cap.items.len(),
                    fieldnum,
                    self.ctx.sig_text(catype)
                ),
            )
            .into());
        }

        let sig = self.ctx.types.get(catype).signature;
        for &m in &cap.morebind {
            self.register_var_type(m, sig, scope);
        }

        let gap = cap.ignore_range_pos();
        if gap.is_none() && cap.items.len() != fieldnum {
            return Err(Diagnostic::error(
                cap.loc,
                format!(
                    "pattern have less field `{}` than `{}` of datatype `{}`",
                    cap.items.len(),
                    fieldnum,
                    self.ctx.sig_text(catype)
                ),
            )
            .into());
        }

        if cap.kind == PatternKind::Struct
            || (cap.kind == PatternKind::Tuple
                && strukt.kind == CaStructKind::NamedTuple
                && cap.items.iter().any(|i| i.fieldname.is_some()))
        {
            // field-selected matching: names for structs, positions
            // for named tuples
            let end = gap.unwrap_or(cap.items.len());
            for item in &cap.items[..end] {
                let field_ty = match item.fieldname {
                    Some(FieldSel::Pos(p)) => {
                        if p as usize >= fieldnum {
                            return Err(Diagnostic::error(
                                item.loc,
                                format!(
                                    "tuple numbered field `{p}` out of range `(0 ~ {fieldnum}]` of datatype `{}`",
                                    self.ctx.sig_text(catype)
                                ),
                            )
                            .into());
                        }
                        strukt.fields[p as usize].ty
                    }
                    Some(FieldSel::Named(n)) => match strukt.field_pos(n) {
                        Some(p) => strukt.fields[p].ty,
                        None => {
                            let f = self.ctx.interner.get(n).to_owned();
                            return Err(Diagnostic::error(
                                item.loc,
                                format!(
                                    "cannot find field `{f}` from datatype `{}`",
                                    self.ctx.sig_text(catype)
                                ),
                            )
                            .into());
                        }
                    },
                    None => {
                        return Err(Diagnostic::error(
                            item.loc,
                            "struct pattern item needs a field selector".to_string(),
                        )
                        .into());
                    }
                };
                self.determine_letbind_type(item, field_ty, scope)?;
            }
            return Ok(());
        }

        // positional matching with an optional `..` gap
        match gap {
            None => {
                for (item, field) in cap.items.iter().zip(&strukt.fields) {
                    self.determine_letbind_type(item, field.ty, scope)?;
                }
            }
            Some(pos) => {
                for (item, field) in cap.items[..pos].iter().zip(&strukt.fields) {
                    self.determine_letbind_type(item, field.ty, scope)?;
                }
                let offset = fieldnum - cap.items.len();
                for (i, item) in cap.items.iter().enumerate().skip(pos + 1) {
                    self.determine_letbind_type(item, strukt.fields[i + offset].ty, scope)?;
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Binding emission
    // =========================================================================

    fn bind_pattern_value(
        &mut self,
        scope: ScopeId,
        cap: &CaPattern,
        source: BindSource,
        catype: TypeId,
        global: bool,
    ) -> CaResult<()> {
        match cap.kind {
            PatternKind::Var => {
                self.bind_variable(scope, cap.name, source, global)?;
                for &m in &cap.morebind {
                    self.bind_variable(scope, m, source, global)?;
                }
                Ok(())
            }
            PatternKind::Tuple | PatternKind::GenTuple | PatternKind::Struct => {
                let slot = self.source_as_slot(source, catype)?;
                let strukt = self
                    .ctx
                    .types
                    .get(catype)
                    .strukt()
                    .expect("struct pattern binds a struct")
                    .clone();
                let tref = self.backend_type(catype);
                let i32t = self.be.type_int(32);
                let zero = self.be.const_int(i32t, 0);

                let gap = cap.ignore_range_pos();
                let field_of = |item: &CaPattern, default_pos: usize| match item.fieldname {
                    Some(FieldSel::Pos(p)) => p as usize,
                    Some(FieldSel::Named(n)) => strukt.field_pos(n).unwrap_or(default_pos),
                    None => default_pos,
                };

                let end = gap.unwrap_or(cap.items.len());
                for (i, item) in cap.items[..end].iter().enumerate() {
                    if item.kind == PatternKind::IgnoreOne {
                        continue;
                    }
                    let pos = field_of(item, i);
                    let fty = strukt.fields[pos].ty;
                    let idx = self.be.const_int(i32t, pos as i64);
                    let fp = self.be.gep(tref, slot, &[zero, idx], "bindf");
                    let sub = self.field_source(fp, fty)?;
                    self.bind_pattern_value(scope, item, sub, fty, global)?;
                }
                if let Some(pos) = gap {
                    let offset = strukt.fields.len() - cap.items.len();
                    for (i, item) in cap.items.iter().enumerate().skip(pos + 1) {
                        if item.kind == PatternKind::IgnoreOne {
                            continue;
                        }
                        let fpos = match item.fieldname {
                            Some(FieldSel::Pos(p)) => p as usize,
                            Some(FieldSel::Named(n)) => {
                                strukt.field_pos(n).unwrap_or(i + offset)
                            }
                            None => i + offset,
                        };
                        let fty = strukt.fields[fpos].ty;
                        let idx = self.be.const_int(i32t, fpos as i64);
                        let fp = self.be.gep(tref, slot, &[zero, idx], "bindf");
                        let sub = self.field_source(fp, fty)?;
                        self.bind_pattern_value(scope, item, sub, fty, global)?;
                    }
                }
                for &m in &cap.morebind {
                    self.bind_variable(scope, m, BindSource::Slot(slot), global)?;
                }
                Ok(())
            }
            PatternKind::Array => {
                let slot = self.source_as_slot(source, catype)?;
                let (elem, len) = match &self.ctx.types.get(catype).payload {
                    CaTypePayload::Array(a) => (a.elem, a.dims[0] as usize),
                    _ => {
                        return Err(Diagnostic::error(
                            cap.loc,
                            "array pattern binds a non-array value".to_string(),
                        )
                        .into());
                    }
                };
                let tref = self.backend_type(catype);
                let i64t = self.be.type_int(64);
                let zero = self.be.const_int(i64t, 0);

                let gap = cap.ignore_range_pos();
                let end = gap.unwrap_or(cap.items.len());
                for (i, item) in cap.items[..end].iter().enumerate() {
                    if item.kind == PatternKind::IgnoreOne {
                        continue;
                    }
                    let idx = self.be.const_int(i64t, i as i64);
                    let ep = self.be.gep(tref, slot, &[zero, idx], "binde");
                    let sub = self.field_source(ep, elem)?;
                    self.bind_pattern_value(scope, item, sub, elem, global)?;
                }
                if let Some(pos) = gap {
                    let offset = len - cap.items.len();
                    for (i, item) in cap.items.iter().enumerate().skip(pos + 1) {
                        if item.kind == PatternKind::IgnoreOne {
                            continue;
                        }
                        let idx = self.be.const_int(i64t, (i + offset) as i64);
                        let ep = self.be.gep(tref, slot, &[zero, idx], "binde");
                        let sub = self.field_source(ep, elem)?;
                        self.bind_pattern_value(scope, item, sub, elem, global)?;
                    }
                }
                for &m in &cap.morebind {
                    self.bind_variable(scope, m, BindSource::Slot(slot), global)?;
                }
                Ok(())
            }
            PatternKind::IgnoreOne => Ok(()),
            PatternKind::IgnoreRange => Ok(()),
        }
    }

    /// Aggregates extract through an address; spill non-address
    /// sources into a temporary first.
    fn source_as_slot(&mut self, source: BindSource, catype: TypeId) -> CaResult<ValueRef> {
        match source {
            BindSource::Slot(s) => Ok(s),
            BindSource::Scalar(v) => {
                let func = self.curr_func().expect("binding inside a function");
                let tref = self.backend_type(catype);
                let tmp = self.be.entry_block_alloca(func, tref, "bindtmp");
                self.be.store(v, tmp);
                Ok(tmp)
            }
            BindSource::Uninit(_) => {
                let func = self.curr_func().expect("binding inside a function");
                let tref = self.backend_type(catype);
                let tmp = self.be.entry_block_alloca(func, tref, "bindtmp");
                self.be.memset(tmp, 0, self.ctx.types.get(catype).size.max(0) as u64, 1);
                Ok(tmp)
            }
        }
    }

    /// The source a sub-field contributes: non-complex values load,
    /// aggregates keep extracting by address.
    fn field_source(&mut self, addr: ValueRef, fty: TypeId) -> CaResult<BindSource> {
        if self.ctx.types.get(fty).is_complex() {
            Ok(BindSource::Slot(addr))
        } else {
            let tref = self.backend_type(fty);
            let v = self.be.load(tref, addr, "bindload");
            Ok(BindSource::Scalar(v))
        }
    }

    /// Create the storage for one bound variable and install it on the
    /// active shielding frame.
    fn bind_variable(
        &mut self,
        scope: ScopeId,
        name: Atom,
        source: BindSource,
        global: bool,
    ) -> CaResult<()> {
        let Some(sym) = self.ctx.scopes.getsym(scope, name, false) else {
            let n = self.ctx.interner.get(name).to_owned();
            return Err(Diagnostic::error(
                infer::synthetic_loc(),
                format!("cannot find variable `{n}` in symbol table"),
            )
            .into());
        };
        let Some(var) = self.ctx.scopes.symbol(sym).variable() else {
            let n = self.ctx.interner.get(name).to_owned();
            let loc = self.ctx.scopes.symbol(sym).loc;
            return Err(Diagnostic::error(loc, format!("'{n}' Not a variable")).into());
        };
        let Some(typeid) = var.datatype else {
            let n = self.ctx.interner.get(name).to_owned();
            let loc = self.ctx.scopes.symbol(sym).loc;
            return Err(Diagnostic::error(
                loc,
                format!("the type of variable `{n}` is not determined"),
            )
            .into());
        };
        let loc = var.loc;
        let catype = self.ctx.get_type_at(scope, typeid, loc)?;
        let tref = self.backend_type(catype);
        let var_name = self.ctx.interner.get(name).to_owned();

        let slot = if global {
            let g = self.be.global_var(tref, &var_name, None);
            match source {
                BindSource::Scalar(v) => self.be.store(v, g),
                BindSource::Slot(s) => {
                    let v = self.be.load(tref, s, "ginit");
                    self.be.store(v, g);
                }
                BindSource::Uninit(_) => {}
            }
            g
        } else {
            let func = self.curr_func().expect("binding inside a function");
            let slot = self.be.entry_block_alloca(func, tref, &var_name);
            match source {
                BindSource::Scalar(v) => self.be.store(v, slot),
                BindSource::Slot(s) => {
                    let v = self.be.load(tref, s, "bindcopy");
                    self.be.store(v, slot);
                }
                BindSource::Uninit(VarInitKind::Zero) => {
                    let size = self.ctx.types.get(catype).size.max(0) as u64;
                    self.be.memset(slot, 0, size, 1);
                }
                BindSource::Uninit(VarInitKind::NoInit) => {
                    // the memory keeps whatever the allocation holds
                }
            }
            slot
        };

        if let Some(v) = self.ctx.scopes.symbol_mut(sym).variable_mut() {
            v.value = Some(slot);
            v.global = global;
        }
        Ok(())
    }
}
