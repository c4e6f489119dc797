//! Function declaration/definition emission, impl blocks and trait
//! default-method instantiation.

use super::{err_node, Emitter, FuncFrame};
use crate::mangle::{
    self, mangle_function_name, mangle_method_name, method_local_name, LexicalScope,
};
use ca_ast::node::{NodeKind, TypeImplInfo};
use ca_backend::{FuncRef, Linkage, TypeRef};
use ca_binder::runables::MethodImpl;
use ca_binder::scope::{AssocKind, ScopeAssoc};
use ca_binder::symbol::{DataTypeEntry, DataTypeKind, FuncKind, SymbolKind};
use ca_binder::Runables;
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, ScopeId, SymbolId, TypeId};
use ca_common::interner::Atom;
use ca_common::names;
use ca_types::TypeTok;
use rustc_hash::FxHashMap;
use tracing::debug;

impl Emitter<'_> {
    /// Register (or fetch) the backend prototype of a function
    /// declaration node; in pass 1 this also records the mangled id on
    /// the symbol and fills the impl tables.
    pub(crate) fn fn_declare_full(
        &mut self,
        decl: NodeId,
        impl_info: Option<TypeImplInfo>,
        st_type: Option<ScopeId>,
    ) -> CaResult<FuncRef> {
        let NodeKind::FnDecl { name, ret, args, is_extern, .. } =
            self.ctx.nodes.get(decl).kind.clone()
        else {
            return err_node(self.ctx, decl, "(internal) not a function declaration".to_string());
        };

        let name_text = self.ctx.interner.get(name).to_owned();
        let local_name = method_local_name(&name_text).to_owned();

        let local_atom = self.ctx.interner.insert(&local_name);
        let mangled_text = match &impl_info {
            None => mangle_function_name(self.ctx, &self.lexical_stack, name),
            Some(info) => mangle_method_name(
                self.ctx,
                &self.lexical_stack,
                local_atom,
                info.class_name,
                info.trait_name,
            ),
        };
        let mangled = self.ctx.interner.insert(&mangled_text);

        // the symbol entry lives in the scope enclosing the function's
        // own scope; trait-default copies live in the Self-alias scope
        let decl_scope = self.ctx.nodes.get(decl).scope;
        let sym = self.find_or_copy_fn_symbol(decl, name, impl_info.as_ref(), st_type)?;

        // redeclaration checking keyed by the mangled id
        if let Some(&prev) = self.post_check.get(&mangled) {
            if prev != decl {
                mangle::post_check_fn_proto(self.ctx, prev, decl)?;
            }
        } else {
            self.post_check.insert(mangled, decl);
        }

        if let Some(f) = self.be.get_func(&mangled_text)
            && self.function_map.contains_key(&mangled)
        {
            if self.pass == 1 {
                self.record_pass1(sym, mangled, impl_info.as_ref(), decl, local_atom)?;
            }
            return Ok(f);
        }

        // parameter types, read through a forward/back shielding
        // rotation so the declaration-time binding is consulted
        let mut param_types: Vec<TypeRef> = Vec::new();
        let mut param_names: Vec<String> = Vec::new();
        for &argname in args.names_slice() {
            let Some(psym) = self.ctx.scopes.getsym(decl_scope, argname, false) else {
                let n = self.ctx.interner.get(argname).to_owned();
                return err_node(self.ctx, decl, format!("cannot get parameter for {n}"));
            };
            let ty = self.param_type_rotated(decl, decl_scope, psym)?;
            let tref = self.backend_type(ty);
            param_types.push(tref);
            param_names.push(self.ctx.interner.get(argname).to_owned());
        }

        let span = self.ctx.span_of(decl);
        let ret_ty = self.ctx.get_type_at(decl_scope, ret, span.beg)?;
        let ret_tref = self.backend_type(ret_ty);
        let fnty = self.be.type_func(ret_tref, &param_types, args.contain_varg);
        let names_ref: Vec<&str> = param_names.iter().map(|s| s.as_str()).collect();
        let _ = is_extern; // every function uses C linkage today
        let f = self
            .be
            .declare_func(&mangled_text, fnty, Linkage::External, &names_ref);
        self.function_map.insert(mangled, decl);
        debug!(name = %mangled_text, "prototype registered");

        if self.pass == 1 {
            self.record_pass1(sym, mangled, impl_info.as_ref(), decl, local_atom)?;
        }
        Ok(f)
    }

    /// Pass-1 bookkeeping: the mangled id on the symbol, and the
    /// runables entry for impl methods.
    fn record_pass1(
        &mut self,
        sym: SymbolId,
        mangled: Atom,
        impl_info: Option<&TypeImplInfo>,
        decl: NodeId,
        local_name: Atom,
    ) -> CaResult<()> {
        if let Some(sig) = self.ctx.scopes.symbol_mut(sym).fn_sig_mut() {
            sig.mangled_id = Some(mangled);
        }
        if let Some(info) = impl_info {
            let cls_sym = self.class_symbol(decl, info.class_name)?;
            let entry = MethodImpl {
                fnname: local_name,
                mangled,
                entry: sym,
            };
            if let Some(dt) = self.ctx.scopes.symbol_mut(cls_sym).datatype_mut() {
                dt.runables.add_entry(info.trait_name, entry);
            }
        }
        Ok(())
    }

    /// The class (struct) symbol an impl block refers to.
    pub(crate) fn class_symbol(&mut self, node: NodeId, class_name: Atom) -> CaResult<SymbolId> {
        let typeid = names::form_type_id(&mut self.ctx.interner, class_name);
        let scope = self.ctx.nodes.get(node).scope;
        match self.ctx.scopes.get_type_entry(scope, typeid, true) {
            Some((sym, _)) => Ok(sym),
            None => {
                let n = self.ctx.interner.get(class_name).to_owned();
                err_node(self.ctx, node, format!("cannot find symbol entry for type '{n}'"))
            }
        }
    }

    fn find_or_copy_fn_symbol(
        &mut self,
        decl: NodeId,
        name: Atom,
        impl_info: Option<&TypeImplInfo>,
        st_type: Option<ScopeId>,
    ) -> CaResult<SymbolId> {
        let decl_scope = self.ctx.nodes.get(decl).scope;
        let entry_scope = self.ctx.scopes.parent_or_global(decl_scope);

        if let Some(st) = st_type {
            // trait default copied into the impl's Self-alias scope,
            // keyed by the full method id
            let info = impl_info.expect("st_type implies an impl");
            let method_id = names::form_method_id(
                &mut self.ctx.interner,
                name,
                info.class_name,
                info.trait_name,
            );
            if let Some(sym) = self.ctx.scopes.getsym(st, method_id, false) {
                return Ok(sym);
            }
            // clone the trait prototype's signature
            let Some(proto) = self.ctx.scopes.getsym(entry_scope, name, true) else {
                let n = self.ctx.interner.get(name).to_owned();
                return err_node(self.ctx, decl, format!("function '{n}' not defined"));
            };
            let mut sig = self
                .ctx
                .scopes
                .symbol(proto)
                .fn_sig()
                .expect("trait item is a function")
                .clone();
            sig.kind |= FuncKind::METHOD_IN_TRAIT;
            let loc = self.ctx.scopes.symbol(proto).loc;
            return Ok(self.ctx.scopes.insert(
                st,
                method_id,
                loc,
                SymbolKind::FnDef(sig),
            ));
        }

        match self.ctx.scopes.getsym(entry_scope, name, false) {
            Some(sym) => Ok(sym),
            None => {
                let n = self.ctx.interner.get(name).to_owned();
                err_node(self.ctx, decl, format!("function '{n}' not defined"))
            }
        }
    }

    fn param_type_rotated(
        &mut self,
        decl: NodeId,
        scope: ScopeId,
        psym: SymbolId,
    ) -> CaResult<TypeId> {
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
                let span = self.ctx.span_of(decl);
                self.ctx.get_type_at(scope, t, span.beg)
            }
            None => err_node(self.ctx, decl, "parameter has no declared type".to_string()),
        };
        if let Some(shield) = self.ctx.scopes.symbol_mut(psym).shielding_mut() {
            shield.rotate(true);
        }
        result
    }

    /// Emit a function definition (prototype in pass 1, body in
    /// pass 2). Generic functions stay uninstantiated unless walked
    /// through an instantiation site.
    pub(crate) fn fn_define_full(
        &mut self,
        node: NodeId,
        impl_info: Option<TypeImplInfo>,
        st_type: Option<ScopeId>,
    ) -> CaResult<Option<FuncRef>> {
        let NodeKind::FnDef { decl, body } = self.ctx.nodes.get(node).kind.clone() else {
            return err_node(self.ctx, node, "(internal) not a function definition".to_string());
        };
        let NodeKind::FnDecl { name, ret, args, generic_types, .. } =
            self.ctx.nodes.get(decl).kind.clone()
        else {
            return err_node(self.ctx, node, "(internal) missing declaration".to_string());
        };

        if !generic_types.is_empty() && st_type.is_none() {
            // generic functions are only expanded at instantiation
            // sites; pass 1 records them uninstantiated
            return Ok(None);
        }

        let f = self.fn_declare_full(decl, impl_info, st_type)?;

        let fn_scope = self.ctx.nodes.get(node).scope;
        if self.pass == 1 {
            self.lexical_stack
                .push(LexicalScope::function(name, fn_scope));
            let r = self.walk_stmt(body);
            self.lexical_stack.pop();
            r?;
            return Ok(Some(f));
        }

        // support for inner functions: save the insert point of the
        // enclosing function and restore it afterwards
        let saved_bb = self.be.current_block();

        let entry = self.be.append_block(f, "entry");
        let ret_bb = self.be.append_block(f, "ret");
        self.be.set_insert_point(entry);

        // bind parameter slots; the forward rotation stays in effect
        // so `current` is the declaration-time binding while the body
        // is walked (each let advances the ring one step further)
        let decl_scope = self.ctx.nodes.get(decl).scope;
        for (i, &argname) in args.names_slice().iter().enumerate() {
            let Some(psym) = self.ctx.scopes.getsym(decl_scope, argname, false) else {
                let n = self.ctx.interner.get(argname).to_owned();
                return err_node(self.ctx, node, format!("cannot get parameter for {n}"));
            };
            if let Some(shield) = self.ctx.scopes.symbol_mut(psym).shielding_mut() {
                shield.rotate(false);
            }
            let typeid = self
                .ctx
                .scopes
                .symbol(psym)
                .variable()
                .and_then(|v| v.datatype)
                .expect("parameter has a type");
            let span = self.ctx.span_of(decl);
            let pty = self.ctx.get_type_at(decl_scope, typeid, span.beg)?;
            let tref = self.backend_type(pty);
            let pname = self.ctx.interner.get(argname).to_owned();
            let slot = self.be.entry_block_alloca(f, tref, &pname);
            let arg = self.be.func_param(f, i);
            self.be.store(arg, slot);
            if let Some(var) = self.ctx.scopes.symbol_mut(psym).variable_mut() {
                var.value = Some(slot);
            }
        }

        let span = self.ctx.span_of(decl);
        let ret_ty = self.ctx.get_type_at(decl_scope, ret, span.beg)?;
        let ret_slot = if self.ctx.types.get(ret_ty).tok == TypeTok::Void {
            None
        } else {
            let tref = self.backend_type(ret_ty);
            Some(self.be.entry_block_alloca(f, tref, "retslot"))
        };

        self.fn_stack.push(FuncFrame {
            func: f,
            ret_bb,
            ret_slot,
            ret_type: ret_ty,
            label_map: FxHashMap::default(),
            hanging_labels: FxHashMap::default(),
        });
        self.lexical_stack
            .push(LexicalScope::function(name, fn_scope));

        let body_result = self.walk_stmt(body);

        self.lexical_stack.pop();
        let frame = self.fn_stack.pop().expect("function frame");
        body_result?;

        if let Some((label, loc)) = frame.hanging_labels.iter().next() {
            let lname = self.ctx.interner.get(*label).to_owned();
            return Err(Diagnostic::error(*loc, format!("label `{lname}` not defined")).into());
        }

        // the compiler-added final branch into the return block
        if let Some(cur) = self.be.current_block()
            && !self.be.block_terminated(cur)
        {
            self.be.br(frame.ret_bb);
        }
        self.be.set_insert_point(frame.ret_bb);
        match frame.ret_slot {
            Some(slot) => {
                let tref = self.backend_type(frame.ret_type);
                let v = self.be.load(tref, slot, "ret");
                self.be.ret(Some(v));
            }
            None => self.be.ret(None),
        }

        if let Err(msg) = self.be.verify_func(f) {
            let span = self.ctx.span_of(node);
            return Err(Diagnostic::error_range(
                span.beg,
                span.end,
                format!("function verify failed: {msg}"),
            )
            .into());
        }

        // back to the enclosing function (or the synthesized main)
        if let Some(bb) = saved_bb {
            self.be.set_insert_point(bb);
        }
        Ok(Some(f))
    }

    // =========================================================================
    // Impl blocks and traits
    // =========================================================================

    pub(crate) fn walk_fn_def_impl(
        &mut self,
        node: NodeId,
        impl_info: TypeImplInfo,
        items: &[NodeId],
    ) -> CaResult<()> {
        // a throwaway scope aliasing `Self` to the implemented struct;
        // installed as an association overlay while shared trait
        // bodies are walked
        let node_scope = self.ctx.nodes.get(node).scope;
        let self_scope = self.ctx.scopes.push_new(Some(node_scope));
        let self_atom = self.ctx.interner.insert("Self");
        let self_tid = names::form_type_id(&mut self.ctx.interner, self_atom);
        let class_tid = names::form_type_id(&mut self.ctx.interner, impl_info.class_name);
        let span = self.ctx.span_of(node);
        self.ctx.scopes.insert(
            self_scope,
            self_tid,
            span.beg,
            SymbolKind::DataType(DataTypeEntry {
                kind: DataTypeKind::NamedStruct,
                id: class_tid,
                members: None,
                idtable: node_scope,
                runables: Runables::default(),
            }),
        );
        let mut assoc = ScopeAssoc::new(AssocKind::Generic, self_scope);
        assoc.add_item(self_tid);
        assoc.add_item(class_tid);

        let mut use_defaults: Vec<(Atom, NodeId)> = Vec::new();
        if impl_info.trait_name.is_some() {
            self.check_trait_impl_match(node, &impl_info, items, &assoc, &mut use_defaults)?;
        }

        for &item in items {
            self.fn_define_full(item, Some(impl_info), None)?;
        }

        // inherited trait defaults: walk the shared trait body with
        // `Self` bound to the implementing struct
        for (fnname, fn_node) in use_defaults {
            let body_scope = self.ctx.nodes.get(fn_node).scope;
            self.ctx.scopes.scope_mut(body_scope).assoc = Some(assoc.clone());
            self.assoc_depth += 1;

            if self.pass == 1 {
                let cls_sym = self.class_symbol(node, impl_info.class_name)?;
                if let Some(dt) = self.ctx.scopes.symbol_mut(cls_sym).datatype_mut() {
                    dt.runables.add_entry_assoc(
                        impl_info.trait_name.expect("trait impl"),
                        fnname,
                        assoc.clone(),
                    );
                }
            }

            let result = self.fn_define_full(fn_node, Some(impl_info), Some(self_scope));

            self.assoc_depth -= 1;
            self.ctx.scopes.scope_mut(body_scope).assoc = None;
            self.rollback_generic_replacements();
            result?;
        }
        Ok(())
    }

    /// Undo typeid replacements recorded while an instantiation
    /// overlay was active.
    pub(crate) fn rollback_generic_replacements(&mut self) {
        while let Some(rec) = self.generic_stack.pop() {
            if let Some(var) = self.ctx.scopes.symbol_mut(rec.sym).variable_mut() {
                var.datatype = rec.old;
            }
        }
    }

    fn check_trait_impl_match(
        &mut self,
        node: NodeId,
        impl_info: &TypeImplInfo,
        items: &[NodeId],
        assoc: &ScopeAssoc,
        use_defaults: &mut Vec<(Atom, NodeId)>,
    ) -> CaResult<()> {
        let trait_name = impl_info.trait_name.expect("trait impl");
        let scope = self.ctx.nodes.get(node).scope;
        let Some(trait_sym) = self.ctx.scopes.getsym(scope, trait_name, true) else {
            let n = self.ctx.interner.get(trait_name).to_owned();
            return err_node(self.ctx, node, format!("cannot find trait `{n}` definition"));
        };
        let SymbolKind::TraitDef(trait_def) = self.ctx.scopes.symbol(trait_sym).kind.clone()
        else {
            let n = self.ctx.interner.get(trait_name).to_owned();
            return err_node(self.ctx, node, format!("`{n}` is not a trait"));
        };

        let mut implemented: Vec<Atom> = Vec::new();
        for &item in items {
            let NodeKind::FnDef { decl, .. } = self.ctx.nodes.get(item).kind.clone() else {
                continue;
            };
            let NodeKind::FnDecl { name, .. } = self.ctx.nodes.get(decl).kind.clone() else {
                continue;
            };
            let name_text = self.ctx.interner.get(name).to_owned();
            let pure = self.ctx.interner.insert(method_local_name(&name_text));
            let Some(&trait_fn) = trait_def.fnnodes.get(&pure) else {
                let mname = method_local_name(&name_text).to_owned();
                let tname = self.ctx.interner.get(trait_name).to_owned();
                return err_node(
                    self.ctx,
                    item,
                    format!("method `{mname}` is not a member of trait `{tname}`"),
                );
            };
            self.compare_trait_and_impl_signature(item, trait_fn, decl, assoc)?;
            implemented.push(pure);
        }

        // trait items without a body must be implemented; items with a
        // default body fall back to the shared implementation
        let mut missing: Vec<String> = Vec::new();
        for &required in &trait_def.ids_no_def {
            if !implemented.contains(&required) {
                missing.push(format!("`{}`", self.ctx.interner.get(required)));
            }
        }
        if !missing.is_empty() {
            let span = self.ctx.span_of(node);
            return Err(Diagnostic::error_range(
                span.beg,
                span.end,
                format!("not all trait items implemented, missing: {}", missing.join(", ")),
            )
            .into());
        }

        for &with_def in &trait_def.ids_with_def {
            if !implemented.contains(&with_def) {
                let fn_node = trait_def.fnnodes[&with_def];
                use_defaults.push((with_def, fn_node));
            }
        }
        Ok(())
    }

    /// Trait item vs impl item: parameter count, each parameter's
    /// canonical type with `Self` bound through the overlay, and the
    /// return type must all agree.
    fn compare_trait_and_impl_signature(
        &mut self,
        impl_item: NodeId,
        trait_fn: NodeId,
        impl_decl: NodeId,
        assoc: &ScopeAssoc,
    ) -> CaResult<()> {
        let trait_decl = match self.ctx.nodes.get(trait_fn).kind.clone() {
            NodeKind::FnDef { decl, .. } => decl,
            _ => trait_fn,
        };
        let NodeKind::FnDecl { name, args: targs, ret: tret, .. } =
            self.ctx.nodes.get(trait_decl).kind.clone()
        else {
            return err_node(self.ctx, impl_item, "(internal) trait item malformed".to_string());
        };
        let NodeKind::FnDecl { args: iargs, ret: iret, .. } =
            self.ctx.nodes.get(impl_decl).kind.clone()
        else {
            return err_node(self.ctx, impl_item, "(internal) impl item malformed".to_string());
        };

        let sig_mismatch = |ctx: &crate::context::CompilerContext, detail: String| {
            let span = ctx.span_of(impl_item);
            let mname = ctx.interner.get(name).to_owned();
            Diagnostic::error_range(
                span.beg,
                span.end,
                format!("method `{mname}` signature not match the trait declaration"),
            )
            .with_note(None, detail)
        };

        if targs.len() != iargs.len() {
            return Err(sig_mismatch(
                self.ctx,
                format!(
                    "trait declares {} parameters, impl has {}",
                    targs.len(),
                    iargs.len()
                ),
            )
            .into());
        }

        // resolve the trait side under the Self overlay
        let trait_scope = self.ctx.nodes.get(trait_decl).scope;
        let impl_scope = self.ctx.nodes.get(impl_decl).scope;
        let saved = self.ctx.scopes.scope(trait_scope).assoc.clone();
        self.ctx.scopes.scope_mut(trait_scope).assoc = Some(assoc.clone());

        let result = (|| -> CaResult<()> {
            for (i, (&tn, &inm)) in targs
                .names_slice()
                .iter()
                .zip(iargs.names_slice())
                .enumerate()
            {
                // the first parameter must keep the name `self`
                if i == 0 {
                    let self_name = self.ctx.interner.check("self");
                    if Some(tn) == self_name && Some(inm) != self_name {
                        return Err(sig_mismatch(
                            self.ctx,
                            "first parameter of a method must be `self`".to_string(),
                        )
                        .into());
                    }
                }
                let tsym = self.ctx.scopes.getsym(trait_scope, tn, false);
                let isym = self.ctx.scopes.getsym(impl_scope, inm, false);
                let (Some(tsym), Some(isym)) = (tsym, isym) else {
                    return Err(sig_mismatch(self.ctx, "parameter missing".to_string()).into());
                };
                let t_ty = self.param_type_rotated(trait_decl, trait_scope, tsym)?;
                let i_ty = self.param_type_rotated(impl_decl, impl_scope, isym)?;
                if !self.ctx.types.check_identical(t_ty, i_ty) {
                    return Err(sig_mismatch(
                        self.ctx,
                        format!(
                            "parameter {} type `{}` does not match trait type `{}`",
                            i,
                            self.ctx.sig_text(i_ty),
                            self.ctx.sig_text(t_ty)
                        ),
                    )
                    .into());
                }
            }

            let t_ret = self.ctx.get_type(trait_scope, tret)?;
            let i_ret = self.ctx.get_type(impl_scope, iret)?;
            if !self.ctx.types.check_identical(t_ret, i_ret) {
                return Err(sig_mismatch(
                    self.ctx,
                    format!(
                        "return type `{}` does not match trait type `{}`",
                        self.ctx.sig_text(i_ret),
                        self.ctx.sig_text(t_ret)
                    ),
                )
                .into());
            }
            Ok(())
        })();

        self.ctx.scopes.scope_mut(trait_scope).assoc = saved;
        result
    }

    /// Trait definitions register their entry during parse; nothing to
    /// emit here.
    pub(crate) fn walk_trait_fnlist(
        &mut self,
        _node: NodeId,
        _trait_name: Atom,
        _items: &[NodeId],
    ) -> CaResult<()> {
        Ok(())
    }
}
