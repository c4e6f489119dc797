//! The two-pass lowering driver.
//!
//! Pass 1 registers every function prototype (including inner
//! functions and impl methods) under its mangled name and fills the
//! struct impl tables. Pass 2 emits IR bodies with a per-variant
//! dispatch. Expressions produce one `OperandValue` each; statements
//! produce none.

mod agg;
mod call;
mod control;
mod dbgprint;
mod expr;
mod func;
mod letbind;

use crate::context::CompilerContext;
use crate::mangle::LexicalScope;
use ca_ast::arena::RootTree;
use ca_ast::node::NodeKind;
use ca_backend::{Backend, BlockRef, FuncRef, Linkage, TypeRef, ValueRef};
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, ScopeId, SymbolId, TypeId};
use ca_common::interner::Atom;
use ca_common::sloc::Sloc;
use ca_types::{CaTypePayload, TypeTok};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// How an operand value was produced; decides whether a load is
/// needed to obtain the right-value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    Const,
    Calc,
    Load,
    Store,
    /// a stack slot address
    Alloc,
    CallInst,
    Phi,
    /// a heap cell address from `box`
    HeapAlloc,
}

/// The value descriptor every expression walk returns.
#[derive(Clone, Copy, Debug)]
pub struct OperandValue {
    pub kind: OperandKind,
    pub value: ValueRef,
    pub catype: TypeId,
}

impl OperandValue {
    #[must_use]
    pub fn new(kind: OperandKind, value: ValueRef, catype: TypeId) -> Self {
        OperandValue { kind, value, catype }
    }
}

/// Per-function emission state.
pub(crate) struct FuncFrame {
    pub func: FuncRef,
    pub ret_bb: BlockRef,
    pub ret_slot: Option<ValueRef>,
    pub ret_type: TypeId,
    /// function-scoped labels: name → block
    pub label_map: FxHashMap<Atom, BlockRef>,
    /// labels branched to but not yet defined
    pub hanging_labels: FxHashMap<Atom, Sloc>,
}

/// Loop-control frame for `break`/`continue` targets.
pub(crate) struct LoopControl {
    pub cond_bb: BlockRef,
    pub out_bb: BlockRef,
    #[allow(dead_code)]
    pub label: Option<Atom>,
}

/// A reversible typeid replacement done while instantiating a generic
/// or trait-default body.
pub(crate) struct GenericReplace {
    pub sym: SymbolId,
    pub old: Option<Atom>,
}

pub struct Emitter<'a> {
    pub ctx: &'a mut CompilerContext,
    pub be: &'a mut dyn Backend,
    pub(crate) pass: u32,
    pub(crate) fn_stack: Vec<FuncFrame>,
    pub(crate) loop_controls: Vec<LoopControl>,
    pub(crate) lexical_stack: Vec<LexicalScope>,
    pub(crate) lexical_counter: u32,
    /// mangled name → prototype node registered in pass 1
    pub(crate) function_map: FxHashMap<Atom, NodeId>,
    /// mangled name → first declaration node, for redeclaration
    /// checking
    pub(crate) post_check: FxHashMap<Atom, NodeId>,
    pub(crate) generic_stack: Vec<GenericReplace>,
    /// depth of active association overlays (generic instantiation)
    pub(crate) assoc_depth: u32,
    /// named struct types whose backend body has been set
    defined_structs: FxHashSet<Atom>,
}

pub(crate) fn err_node<T>(ctx: &CompilerContext, node: NodeId, msg: String) -> CaResult<T> {
    let span = ctx.span_of(node);
    Err(Diagnostic::error_range(span.beg, span.end, msg).into())
}

impl<'a> Emitter<'a> {
    pub fn new(ctx: &'a mut CompilerContext, be: &'a mut dyn Backend) -> Self {
        Emitter {
            ctx,
            be,
            pass: 0,
            fn_stack: Vec::new(),
            loop_controls: Vec::new(),
            lexical_stack: vec![LexicalScope::global(ScopeId::GLOBAL)],
            lexical_counter: 0,
            function_map: FxHashMap::default(),
            post_check: FxHashMap::default(),
            generic_stack: Vec::new(),
            assoc_depth: 0,
            defined_structs: FxHashSet::default(),
        }
    }

    /// Run both passes over the program.
    pub fn walk(&mut self, tree: &RootTree) -> CaResult<()> {
        debug!(count = tree.count(), "lowering pass 1 (prototypes)");
        self.pass = 1;
        for &node in &tree.nodes {
            self.walk_stmt(node)?;
        }

        debug!("lowering pass 2 (emission)");
        self.pass = 2;
        // top-level statements fold into the synthesized main; the
        // frame sits at the bottom of the stack while function
        // definitions push and pop their own frames above it
        let synth_main = !self.ctx.options.no_main;
        if synth_main {
            self.begin_main()?;
        }

        for &node in &tree.nodes {
            self.walk_stmt(node)?;
        }

        if synth_main {
            self.finish_main()?;
        }
        Ok(())
    }

    fn begin_main(&mut self) -> CaResult<FuncRef> {
        let i32t = self.be.type_int(32);
        let fnty = self.be.type_func(i32t, &[], false);
        let main = self.be.declare_func("main", fnty, Linkage::External, &[]);
        let entry = self.be.append_block(main, "entry");
        let ret_bb = self.be.append_block(main, "ret");
        self.be.set_insert_point(entry);
        let ret_slot = self.be.entry_block_alloca(main, i32t, "retslot");
        let zero = self.be.const_int(i32t, 0);
        self.be.store(zero, ret_slot);
        let i32_ca = self.ctx.types.get_primitive_by_token(TypeTok::I32);
        self.fn_stack.push(FuncFrame {
            func: main,
            ret_bb,
            ret_slot: Some(ret_slot),
            ret_type: i32_ca,
            label_map: FxHashMap::default(),
            hanging_labels: FxHashMap::default(),
        });
        Ok(main)
    }

    fn finish_main(&mut self) -> CaResult<()> {
        let frame = self.fn_stack.pop().expect("main frame");
        if let Some((label, loc)) = frame.hanging_labels.iter().next() {
            let name = self.ctx.interner.get(*label).to_owned();
            return Err(Diagnostic::error(*loc, format!("label `{name}` not defined")).into());
        }
        if let Some(cur) = self.be.current_block()
            && !self.be.block_terminated(cur)
        {
            self.be.br(frame.ret_bb);
        }
        self.be.set_insert_point(frame.ret_bb);
        let i32t = self.be.type_int(32);
        let slot = frame.ret_slot.expect("main has a return slot");
        let v = self.be.load(i32t, slot, "ret");
        self.be.ret(Some(v));
        self.be
            .verify_func(frame.func)
            .map_err(|e| Diagnostic::error(Sloc::synthetic(), e))?;
        Ok(())
    }

    pub(crate) fn curr_func(&self) -> Option<FuncRef> {
        self.fn_stack.last().map(|f| f.func)
    }

    // =========================================================================
    // Statement dispatch
    // =========================================================================

    pub fn walk_stmt(&mut self, node: NodeId) -> CaResult<()> {
        let kind = self.ctx.nodes.get(node).kind.clone();
        match kind {
            NodeKind::Empty
            | NodeKind::Struct { .. }
            | NodeKind::TypeDef { .. }
            | NodeKind::VarDefZeroValue { .. } => Ok(()),
            NodeKind::StmtList { stmts } => {
                for s in stmts {
                    self.walk_stmt(s)?;
                }
                Ok(())
            }
            NodeKind::LexicalBody { stmts, .. } => self.walk_lexical_body(node, stmts),
            NodeKind::FnDecl { .. } => {
                if self.pass == 1 {
                    self.fn_declare_full(node, None, None)?;
                }
                Ok(())
            }
            NodeKind::FnDef { .. } => {
                self.fn_define_full(node, None, None)?;
                Ok(())
            }
            NodeKind::FnDefImpl { impl_info, items } => {
                self.walk_fn_def_impl(node, impl_info, &items)
            }
            NodeKind::TraitFn { trait_name, items } => {
                self.walk_trait_fnlist(node, trait_name, &items)
            }
            NodeKind::LetBind { .. } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_letbind(node)
            }
            NodeKind::Assign { lhs, op, expr } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_assign(node, lhs, op, expr)
            }
            NodeKind::Ret { expr } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_ret(node, expr)
            }
            NodeKind::DbgPrint { expr } => {
                if self.pass == 1 {
                    self.walk_stmt_structure_only(expr);
                    return Ok(());
                }
                self.walk_dbgprint(node, expr)
            }
            NodeKind::DbgPrintType { typeid } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_dbgprinttype(node, typeid)
            }
            NodeKind::While { cond, body } => {
                if self.pass == 1 {
                    self.walk_stmt(body)?;
                    return Ok(());
                }
                self.walk_while(node, cond, body)
            }
            NodeKind::Loop { body } => {
                if self.pass == 1 {
                    self.walk_stmt(body)?;
                    return Ok(());
                }
                self.walk_loop(node, body)
            }
            NodeKind::For { var, list, body } => {
                if self.pass == 1 {
                    self.walk_stmt(body)?;
                    return Ok(());
                }
                self.walk_for(node, var, list, body)
            }
            NodeKind::Break => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_break(node)
            }
            NodeKind::Continue => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_continue(node)
            }
            NodeKind::If { is_expr, conds, bodies, else_body } => {
                if self.pass == 1 {
                    for b in &bodies {
                        self.walk_stmt(*b)?;
                    }
                    if let Some(e) = else_body {
                        self.walk_stmt(e)?;
                    }
                    return Ok(());
                }
                if is_expr {
                    // a statement position if-expression: emit and drop
                    self.walk_if_expr(node, &conds, &bodies, else_body)?;
                    Ok(())
                } else {
                    self.walk_if_stmt(node, &conds, &bodies, else_body)
                }
            }
            NodeKind::Label { name } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_label(node, name)
            }
            NodeKind::LabelGoto { name } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_goto(node, name)
            }
            NodeKind::Drop { name } => {
                if self.pass == 1 {
                    return Ok(());
                }
                self.walk_drop(node, name)
            }
            // expressions in statement position: emit and drop the value
            _ => {
                if self.pass == 1 {
                    self.walk_stmt_structure_only(node);
                    return Ok(());
                }
                self.walk_expr(node).map(|_| ())
            }
        }
    }

    /// Pass-1 structural recursion into expression statements, looking
    /// for nothing but nested definitions (none are legal inside
    /// expressions today).
    fn walk_stmt_structure_only(&mut self, _node: NodeId) {}

    fn walk_lexical_body(&mut self, node: NodeId, stmts: NodeId) -> CaResult<()> {
        let scope = self.ctx.nodes.get(node).scope;
        self.lexical_counter += 1;
        self.lexical_stack
            .push(LexicalScope::block(self.lexical_counter, scope));
        let r = self.walk_stmt(stmts);
        self.lexical_stack.pop();
        r
    }

    // =========================================================================
    // Backend type conversion
    // =========================================================================

    /// Lower a canonical type to a backend type.
    pub(crate) fn backend_type(&mut self, ty: TypeId) -> TypeRef {
        let tok = self.ctx.types.get(ty).tok;
        let payload = self.ctx.types.get(ty).payload.clone();
        match (tok, payload) {
            (TypeTok::Void, _) => self.be.type_void(),
            (TypeTok::Bool, _) => self.be.type_int(1),
            (tok, CaTypePayload::Primitive) if tok.is_integer() => self.be.type_int(tok.bits()),
            (tok, CaTypePayload::Primitive) if tok.is_float() => self.be.type_float(tok.bits()),
            (_, CaTypePayload::Pointer(p)) => {
                let inner = self.backend_type(p.kernel);
                self.be.type_ptr(inner)
            }
            (_, CaTypePayload::Array(a)) => {
                let elem = self.backend_type(a.elem);
                self.be.type_array(elem, a.dims[0])
            }
            (_, CaTypePayload::Struct(s)) => {
                if s.name.is_none() {
                    let fields: Vec<TypeRef> =
                        s.fields.iter().map(|f| self.backend_type(f.ty)).collect();
                    self.be.type_struct(&fields, s.packed)
                } else {
                    let name = self.ctx.interner.get(s.name).to_owned();
                    let tref = self.be.type_named_struct(&name);
                    let sig = self.ctx.types.get(ty).signature;
                    if self.defined_structs.insert(sig) {
                        let fields: Vec<TypeRef> =
                            s.fields.iter().map(|f| self.backend_type(f.ty)).collect();
                        self.be.set_struct_body(tref, &fields, s.packed);
                    }
                    tref
                }
            }
            (_, CaTypePayload::Range(r)) => match r.packaged {
                Some(p) => self.backend_type(p),
                None => self.be.type_void(),
            },
            (TypeTok::CString, _) => {
                let i8t = self.be.type_int(8);
                self.be.type_ptr(i8t)
            }
            _ => self.be.type_void(),
        }
    }

    /// Load through a stack slot when the caller asked for a
    /// right-value. Heap frames already carry the pointer r-value.
    pub(crate) fn right_value(&mut self, op: OperandValue, load: bool) -> (ValueRef, TypeId) {
        if load && op.kind == OperandKind::Alloc {
            let t = self.backend_type(op.catype);
            let v = self.be.load(t, op.value, "load");
            return (v, op.catype);
        }
        (op.value, op.catype)
    }

    /// Walk an expression and return its right-value.
    pub(crate) fn walk_right_value(
        &mut self,
        node: NodeId,
        load: bool,
    ) -> CaResult<(ValueRef, TypeId)> {
        let op = self.walk_expr(node)?;
        Ok(self.right_value(op, load))
    }

    // =========================================================================
    // Runtime prototypes, declared on first use
    // =========================================================================

    pub(crate) fn printf_fn(&mut self) -> FuncRef {
        if let Some(f) = self.be.get_func("printf") {
            return f;
        }
        let i32t = self.be.type_int(32);
        let i8t = self.be.type_int(8);
        let i8p = self.be.type_ptr(i8t);
        let fnty = self.be.type_func(i32t, &[i8p], true);
        self.be.declare_func("printf", fnty, Linkage::External, &["fmt"])
    }

    pub(crate) fn box_fn(&mut self) -> FuncRef {
        if let Some(f) = self.be.get_func("GC_malloc") {
            return f;
        }
        let i64t = self.be.type_int(64);
        let i8t = self.be.type_int(8);
        let i8p = self.be.type_ptr(i8t);
        let fnty = self.be.type_func(i8p, &[i64t], false);
        self.be
            .declare_func("GC_malloc", fnty, Linkage::External, &["size"])
    }

    pub(crate) fn drop_fn(&mut self) -> FuncRef {
        if let Some(f) = self.be.get_func("GC_free") {
            return f;
        }
        let void = self.be.type_void();
        let i8t = self.be.type_int(8);
        let i8p = self.be.type_ptr(i8t);
        let fnty = self.be.type_func(void, &[i8p], false);
        self.be
            .declare_func("GC_free", fnty, Linkage::External, &["ptr"])
    }
}
