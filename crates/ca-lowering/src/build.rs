//! Parser-facing AST constructors.
//!
//! The external front-end drives these to build nodes and fill the
//! symbol table as scopes open and close. Scope management, formal
//! argument lists, actual argument stacks, if-construction and impl
//! nesting mirror the classic parser auxiliary surface.

use crate::context::CompilerContext;
use ca_ast::arena::RootTree;
use ca_ast::arglist::ArgList;
use ca_ast::literal::{CaLiteral, LitKind, LitValue};
use ca_ast::node::{
    ExprOp, FieldName, ForVar, ForVarKind, GrammarContext, IdKind, NodeKind, RangeKind,
    TypeImplInfo, VarInitKind,
};
use ca_ast::pattern::CaPattern;
use ca_binder::runables::Runables;
use ca_binder::symbol::{
    CaVariable, DataTypeEntry, DataTypeKind, FnSig, FuncKind, SymbolKind, TraitDefEntry,
};
use ca_common::diagnostics::{CaResult, Diagnostic};
use ca_common::ids::{NodeId, ScopeId};
use ca_common::interner::Atom;
use ca_common::names;
use ca_common::sloc::{Sloc, Span};
use rustc_hash::FxHashMap;

/// Builder state threaded by the front-end.
pub struct AstBuilder<'a> {
    pub ctx: &'a mut CompilerContext,
    scope_stack: Vec<ScopeId>,
    impl_stack: Vec<TypeImplInfo>,
    pub root: RootTree,
    loc: Sloc,
}

impl<'a> AstBuilder<'a> {
    pub fn new(ctx: &'a mut CompilerContext) -> Self {
        AstBuilder {
            ctx,
            scope_stack: vec![ScopeId::GLOBAL],
            impl_stack: Vec::new(),
            root: RootTree::new(ScopeId::GLOBAL),
            loc: Sloc::new(1, 0),
        }
    }

    /// Set the source location applied to subsequently built nodes.
    pub fn at(&mut self, row: u32, col: u32) -> &mut Self {
        self.loc = Sloc::new(row, col);
        self
    }

    fn span(&self) -> Span {
        Span::at(self.loc)
    }

    #[must_use]
    pub fn curr_scope(&self) -> ScopeId {
        *self.scope_stack.last().expect("scope stack is never empty")
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let scope = self.curr_scope();
        let span = self.span();
        self.ctx.nodes.alloc(kind, scope, span)
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    pub fn push_symtable(&mut self) -> ScopeId {
        let parent = self.curr_scope();
        let scope = self.ctx.scopes.push_new(Some(parent));
        self.scope_stack.push(scope);
        scope
    }

    pub fn pop_symtable(&mut self) -> ScopeId {
        let scope = self.scope_stack.pop().expect("pop on empty scope stack");
        assert!(!self.scope_stack.is_empty(), "global scope popped");
        scope
    }

    // =========================================================================
    // Top level
    // =========================================================================

    /// Append a finished top-level node to the program.
    pub fn add_top(&mut self, node: NodeId) {
        let span = self.ctx.nodes.get(node).span;
        self.root.push(node, span);
    }

    // =========================================================================
    // Literals
    // =========================================================================

    pub fn create_literal(&mut self, kind: LitKind, text: &str) -> CaLiteral {
        let atom = self.ctx.interner.insert(text);
        CaLiteral::new(kind, atom, self.span())
    }

    pub fn create_string_literal(&mut self, text: &str) -> CaLiteral {
        let atom = self.ctx.interner.insert(text);
        let mut lit = CaLiteral::new(LitKind::CString, atom, self.span());
        lit.value = LitValue::Str {
            text: atom,
            len: text.len() as u32,
        };
        // a string literal is born typed: *i8
        let i8_id = names::form_type_id_by_str(&mut self.ctx.interner, "i8");
        lit.datatype = Some(names::form_pointer_id(&mut self.ctx.interner, i8_id));
        lit.fixed_type = true;
        lit
    }

    pub fn make_literal(&mut self, lit: CaLiteral) -> NodeId {
        self.alloc(NodeKind::Literal(lit))
    }

    /// Shorthand for an integer literal node.
    pub fn int_lit(&mut self, text: &str) -> NodeId {
        let kind = if text.starts_with('-') {
            LitKind::I64
        } else {
            LitKind::U64
        };
        let lit = self.create_literal(kind, text);
        self.make_literal(lit)
    }

    pub fn float_lit(&mut self, text: &str) -> NodeId {
        let lit = self.create_literal(LitKind::F64, text);
        self.make_literal(lit)
    }

    pub fn bool_lit(&mut self, value: bool) -> NodeId {
        let lit = self.create_literal(LitKind::Bool, if value { "true" } else { "false" });
        self.make_literal(lit)
    }

    // =========================================================================
    // Identifiers, types and names
    // =========================================================================

    pub fn name(&mut self, s: &str) -> Atom {
        self.ctx.interner.insert(s)
    }

    /// Typeid for a source-level type name (`i32`, `*AA`, `[i32;3]`).
    pub fn type_id(&mut self, s: &str) -> Atom {
        names::form_type_id_by_str(&mut self.ctx.interner, s)
    }

    pub fn make_id(&mut self, name: &str, id_kind: IdKind) -> NodeId {
        let atom = self.name(name);
        self.alloc(NodeKind::Id {
            name: atom,
            id_kind,
        })
    }

    pub fn make_ident_expr(&mut self, name: &str) -> NodeId {
        self.make_id(name, IdKind::VarUse)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn make_expr(&mut self, op: ExprOp, operands: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Expr {
            op,
            operands,
            expr_type: None,
        })
    }

    pub fn make_uminus_expr(&mut self, expr: NodeId) -> NodeId {
        self.make_expr(ExprOp::Minus, vec![expr])
    }

    pub fn make_as(&mut self, expr: NodeId, typeid: Atom) -> NodeId {
        self.alloc(NodeKind::As { expr, typeid })
    }

    pub fn make_sizeof(&mut self, typeid: Atom) -> NodeId {
        self.alloc(NodeKind::SizeOf { typeid })
    }

    /// `typeof(expr)` is a type former: it yields a typeid carrying a
    /// hole the unwinder resolves through expression inference.
    pub fn make_typeof(&mut self, expr: NodeId) -> Atom {
        names::form_expr_typeof_id(&mut self.ctx.interner, expr)
    }

    pub fn make_deref(&mut self, expr: NodeId) -> NodeId {
        self.make_expr(ExprOp::Deref, vec![expr])
    }

    pub fn make_address(&mut self, expr: NodeId) -> NodeId {
        self.make_expr(ExprOp::Address, vec![expr])
    }

    pub fn make_boxed_expr(&mut self, expr: NodeId) -> NodeId {
        self.make_expr(ExprOp::Box, vec![expr])
    }

    pub fn make_drop(&mut self, name: &str) -> NodeId {
        let atom = self.name(name);
        self.alloc(NodeKind::Drop { name: atom })
    }

    pub fn make_general_range(
        &mut self,
        kind: RangeKind,
        start: Option<NodeId>,
        end: Option<NodeId>,
    ) -> NodeId {
        let inclusive = matches!(kind, RangeKind::Inclusive | RangeKind::InclusiveTo);
        let range = self.alloc(NodeKind::Range {
            kind,
            inclusive,
            start,
            end,
        });
        self.make_expr(ExprOp::Range, vec![range])
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn make_empty(&mut self) -> NodeId {
        self.alloc(NodeKind::Empty)
    }

    pub fn make_stmt_print(&mut self, expr: NodeId) -> NodeId {
        self.alloc(NodeKind::DbgPrint { expr })
    }

    pub fn make_stmt_print_datatype(&mut self, typeid: Atom) -> NodeId {
        self.alloc(NodeKind::DbgPrintType { typeid })
    }

    pub fn make_stmt_ret(&mut self) -> NodeId {
        self.alloc(NodeKind::Ret { expr: None })
    }

    pub fn make_stmt_ret_expr(&mut self, expr: NodeId) -> NodeId {
        self.alloc(NodeKind::Ret { expr: Some(expr) })
    }

    pub fn make_stmt_list_zip(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::StmtList { stmts })
    }

    pub fn make_lexical_body(&mut self, stmts: NodeId) -> NodeId {
        self.alloc(NodeKind::LexicalBody {
            stmts,
            fn_buddy: None,
        })
    }

    /// Statement-expression block `{ stmts; expr }`.
    pub fn make_stmtexpr_list(&mut self, mut stmts: Vec<NodeId>, expr: NodeId) -> NodeId {
        stmts.push(expr);
        let node = self.make_expr(ExprOp::StmtExpr, stmts);
        self.ctx.nodes.get_mut(node).grammar = GrammarContext::StmtExpr;
        node
    }

    // =========================================================================
    // Bindings and assignment
    // =========================================================================

    /// Register every name a pattern binds; re-binding an existing
    /// name pushes the prior binding onto its shielding ring.
    fn register_pattern_vars(&mut self, cap: &CaPattern) {
        let scope = self.curr_scope();
        let loc = self.loc;
        let mut names_bound = Vec::new();
        cap.for_each_binding(&mut |name| names_bound.push(name));
        for name in names_bound {
            let var = CaVariable::new(name, None, loc);
            self.ctx.scopes.insert_shielded_var(scope, name, loc, var);
        }
    }

    pub fn make_let_stmt(&mut self, cap: CaPattern, expr: NodeId) -> NodeId {
        self.register_pattern_vars(&cap);
        self.alloc(NodeKind::LetBind {
            pattern: Box::new(cap),
            expr,
            global: false,
        })
    }

    /// Top-level binding: the storage becomes a backend global.
    pub fn make_global_vardef(&mut self, cap: CaPattern, expr: NodeId) -> NodeId {
        self.register_pattern_vars(&cap);
        self.alloc(NodeKind::LetBind {
            pattern: Box::new(cap),
            expr,
            global: true,
        })
    }

    pub fn make_vardef_zero_value(&mut self, init: VarInitKind) -> NodeId {
        self.alloc(NodeKind::VarDefZeroValue { init })
    }

    pub fn make_assign(&mut self, lhs: NodeId, expr: NodeId) -> NodeId {
        self.alloc(NodeKind::Assign {
            lhs,
            op: None,
            expr,
        })
    }

    pub fn make_assign_op(&mut self, lhs: NodeId, op: ExprOp, expr: NodeId) -> NodeId {
        self.alloc(NodeKind::Assign {
            lhs,
            op: Some(op),
            expr,
        })
    }

    /// Assignment target forms.
    pub fn make_deref_left(&mut self, deref_count: u32, expr: NodeId) -> NodeId {
        self.alloc(NodeKind::DerefLeft { deref_count, expr })
    }

    pub fn make_arrayitem_left(&mut self, array: NodeId, indices: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::ArrayItemLeft { array, indices })
    }

    pub fn make_structfield_left(&mut self, expr: NodeId, field: FieldName, direct: bool) -> NodeId {
        self.alloc(NodeKind::StructFieldOpLeft {
            expr,
            field,
            direct,
        })
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    pub fn make_if(
        &mut self,
        is_expr: bool,
        conds: Vec<NodeId>,
        bodies: Vec<NodeId>,
        else_body: Option<NodeId>,
    ) -> NodeId {
        let node = self.alloc(NodeKind::If {
            is_expr,
            conds,
            bodies,
            else_body,
        });
        if is_expr {
            self.make_expr(ExprOp::IfExpr, vec![node])
        } else {
            node
        }
    }

    pub fn make_while(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.alloc(NodeKind::While { cond, body })
    }

    pub fn make_loop(&mut self, body: NodeId) -> NodeId {
        self.alloc(NodeKind::Loop { body })
    }

    pub fn make_break(&mut self) -> NodeId {
        self.alloc(NodeKind::Break)
    }

    pub fn make_continue(&mut self) -> NodeId {
        self.alloc(NodeKind::Continue)
    }

    /// Register the loop variable of a `for` in the current scope.
    pub fn make_for_var_entry(&mut self, name: &str) -> Atom {
        let atom = self.name(name);
        let loc = self.loc;
        let scope = self.curr_scope();
        let var = CaVariable::new(atom, None, loc);
        self.ctx.scopes.insert_shielded_var(scope, atom, loc, var);
        atom
    }

    pub fn make_for(&mut self, var: ForVar, list: NodeId, body: NodeId) -> NodeId {
        self.alloc(NodeKind::For { var, list, body })
    }

    pub fn make_for_value(&mut self, var_name: &str, list: NodeId, body: NodeId) -> NodeId {
        let name = self.make_for_var_entry(var_name);
        self.make_for(
            ForVar {
                kind: ForVarKind::Value,
                name,
            },
            list,
            body,
        )
    }

    pub fn make_goto(&mut self, label: &str) -> NodeId {
        let atom = self.name(label);
        // a goto forward-declares its label until the definition site
        let label_id = names::form_label_id(&mut self.ctx.interner, atom);
        let scope = self.curr_scope();
        let loc = self.loc;
        self.ctx
            .scopes
            .check_insert(scope, label_id, loc, SymbolKind::LabelHanging);
        self.alloc(NodeKind::LabelGoto { name: atom })
    }

    pub fn make_label_def(&mut self, label: &str) -> NodeId {
        let atom = self.name(label);
        let label_id = names::form_label_id(&mut self.ctx.interner, atom);
        let scope = self.curr_scope();
        let loc = self.loc;
        let sym = self
            .ctx
            .scopes
            .check_insert(scope, label_id, loc, SymbolKind::Label);
        // a hanging forward declaration graduates to defined
        if matches!(self.ctx.scopes.symbol(sym).kind, SymbolKind::LabelHanging) {
            self.ctx.scopes.symbol_mut(sym).kind = SymbolKind::Label;
        }
        self.alloc(NodeKind::Label { name: atom })
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Open a function: pushes the function's scope; parameters are
    /// added with `add_fn_arg` before `make_fn_proto` closes over
    /// them.
    pub fn begin_fn(&mut self) -> ScopeId {
        self.push_symtable()
    }

    /// Add one formal parameter into the current (function) scope.
    pub fn add_fn_arg(&mut self, args: &mut ArgList, name: &str, typeid: Atom) -> CaResult<()> {
        let atom = self.name(name);
        if !args.push_name(atom) {
            return Err(Diagnostic::error(
                self.loc,
                format!("too many arguments, only {} supported", ca_common::limits::MAX_ARGS),
            )
            .into());
        }
        let loc = self.loc;
        let scope = self.curr_scope();
        let var = CaVariable::new(atom, Some(typeid), loc);
        self.ctx.scopes.insert_shielded_var(scope, atom, loc, var);
        Ok(())
    }

    pub fn new_arglist(&mut self) -> ArgList {
        ArgList::names(self.curr_scope())
    }

    /// Close a prototype. Inside an `impl` the name is recorded in its
    /// method-id form so methods of different types never collide.
    pub fn make_fn_proto(&mut self, name: &str, args: ArgList, ret: Atom) -> NodeId {
        let plain = self.name(name);
        let (name_atom, kind) = match self.impl_stack.last().copied() {
            Some(info) => {
                let id = names::form_method_id(
                    &mut self.ctx.interner,
                    plain,
                    info.class_name,
                    info.trait_name,
                );
                let kind = if info.trait_name.is_some() {
                    FuncKind::METHOD_FOR_TRAIT
                } else {
                    FuncKind::METHOD
                };
                (id, kind)
            }
            None => (plain, FuncKind::FUNCTION),
        };

        let node = self.alloc(NodeKind::FnDecl {
            name: name_atom,
            ret,
            args: args.clone(),
            is_extern: false,
            generic_types: Vec::new(),
        });

        // the entry lives in the scope enclosing the function
        let fn_scope = self.curr_scope();
        let entry_scope = self.ctx.scopes.parent_or_global(fn_scope);
        let sig = FnSig {
            args,
            rettype: ret,
            mangled_id: None,
            kind,
            generic_types: Vec::new(),
        };
        self.ctx.scopes.check_insert(
            entry_scope,
            name_atom,
            self.loc,
            SymbolKind::FnDecl(sig),
        );
        node
    }

    pub fn make_fn_decl(&mut self, proto: NodeId) -> NodeId {
        // an extern declaration keeps only its prototype
        if let NodeKind::FnDecl { is_extern, .. } = &mut self.ctx.nodes.get_mut(proto).kind {
            *is_extern = true;
        }
        self.pop_symtable();
        proto
    }

    /// Close a bodyless prototype (trait items) without marking it
    /// extern.
    pub fn end_fn_proto(&mut self, proto: NodeId) -> NodeId {
        self.pop_symtable();
        proto
    }

    /// Close a function definition; pops the scope `begin_fn` opened.
    pub fn make_fn_def(&mut self, proto: NodeId, body: NodeId) -> NodeId {
        let node = self.alloc(NodeKind::FnDef { decl: proto, body });
        // upgrade the symbol to a definition
        let NodeKind::FnDecl { name, .. } = self.ctx.nodes.get(proto).kind.clone() else {
            unreachable!("make_fn_def takes a prototype");
        };
        let fn_scope = self.ctx.nodes.get(proto).scope;
        let entry_scope = self.ctx.scopes.parent_or_global(fn_scope);
        if let Some(sym) = self.ctx.scopes.getsym(entry_scope, name, false)
            && let SymbolKind::FnDecl(sig) = self.ctx.scopes.symbol(sym).kind.clone()
        {
            self.ctx.scopes.symbol_mut(sym).kind = SymbolKind::FnDef(sig);
        }
        self.pop_symtable();
        node
    }

    // =========================================================================
    // Calls
    // =========================================================================

    pub fn make_arglist_actual(&mut self, exprs: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::ArgList { exprs })
    }

    /// Function call or named-tuple construction; the resolver
    /// disambiguates by symbol kind.
    pub fn make_fn_call_or_tuple(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        let id = self.make_id(name, IdKind::FnName);
        let arglist = self.make_arglist_actual(args);
        self.make_expr(ExprOp::FnCall, vec![id, arglist])
    }

    pub fn make_method_call(
        &mut self,
        receiver: NodeId,
        method: &str,
        direct: bool,
        args: Vec<NodeId>,
    ) -> NodeId {
        let matom = self.name(method);
        let sfop = self.alloc(NodeKind::StructFieldOpRight {
            expr: receiver,
            field: FieldName::Named(matom),
            direct,
        });
        let item = self.make_expr(ExprOp::StructItem, vec![sfop]);
        let arglist = self.make_arglist_actual(args);
        self.make_expr(ExprOp::FnCall, vec![item, arglist])
    }

    pub fn make_domain_call(&mut self, parts: &[&str], args: Vec<NodeId>) -> NodeId {
        let atoms: Vec<Atom> = parts.iter().map(|p| self.ctx.interner.insert(p)).collect();
        let domain = self.alloc(NodeKind::Domain {
            relative: false,
            parts: atoms,
        });
        let arglist = self.make_arglist_actual(args);
        self.make_expr(ExprOp::FnCall, vec![domain, arglist])
    }

    /// `<Type as Trait>::method(args)`.
    pub fn make_domain_as_call(
        &mut self,
        main: &str,
        trait_name: &str,
        method: &str,
        args: Vec<NodeId>,
    ) -> NodeId {
        let main_atom = self.name(main);
        let trait_atom = self.name(trait_name);
        let fn_atom = self.name(method);
        let domain = self.alloc(NodeKind::DomainAs {
            main: vec![main_atom],
            trait_path: vec![trait_atom],
            fnname: fn_atom,
        });
        let arglist = self.make_arglist_actual(args);
        self.make_expr(ExprOp::FnCall, vec![domain, arglist])
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    pub fn make_array_def(&mut self, elems: Vec<NodeId>) -> NodeId {
        let def = self.alloc(NodeKind::ArrayDef {
            elems,
            repeat: None,
        });
        self.make_expr(ExprOp::Array, vec![def])
    }

    /// `[expr; N]` repeat form.
    pub fn make_array_def_fill(&mut self, expr: NodeId, count: u64) -> NodeId {
        let def = self.alloc(NodeKind::ArrayDef {
            elems: vec![expr],
            repeat: Some(count),
        });
        self.make_expr(ExprOp::Array, vec![def])
    }

    pub fn make_arrayitem_right(&mut self, array: NodeId, indices: Vec<NodeId>) -> NodeId {
        let item = self.alloc(NodeKind::ArrayItemRight { array, indices });
        self.make_expr(ExprOp::ArrayItem, vec![item])
    }

    pub fn make_structfield_right(&mut self, expr: NodeId, field: FieldName, direct: bool) -> NodeId {
        let sfop = self.alloc(NodeKind::StructFieldOpRight {
            expr,
            field,
            direct,
        });
        self.make_expr(ExprOp::StructItem, vec![sfop])
    }

    pub fn field_named(&mut self, name: &str) -> FieldName {
        FieldName::Named(self.name(name))
    }

    /// Named-field struct expression `S { f: e, ... }`.
    pub fn make_struct_expr(&mut self, name: &str, fields: Vec<(&str, NodeId)>) -> NodeId {
        let atom = self.name(name);
        let fields = fields
            .into_iter()
            .map(|(f, e)| (Some(self.ctx.interner.insert(f)), e))
            .collect();
        let sexpr = self.alloc(NodeKind::StructExpr {
            name: atom,
            fields,
            named: true,
        });
        self.make_expr(ExprOp::Struct, vec![sexpr])
    }

    /// General (unnamed) tuple expression `(e1, e2, ...)`.
    pub fn make_gen_tuple_expr(&mut self, exprs: Vec<NodeId>) -> NodeId {
        let arglist = self.make_arglist_actual(exprs);
        self.make_expr(ExprOp::Tuple, vec![arglist])
    }

    // =========================================================================
    // Type definitions
    // =========================================================================

    /// `struct S { f1: T1, ... }` (named) or `struct S(T1, T2)`
    /// (tuple).
    pub fn make_struct_type(
        &mut self,
        name: &str,
        members: &[(&str, Atom)],
        tuple: bool,
    ) -> CaResult<NodeId> {
        let atom = self.name(name);
        let scope = self.curr_scope();
        let member_scope = self.ctx.scopes.push_new(Some(scope));

        let mut args = if tuple {
            ArgList::types(member_scope)
        } else {
            ArgList::names(member_scope)
        };
        for (mname, mtype) in members {
            if tuple {
                if !args.push_type(*mtype) {
                    return Err(Diagnostic::error(self.loc, "too many tuple members").into());
                }
            } else {
                let matom = self.ctx.interner.insert(mname);
                if !args.push_name(matom) {
                    return Err(Diagnostic::error(self.loc, "too many struct members").into());
                }
                let var = CaVariable::new(matom, Some(*mtype), self.loc);
                self.ctx
                    .scopes
                    .insert_shielded_var(member_scope, matom, self.loc, var);
            }
        }

        let typeid = names::form_type_id(&mut self.ctx.interner, atom);
        self.ctx.scopes.insert(
            scope,
            typeid,
            self.loc,
            SymbolKind::DataType(DataTypeEntry {
                kind: if tuple {
                    DataTypeKind::NamedTuple
                } else {
                    DataTypeKind::NamedStruct
                },
                id: typeid,
                members: Some(args),
                idtable: member_scope,
                runables: Runables::default(),
            }),
        );
        Ok(self.alloc(NodeKind::Struct { name: atom }))
    }

    /// `type New = Old;`
    pub fn make_type_def(&mut self, name: &str, typeid: Atom) -> NodeId {
        let atom = self.name(name);
        let scope = self.curr_scope();
        let new_id = names::form_type_id(&mut self.ctx.interner, atom);
        self.ctx.scopes.insert(
            scope,
            new_id,
            self.loc,
            SymbolKind::DataType(DataTypeEntry {
                kind: DataTypeKind::NamedStruct,
                id: typeid,
                members: None,
                idtable: scope,
                runables: Runables::default(),
            }),
        );
        self.alloc(NodeKind::TypeDef {
            newname: atom,
            typeid,
        })
    }

    // =========================================================================
    // Impl blocks
    // =========================================================================

    pub fn begin_impl_type(&mut self, class: &str) -> TypeImplInfo {
        let class_name = self.name(class);
        TypeImplInfo {
            class_name,
            trait_name: None,
        }
    }

    pub fn begin_impl_trait_for_type(&mut self, trait_name: &str, class: &str) -> TypeImplInfo {
        let class_name = self.name(class);
        let trait_atom = self.name(trait_name);
        TypeImplInfo {
            class_name,
            trait_name: Some(trait_atom),
        }
    }

    pub fn push_type_impl(&mut self, info: TypeImplInfo) {
        self.impl_stack.push(info);
    }

    pub fn pop_type_impl(&mut self) {
        self.impl_stack.pop();
    }

    /// The canonical `self` parameter type inside the current impl:
    /// a pointer to the implemented struct.
    pub fn self_param_type(&mut self) -> Atom {
        let info = *self.impl_stack.last().expect("inside an impl block");
        let class_tid = names::form_type_id(&mut self.ctx.interner, info.class_name);
        names::form_pointer_id(&mut self.ctx.interner, class_tid)
    }

    pub fn make_fn_def_impl(&mut self, info: TypeImplInfo, items: Vec<NodeId>) -> NodeId {
        // trait impls leave a marker entry under their impl id
        if let Some(trait_name) = info.trait_name {
            let impl_id = {
                let class = self.ctx.interner.get(info.class_name).to_owned();
                let tname = self.ctx.interner.get(trait_name).to_owned();
                self.ctx.interner.insert(&format!("{class}::<{tname}>"))
            };
            let scope = self.curr_scope();
            self.ctx.scopes.check_insert(
                scope,
                impl_id,
                self.loc,
                SymbolKind::TraitImpl(info),
            );
        }
        self.alloc(NodeKind::FnDefImpl {
            impl_info: info,
            items,
        })
    }

    // =========================================================================
    // Traits
    // =========================================================================

    /// Register a trait definition. Items are prototypes (`FnDecl`)
    /// or default implementations (`FnDef`).
    pub fn make_trait_defs(&mut self, trait_name: &str, items: Vec<NodeId>) -> NodeId {
        let atom = self.name(trait_name);
        let node = self.alloc(NodeKind::TraitFn {
            trait_name: atom,
            items: items.clone(),
        });

        let mut fnnodes = FxHashMap::default();
        let mut ids_with_def = Vec::new();
        let mut ids_no_def = Vec::new();
        for &item in &items {
            match self.ctx.nodes.get(item).kind.clone() {
                NodeKind::FnDef { decl, .. } => {
                    if let NodeKind::FnDecl { name, .. } = self.ctx.nodes.get(decl).kind {
                        fnnodes.insert(name, item);
                        ids_with_def.push(name);
                    }
                }
                NodeKind::FnDecl { name, .. } => {
                    fnnodes.insert(name, item);
                    ids_no_def.push(name);
                }
                _ => {}
            }
        }

        let scope = self.curr_scope();
        self.ctx.scopes.insert(
            scope,
            atom,
            self.loc,
            SymbolKind::TraitDef(TraitDefEntry {
                node,
                fnnodes,
                ids_with_def,
                ids_no_def,
            }),
        );
        node
    }
}
