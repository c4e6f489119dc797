use ca_ast::arglist::ArgList;
use ca_binder::runables::Runables;
use ca_binder::scope::ScopeArena;
use ca_binder::symbol::{CaVariable, DataTypeEntry, DataTypeKind, SymbolKind};
use ca_common::ids::ScopeId;
use ca_common::interner::Interner;
use ca_common::names;
use ca_common::sloc::Sloc;
use ca_types::{CaStructKind, TypeArena, TypeTok};

struct Ctx {
    it: Interner,
    scopes: ScopeArena,
    types: TypeArena,
}

impl Ctx {
    fn new() -> Self {
        let mut it = Interner::new();
        let types = TypeArena::new(&mut it);
        Ctx {
            it,
            scopes: ScopeArena::new(),
            types,
        }
    }

    /// `type <name> = <target>;`
    fn define_alias(&mut self, scope: ScopeId, name: &str, target: &str) {
        let tid = names::form_type_id_by_str(&mut self.it, name);
        let target_id = names::form_type_id_by_str(&mut self.it, target);
        self.scopes.insert(
            scope,
            tid,
            Sloc::new(1, 0),
            SymbolKind::DataType(DataTypeEntry {
                kind: DataTypeKind::NamedStruct,
                id: target_id,
                members: None,
                idtable: scope,
                runables: Runables::default(),
            }),
        );
    }

    /// `struct <name> { <field>: <type>, ... }`
    fn define_struct(&mut self, scope: ScopeId, name: &str, fields: &[(&str, &str)]) {
        let member_scope = self.scopes.push_new(Some(scope));
        let mut args = ArgList::names(member_scope);
        for (fname, ftype) in fields {
            let fatom = self.it.insert(fname);
            let ftid = names::form_type_id_by_str(&mut self.it, ftype);
            args.push_name(fatom);
            let var = CaVariable::new(fatom, Some(ftid), Sloc::new(1, 0));
            self.scopes.insert_shielded_var(member_scope, fatom, var.loc, var);
        }
        let tid = names::form_type_id_by_str(&mut self.it, name);
        self.scopes.insert(
            scope,
            tid,
            Sloc::new(1, 0),
            SymbolKind::DataType(DataTypeEntry {
                kind: DataTypeKind::NamedStruct,
                id: tid,
                members: Some(args),
                idtable: member_scope,
                runables: Runables::default(),
            }),
        );
    }

    fn resolve(&mut self, scope: ScopeId, name: &str) -> ca_common::ids::TypeId {
        let tid = names::form_type_id_by_str(&mut self.it, name);
        self.types
            .get_by_name(&mut self.it, &self.scopes, scope, tid)
            .unwrap()
    }

    fn sig_of(&mut self, scope: ScopeId, name: &str) -> String {
        let id = self.resolve(scope, name);
        self.it.get(self.types.get(id).signature).to_owned()
    }
}

#[test]
fn primitives_unwind_to_themselves() {
    let mut ctx = Ctx::new();
    for name in ["i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "bool"] {
        assert_eq!(ctx.sig_of(ScopeId::GLOBAL, name), format!("t:{name}"));
    }
}

#[test]
fn get_by_name_is_idempotent() {
    let mut ctx = Ctx::new();
    ctx.define_alias(ScopeId::GLOBAL, "AA", "*i32");
    let a = ctx.resolve(ScopeId::GLOBAL, "AA");
    let b = ctx.resolve(ScopeId::GLOBAL, "AA");
    assert_eq!(a, b);
}

#[test]
fn alias_chains_unwind_structurally() {
    let mut ctx = Ctx::new();
    // type AA = *[*BB;3]; type BB = *i32  =>  AA == *[**i32;3]
    ctx.define_alias(ScopeId::GLOBAL, "BB", "*i32");
    ctx.define_alias(ScopeId::GLOBAL, "AA", "*[*BB;3]");
    assert_eq!(ctx.sig_of(ScopeId::GLOBAL, "AA"), "t:*[**i32;3]");
}

#[test]
fn alias_and_target_share_one_type() {
    let mut ctx = Ctx::new();
    ctx.define_alias(ScopeId::GLOBAL, "AA", "*i32");
    let via_alias = ctx.resolve(ScopeId::GLOBAL, "AA");
    let direct = ctx.resolve(ScopeId::GLOBAL, "*i32");
    assert_eq!(via_alias, direct);
}

#[test]
fn recursive_pointer_struct() {
    let mut ctx = Ctx::new();
    // struct A { a: *A, b: i32 }
    ctx.define_struct(ScopeId::GLOBAL, "A", &[("a", "*A"), ("b", "i32")]);
    let id = ctx.resolve(ScopeId::GLOBAL, "A");
    assert_eq!(
        ctx.it.get(ctx.types.get(id).signature),
        "t:{A;a:*A,b:i32}"
    );
    // 8 (pointer) + 4 (i32) padded to pointer alignment
    assert_eq!(ctx.types.get(id).size, 16);

    // the pointer field closes the cycle onto the same object
    let strukt = ctx.types.get(id).strukt().unwrap().clone();
    let field_a = ctx.types.get(strukt.fields[0].ty);
    let kernel = field_a.pointer().unwrap().kernel;
    assert_eq!(kernel, id);
}

#[test]
fn value_recursion_is_rejected() {
    let mut ctx = Ctx::new();
    // struct A { a: A, b: i32 } has unbounded size
    ctx.define_struct(ScopeId::GLOBAL, "A", &[("a", "A"), ("b", "i32")]);
    let tid = names::form_type_id_by_str(&mut ctx.it, "A");
    let err = ctx
        .types
        .get_by_name(&mut ctx.it, &ctx.scopes, ScopeId::GLOBAL, tid)
        .unwrap_err();
    assert!(
        err.to_string().contains("recursively defined"),
        "unexpected message: {err}"
    );
}

#[test]
fn mutually_recursive_structs_behind_pointers() {
    let mut ctx = Ctx::new();
    ctx.define_struct(ScopeId::GLOBAL, "B", &[("a", "*A")]);
    ctx.define_struct(ScopeId::GLOBAL, "A", &[("b", "*B")]);
    let sig = ctx.sig_of(ScopeId::GLOBAL, "A");
    assert_eq!(sig, "t:{A;b:*{B;a:*A}}");
}

#[test]
fn general_tuple_typeid_unwinds() {
    let mut ctx = Ctx::new();
    let sig = ctx.sig_of(ScopeId::GLOBAL, "(;i32,f64)");
    assert_eq!(sig, "t:(;i32,f64)");
    let id = ctx.resolve(ScopeId::GLOBAL, "(;i32,f64)");
    let ty = ctx.types.get(id);
    assert_eq!(ty.strukt().unwrap().kind, CaStructKind::GeneralTuple);
    assert_eq!(ty.size, 16);
}

#[test]
fn slice_form_unwinds() {
    let mut ctx = Ctx::new();
    let id = ctx.resolve(ScopeId::GLOBAL, "<slice;;*i32,i64>");
    let ty = ctx.types.get(id);
    assert_eq!(ty.tok, TypeTok::Slice);
    assert_eq!(ty.size, 16);
}

#[test]
fn unknown_type_reports_its_name() {
    let mut ctx = Ctx::new();
    let tid = names::form_type_id_by_str(&mut ctx.it, "Missing");
    let err = ctx
        .types
        .get_by_name(&mut ctx.it, &ctx.scopes, ScopeId::GLOBAL, tid)
        .unwrap_err();
    assert!(err.to_string().contains("cannot find data type 'Missing'"));
}

#[test]
fn scoped_resolution_sees_local_definitions() {
    let mut ctx = Ctx::new();
    let inner = ctx.scopes.push_new(Some(ScopeId::GLOBAL));
    ctx.define_alias(inner, "Local", "i64");
    assert_eq!(ctx.sig_of(inner, "Local"), "t:i64");

    // invisible from the global scope
    let tid = names::form_type_id_by_str(&mut ctx.it, "Local");
    assert!(ctx
        .types
        .get_by_name(&mut ctx.it, &ctx.scopes, ScopeId::GLOBAL, tid)
        .is_err());
}
