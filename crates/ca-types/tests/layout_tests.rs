use ca_ast::arglist::ArgList;
use ca_binder::runables::Runables;
use ca_binder::scope::ScopeArena;
use ca_binder::symbol::{CaVariable, DataTypeEntry, DataTypeKind, SymbolKind};
use ca_common::ids::ScopeId;
use ca_common::interner::Interner;
use ca_common::names;
use ca_common::sloc::Sloc;
use ca_types::layout;
use ca_types::{CaTypePayload, CaTypeStatus, TypeArena};

fn define_struct(
    it: &mut Interner,
    scopes: &mut ScopeArena,
    scope: ScopeId,
    name: &str,
    fields: &[(&str, &str)],
) {
    let member_scope = scopes.push_new(Some(scope));
    let mut args = ArgList::names(member_scope);
    for (fname, ftype) in fields {
        let fatom = it.insert(fname);
        let ftid = names::form_type_id_by_str(it, ftype);
        args.push_name(fatom);
        let var = CaVariable::new(fatom, Some(ftid), Sloc::new(1, 0));
        scopes.insert_shielded_var(member_scope, fatom, var.loc, var);
    }
    let tid = names::form_type_id_by_str(it, name);
    scopes.insert(
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

fn resolve(
    it: &mut Interner,
    scopes: &ScopeArena,
    types: &mut TypeArena,
    name: &str,
) -> ca_common::ids::TypeId {
    let tid = names::form_type_id_by_str(it, name);
    types.get_by_name(it, scopes, ScopeId::GLOBAL, tid).unwrap()
}

#[test]
fn struct_offsets_use_natural_alignment() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let mut scopes = ScopeArena::new();
    define_struct(
        &mut it,
        &mut scopes,
        ScopeId::GLOBAL,
        "M",
        &[("a", "i8"), ("b", "i64"), ("c", "i8")],
    );
    let id = resolve(&mut it, &scopes, &mut types, "M");
    let ty = types.get(id);
    let s = ty.strukt().unwrap();
    assert_eq!(s.fields[0].offset, 0);
    assert_eq!(s.fields[1].offset, 8);
    assert_eq!(s.fields[2].offset, 16);
    assert_eq!(s.max_align, 8);
    assert_eq!(ty.size, 24);
    // size is a multiple of max_align; offsets are field-aligned
    assert_eq!(ty.size % s.max_align as i64, 0);
}

#[test]
fn expansion_flattens_pointer_chains() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let scopes = ScopeArena::new();
    let id = resolve(&mut it, &scopes, &mut types, "***i32");
    // every link has dimension 1 after expansion
    let mut cur = id;
    let mut layers = 0;
    while let CaTypePayload::Pointer(p) = &types.get(cur).payload {
        assert_eq!(p.dimension, 1);
        layers += 1;
        cur = p.kernel;
    }
    assert_eq!(layers, 3);
    assert_eq!(it.get(types.get(id).signature), "t:***i32");
}

#[test]
fn expansion_flattens_array_chains() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let scopes = ScopeArena::new();
    let id = resolve(&mut it, &scopes, &mut types, "[[i32;4];3]");
    let ty = types.get(id);
    let a = ty.array().unwrap();
    assert_eq!(a.dimension, 1);
    assert_eq!(a.dims[0], 3);
    let inner = types.get(a.elem);
    let ia = inner.array().unwrap();
    assert_eq!(ia.dimension, 1);
    assert_eq!(ia.dims[0], 4);
    assert_eq!(ty.size, 48);
    assert_eq!(inner.size, 16);
}

#[test]
fn nested_struct_alignment_propagates() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let mut scopes = ScopeArena::new();
    define_struct(&mut it, &mut scopes, ScopeId::GLOBAL, "Inner", &[("x", "i64")]);
    define_struct(
        &mut it,
        &mut scopes,
        ScopeId::GLOBAL,
        "Outer",
        &[("tag", "i8"), ("inner", "Inner")],
    );
    let id = resolve(&mut it, &scopes, &mut types, "Outer");
    let ty = types.get(id);
    let s = ty.strukt().unwrap();
    // the inner struct's 8-alignment pushes it past the tag byte
    assert_eq!(s.fields[1].offset, 8);
    assert_eq!(ty.size, 16);
}

#[test]
fn compact_merges_chains_back() {
    let mut it = Interner::new();
    let mut types = TypeArena::new(&mut it);
    let scopes = ScopeArena::new();
    let id = resolve(&mut it, &scopes, &mut types, "**i64");
    layout::compact(&mut types, id);
    let ty = types.get(id);
    assert_eq!(ty.status, CaTypeStatus::Compact);
    let p = ty.pointer().unwrap();
    assert_eq!(p.dimension, 2);
    // the kernel is the primitive, not another pointer link
    assert!(types.get(p.kernel).pointer().is_none());
}
