use ca_binder::scope::{AssocKind, ScopeArena, ScopeAssoc, SymbolQuery};
use ca_binder::symbol::SymbolKind;
use ca_common::ids::ScopeId;
use ca_common::interner::Interner;
use ca_common::sloc::Sloc;

#[test]
fn lookup_walks_the_parent_chain() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    let inner = scopes.push_new(Some(ScopeId::GLOBAL));
    let name = it.insert("x");
    let sym = scopes.insert(ScopeId::GLOBAL, name, Sloc::new(1, 0), SymbolKind::Label);

    assert_eq!(scopes.getsym(inner, name, true), Some(sym));
    assert_eq!(scopes.getsym(inner, name, false), None);
    assert_eq!(scopes.getsym(ScopeId::GLOBAL, name, false), Some(sym));
}

#[test]
fn check_insert_is_idempotent() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    let name = it.insert("f");
    let a = scopes.check_insert(ScopeId::GLOBAL, name, Sloc::new(1, 0), SymbolKind::Label);
    let b = scopes.check_insert(ScopeId::GLOBAL, name, Sloc::new(2, 0), SymbolKind::LabelHanging);
    assert_eq!(a, b);
    // the original entry won
    assert!(matches!(scopes.symbol(a).kind, SymbolKind::Label));
}

#[test]
fn overlay_redirects_only_covered_ids() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    // the overlay scope holds `Self`
    let trait_scope = scopes.push_new(Some(ScopeId::GLOBAL));
    let self_ty = it.insert("Self");
    let other = it.insert("other");
    let self_sym = scopes.insert(trait_scope, self_ty, Sloc::new(1, 0), SymbolKind::Label);

    let user_scope = scopes.push_new(Some(ScopeId::GLOBAL));
    let other_sym = scopes.insert(user_scope, other, Sloc::new(2, 0), SymbolKind::Label);

    let mut assoc = ScopeAssoc::new(AssocKind::Generic, trait_scope);
    assoc.add_item(self_ty);
    scopes.scope_mut(user_scope).assoc = Some(assoc);

    // covered id goes through the overlay
    assert_eq!(scopes.get_with_assoc(user_scope, self_ty), trait_scope);
    assert_eq!(scopes.getsym(user_scope, self_ty, true), Some(self_sym));
    // uncovered id uses the normal chain
    assert_eq!(scopes.get_with_assoc(user_scope, other), user_scope);
    assert_eq!(scopes.getsym(user_scope, other, true), Some(other_sym));
}

#[test]
fn threaded_overlay_queries() {
    let mut it = Interner::new();
    let mut scopes = ScopeArena::new();
    let impl_scope = scopes.push_new(Some(ScopeId::GLOBAL));
    let tparam = it.insert("T");
    let sym = scopes.insert(impl_scope, tparam, Sloc::new(3, 0), SymbolKind::Label);

    let mut assoc = ScopeAssoc::new(AssocKind::Generic, impl_scope);
    assoc.add_item(tparam);

    let body_scope = scopes.push_new(Some(ScopeId::GLOBAL));
    let q = SymbolQuery {
        scope: body_scope,
        idx: tparam,
        parent: true,
        assoc: Some(&assoc),
    };
    assert_eq!(scopes.getsym_st2(&q), Some(sym));

    // without the overlay the name is invisible
    let q2 = SymbolQuery {
        scope: body_scope,
        idx: tparam,
        parent: true,
        assoc: None,
    };
    assert_eq!(scopes.getsym_st2(&q2), None);
}

#[test]
fn sub_scope_relation() {
    let mut scopes = ScopeArena::new();
    let a = scopes.push_new(Some(ScopeId::GLOBAL));
    let b = scopes.push_new(Some(a));
    assert!(scopes.is_sub_scope(b, a));
    assert!(scopes.is_sub_scope(b, ScopeId::GLOBAL));
    assert!(!scopes.is_sub_scope(a, b));
}
