//! The canonical type arena and its caches.

use crate::layout;
use crate::types::{
    AllocPos, CaArray, CaPointer, CaStruct, CaStructField, CaStructKind, CaType, CaTypePayload,
    CaTypeStatus, TypeTok,
};
use crate::unwind;
use ca_binder::scope::ScopeArena;
use ca_common::diagnostics::CaResult;
use ca_common::ids::{ScopeId, TypeId};
use ca_common::interner::{Atom, Interner};
use ca_common::names;
use rustc_hash::FxHashMap;
use smallvec::smallvec;
use tracing::debug;

/// Arena of canonical types.
///
/// Invariant: for each `(scope, typeid)` pair and for each canonical
/// signature, lookups return the same `TypeId` across calls.
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<CaType>,
    /// canonical signature (`t:...` atom) → type
    sig_cache: FxHashMap<Atom, TypeId>,
    /// scope-keyed cache (`s:<scope>$<typeid>` atom) → type
    scope_cache: FxHashMap<Atom, TypeId>,
    prim_by_tok: FxHashMap<TypeTok, TypeId>,
}

impl TypeArena {
    /// Create the arena with every primitive installed under its
    /// `t:<name>` signature.
    #[must_use]
    pub fn new(interner: &mut Interner) -> Self {
        let mut arena = TypeArena {
            types: Vec::new(),
            sig_cache: FxHashMap::default(),
            scope_cache: FxHashMap::default(),
            prim_by_tok: FxHashMap::default(),
        };
        for tok in TypeTok::PRIMITIVES {
            let name = interner.insert(tok.name());
            let signature = names::form_type_id_by_str(interner, tok.name());
            let id = arena.alloc(CaType {
                tok,
                formal_name: name,
                size: tok.prim_size() as i64,
                signature,
                status: CaTypeStatus::Orig,
                payload: CaTypePayload::Primitive,
            });
            arena.sig_cache.insert(signature, id);
            arena.prim_by_tok.insert(tok, id);
        }
        arena
    }

    pub(crate) fn alloc(&mut self, ty: CaType) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> &CaType {
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut CaType {
        &mut self.types[id.index()]
    }

    /// The unique primitive for a token.
    #[must_use]
    pub fn get_primitive_by_token(&self, tok: TypeTok) -> TypeId {
        self.prim_by_tok[&tok]
    }

    /// Primitive lookup by typeid; `None` for non-primitive names.
    #[must_use]
    pub fn get_primitive_by_name(&self, typeid: Atom) -> Option<TypeId> {
        let id = self.sig_cache.get(&typeid).copied()?;
        match self.get(id).status {
            CaTypeStatus::Orig => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn lookup_signature(&self, signature: Atom) -> Option<TypeId> {
        self.sig_cache.get(&signature).copied()
    }

    pub(crate) fn insert_signature(&mut self, signature: Atom, id: TypeId) {
        self.sig_cache.insert(signature, id);
    }

    /// Nominal identity: two types are identical iff their canonical
    /// signatures are equal.
    #[must_use]
    pub fn check_identical(&self, a: TypeId, b: TypeId) -> bool {
        a == b || self.get(a).signature == self.get(b).signature
    }

    /// The public resolution entry point; see the crate docs for the
    /// five-step algorithm.
    pub fn get_by_name(
        &mut self,
        interner: &mut Interner,
        scopes: &ScopeArena,
        scope: ScopeId,
        typeid: Atom,
    ) -> CaResult<TypeId> {
        // honor the association overlay of the scope
        let scope = scopes.get_with_assoc(scope, typeid);

        // step 1: scope-keyed cache
        let key = names::form_symtable_type_id(interner, scope, typeid);
        if let Some(&id) = self.scope_cache.get(&key) {
            return Ok(id);
        }

        // step 2: global signature cache by the raw typeid
        if let Some(&id) = self.sig_cache.get(&typeid) {
            self.scope_cache.insert(key, id);
            return Ok(id);
        }

        debug!(typeid = typeid.0, "type cache miss, unwinding");

        // step 3: unwind the name into its canonical signature
        let unwound = unwind::unwind_type_signature(self, interner, scopes, scope, typeid)?;

        // step 4: the signature may already be materialized
        if let Some(&id) = self.sig_cache.get(&unwound.signature) {
            self.scope_cache.insert(key, id);
            return Ok(id);
        }

        // step 5: formalize the fresh object (expand + layout)
        let id = unwound.datatype;
        layout::formalize(self, interner, id);
        self.get_mut(id).signature = unwound.signature;
        self.get_mut(id).status = CaTypeStatus::Expand;

        self.scope_cache.insert(key, id);
        self.sig_cache.insert(unwound.signature, id);
        Ok(id)
    }

    /// Pointer-to-`inner`, canonicalized through the signature cache.
    pub fn make_pointer_type(&mut self, interner: &mut Interner, inner: TypeId) -> TypeId {
        let signature = names::form_pointer_id(interner, self.get(inner).signature);
        if let Some(&id) = self.sig_cache.get(&signature) {
            return id;
        }
        let id = self.alloc(CaType {
            tok: TypeTok::Pointer,
            formal_name: signature,
            size: 8,
            signature,
            status: CaTypeStatus::Expand,
            payload: CaTypePayload::Pointer(CaPointer {
                kernel: inner,
                dimension: 1,
                allocpos: AllocPos::Stack,
            }),
        });
        self.sig_cache.insert(signature, id);
        id
    }

    /// `[inner; len]`, canonicalized through the signature cache.
    pub fn make_array_type(&mut self, interner: &mut Interner, inner: TypeId, len: u64) -> TypeId {
        let signature = names::form_array_id(interner, self.get(inner).signature, len);
        if let Some(&id) = self.sig_cache.get(&signature) {
            return id;
        }
        let inner_size = self.get(inner).size;
        let size = if inner_size < 0 {
            inner_size
        } else {
            inner_size * len as i64
        };
        let id = self.alloc(CaType {
            tok: TypeTok::Array,
            formal_name: signature,
            size,
            signature,
            status: CaTypeStatus::Expand,
            payload: CaTypePayload::Array(CaArray {
                elem: inner,
                dimension: 1,
                dims: smallvec![len],
            }),
        });
        self.sig_cache.insert(signature, id);
        id
    }

    /// General tuple over `elems`, canonicalized and laid out.
    pub fn make_tuple_type(&mut self, interner: &mut Interner, elems: &[TypeId]) -> TypeId {
        let sigs: Vec<Atom> = elems.iter().map(|&e| self.get(e).signature).collect();
        let signature = names::form_tuple_id(interner, &sigs);
        if let Some(&id) = self.sig_cache.get(&signature) {
            return id;
        }
        let fields = elems
            .iter()
            .map(|&e| CaStructField {
                name: Atom::NONE,
                offset: 0,
                ty: e,
            })
            .collect();
        let id = self.alloc(CaType {
            tok: TypeTok::Struct,
            formal_name: signature,
            size: 0,
            signature,
            status: CaTypeStatus::Expand,
            payload: CaTypePayload::Struct(CaStruct {
                kind: CaStructKind::GeneralTuple,
                name: Atom::NONE,
                fields,
                max_align: 1,
                packed: false,
            }),
        });
        layout::compute_layout(self, id);
        self.sig_cache.insert(signature, id);
        id
    }
}
