//! String interning for identifiers, labels and type signatures.
//!
//! Every name the compiler touches — identifiers, `l:` label forms,
//! `t:` type-signature strings, `f:` function labels — is interned once
//! and referred to by a small integer handle (`Atom`). Handles are
//! stable for the lifetime of a compilation.
//!
//! The backing storage is a single growable byte buffer; interning is
//! binary-safe so literal text containing NUL bytes round-trips.

use rustc_hash::FxHashMap;
use serde::Serialize;

/// An interned string handle.
///
/// Atoms are cheap to copy and compare; two atoms are equal iff the
/// strings they intern are byte-equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Atom(pub u32);

impl Atom {
    /// Sentinel for "no name" slots (tuple fields, anonymous types).
    pub const NONE: Atom = Atom(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The string interner.
///
/// Single-threaded by design: all interning happens on the compiler
/// thread (see the concurrency model in the top-level docs).
#[derive(Default, Debug)]
pub struct Interner {
    /// Backing byte storage; grows geometrically.
    bytes: Vec<u8>,
    /// Per-atom (offset, len) into `bytes`.
    spans: Vec<(u32, u32)>,
    /// Reverse lookup from interned bytes to atom.
    lookup: FxHashMap<Box<[u8]>, Atom>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its stable handle.
    pub fn insert(&mut self, s: &str) -> Atom {
        self.insert_bytes(s.as_bytes())
    }

    /// Intern raw bytes (binary-safe, NULs allowed).
    pub fn insert_bytes(&mut self, bytes: &[u8]) -> Atom {
        if let Some(&atom) = self.lookup.get(bytes) {
            return atom;
        }

        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(bytes);
        let atom = Atom(self.spans.len() as u32);
        self.spans.push((offset, bytes.len() as u32));
        self.lookup.insert(bytes.into(), atom);
        atom
    }

    /// Look up a string without interning it.
    #[must_use]
    pub fn check(&self, s: &str) -> Option<Atom> {
        self.lookup.get(s.as_bytes()).copied()
    }

    /// Resolve an atom back to its string.
    ///
    /// Panics on `Atom::NONE` or an atom from a different interner; the
    /// text is guaranteed valid UTF-8 when it was interned via
    /// [`Interner::insert`].
    #[must_use]
    pub fn get(&self, atom: Atom) -> &str {
        std::str::from_utf8(self.get_bytes(atom)).expect("interned text is not valid UTF-8")
    }

    /// Resolve an atom to its raw bytes.
    #[must_use]
    pub fn get_bytes(&self, atom: Atom) -> &[u8] {
        let (offset, len) = self.spans[atom.index()];
        &self.bytes[offset as usize..(offset + len) as usize]
    }

    /// Number of distinct interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/interner.rs"]
mod tests;
