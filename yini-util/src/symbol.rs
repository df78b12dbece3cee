//! String interning for identifiers.
//!
//! Section names, keys, and defines are looked up by name constantly during
//! evaluation (inheritance walks, reference resolution, schema lookup).
//! Interning turns those comparisons into integer equality and lets
//! `Symbol` implement `Copy`, which keeps the AST and DOM free of
//! reference-counted strings for the common case of short identifiers.

use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// A compact, interned identifier. Two `Symbol`s compare equal iff the
/// strings they were interned from compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn intern(text: &str) -> Self {
        INTERNER.with_or_init(|i| i.intern(text))
    }

    pub fn as_str(&self) -> &'static str {
        INTERNER.with_or_init(|i| i.resolve(*self))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thread-safe global string table. Strings are interned once and never
/// evicted: a document's lifetime is a single parse/evaluate/serialize run,
/// so leaking the backing `String` for the life of the process is a
/// deliberate, bounded trade rather than an unbounded leak.
struct Interner {
    strings: RwLock<InternerInner>,
}

struct InternerInner {
    map: FxHashMap<&'static str, u32>,
    vec: Vec<&'static str>,
}

impl Interner {
    fn new() -> Self {
        Self {
            strings: RwLock::new(InternerInner {
                map: FxHashMap::default(),
                vec: Vec::new(),
            }),
        }
    }

    fn intern(&self, text: &str) -> Symbol {
        if let Some(&id) = self.strings.read().unwrap().map.get(text) {
            return Symbol(id);
        }
        let mut inner = self.strings.write().unwrap();
        if let Some(&id) = inner.map.get(text) {
            return Symbol(id);
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let id = inner.vec.len() as u32;
        inner.vec.push(leaked);
        inner.map.insert(leaked, id);
        Symbol(id)
    }

    fn resolve(&self, symbol: Symbol) -> &'static str {
        self.strings.read().unwrap().vec[symbol.0 as usize]
    }

    fn with_or_init<R>(&self, f: impl FnOnce(&Interner) -> R) -> R {
        f(self)
    }
}

static INTERNER: Lazy<Interner> = Lazy::new(Interner::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_string_yields_equal_symbols() {
        let a = Symbol::intern("Graphics");
        let b = Symbol::intern("Graphics");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Graphics");
    }

    #[test]
    fn distinct_strings_yield_distinct_symbols() {
        let a = Symbol::intern("w");
        let b = Symbol::intern("h");
        assert_ne!(a, b);
    }
}
