use std::{collections::HashMap, fmt, num::NonZeroU32, rc::Rc};

/// A handle to an interned name. To retrieve the `&str`, use
/// [`Interner::get`].
///
/// Handles are only meaningful for the interner that produced them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    /// Builds the handle of the `n`-th interned name (1-based). Only used to
    /// define the well-known symbols, which are interned first.
    const fn nth(n: u32) -> Symbol {
        match NonZeroU32::new(n) {
            Some(handle) => Symbol(handle),
            None => panic!("symbols are 1-based"),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl From<&Symbol> for Symbol {
    fn from(value: &Symbol) -> Self {
        *value
    }
}

/// Names with a meaning of their own, interned before any source name.
pub mod well_known {
    use super::Symbol;

    /// The print intrinsic.
    pub const PRINT: Symbol = Symbol::nth(1);

    pub const ALL: &[(Symbol, &str)] = &[(PRINT, "print")];
}

/// Maps identifier names to small copyable [`Symbol`]s and back.
pub struct Interner {
    map: HashMap<Rc<str>, Symbol>,
    names: Vec<Rc<str>>,
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, name) in self.names.iter().enumerate() {
            map.entry(&(i + 1), name);
        }
        map.finish()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Interner::with_capacity(64)
    }
}

impl Interner {
    /// Creates an interner with the [`well_known`] names already registered.
    pub fn with_capacity(capacity: usize) -> Interner {
        let mut interner = Interner {
            map: HashMap::with_capacity(capacity),
            names: Vec::with_capacity(capacity),
        };
        for &(expected, name) in well_known::ALL {
            let symbol = interner.intern(name);
            assert_eq!(symbol, expected);
        }
        interner
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Interns the provided name, returning a handle which can be used to
    /// retrieve it later. Interning the same name twice yields the same
    /// handle.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.map.get(name) {
            return *symbol;
        }
        let n = u32::try_from(self.names.len() + 1).expect("interner out of capacity");
        let symbol = Symbol::nth(n);
        let key: Rc<str> = Rc::from(name);
        self.names.push(Rc::clone(&key));
        self.map.insert(key, symbol);
        symbol
    }

    /// Returns the name of the provided [`Symbol`]. Panics if the symbol comes
    /// from another interner.
    pub fn get(&self, symbol: impl Into<Symbol>) -> &str {
        let Symbol(handle) = symbol.into();
        &self.names[handle.get() as usize - 1]
    }
}
