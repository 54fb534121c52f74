// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Symbol table mapping names to storage locations.
//!
//! Each table covers one scope; function compilation encloses a fresh
//! table over the current one. Resolution walks outward. Indices are
//! dense per table and stable within one compiler instance.

use std::collections::HashMap;

/// Where a symbol's value lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// The VM's globals array.
    Global,
    /// A slot above the current frame's base pointer.
    Local,
    /// The builtin registry.
    Builtin,
}

/// A resolved name: its scope plus the index within that scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// A single scope's name bindings, chained to the enclosing scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    store: HashMap<String, Symbol>,
    num_definitions: usize,
    outer: Option<Box<SymbolTable>>,
}

impl SymbolTable {
    /// Create an empty top-level table.
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Create a table enclosed by `outer`; definitions in the new table
    /// are `Local`.
    pub fn enclosed(outer: SymbolTable) -> Self {
        SymbolTable {
            store: HashMap::new(),
            num_definitions: 0,
            outer: Some(Box::new(outer)),
        }
    }

    /// Unwind to the enclosing table when a scope ends.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|outer| *outer)
    }

    /// Whether this table has an enclosing scope.
    pub fn is_enclosed(&self) -> bool {
        self.outer.is_some()
    }

    /// The number of definitions in this table (a function's local count).
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Define a name in this scope. Re-defining an existing name reuses
    /// its index, so indices stay dense.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_some() {
            SymbolScope::Local
        } else {
            SymbolScope::Global
        };
        let index = match self.store.get(name) {
            Some(existing) if existing.scope == scope => existing.index,
            _ => {
                let index = self.num_definitions;
                self.num_definitions += 1;
                index
            }
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Register a builtin at its registry index.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolve a name, walking outward through enclosing scopes.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        match self.store.get(name) {
            Some(symbol) => Some(symbol.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.resolve(name)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_globals() {
        let mut table = SymbolTable::new();
        let a = table.define("a");
        let b = table.define("b");
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(a.index, 0);
        assert_eq!(b.scope, SymbolScope::Global);
        assert_eq!(b.index, 1);
    }

    #[test]
    fn test_resolve_globals() {
        let mut table = SymbolTable::new();
        table.define("a");
        table.define("b");

        assert_eq!(table.resolve("a").unwrap().index, 0);
        assert_eq!(table.resolve("b").unwrap().index, 1);
        assert!(table.resolve("c").is_none());
    }

    #[test]
    fn test_redefinition_keeps_index() {
        let mut table = SymbolTable::new();
        table.define("a");
        table.define("b");
        let again = table.define("a");
        assert_eq!(again.index, 0);
        assert_eq!(table.num_definitions(), 2);
    }

    #[test]
    fn test_locals_in_enclosed_scope() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::enclosed(global);
        let b = local.define("b");
        assert_eq!(b.scope, SymbolScope::Local);
        assert_eq!(b.index, 0);

        // Outer names resolve through the chain.
        let a = local.resolve("a").unwrap();
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(a.index, 0);
    }

    #[test]
    fn test_locals_shadow_globals() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::enclosed(global);
        local.define("a");

        let resolved = local.resolve("a").unwrap();
        assert_eq!(resolved.scope, SymbolScope::Local);
        assert_eq!(resolved.index, 0);
    }

    #[test]
    fn test_into_outer_restores_enclosing_table() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::enclosed(global);
        local.define("b");
        assert_eq!(local.num_definitions(), 1);

        let global = local.into_outer().unwrap();
        assert!(global.resolve("a").is_some());
        assert!(global.resolve("b").is_none());
    }

    #[test]
    fn test_define_and_resolve_builtins() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        global.define_builtin(1, "puts");

        let local = SymbolTable::enclosed(global);
        let len = local.resolve("len").unwrap();
        assert_eq!(len.scope, SymbolScope::Builtin);
        assert_eq!(len.index, 0);
        assert_eq!(local.resolve("puts").unwrap().index, 1);
    }
}
