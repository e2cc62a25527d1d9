//! Hierarchical symbol tables
//!
//! All symbols live in one central buffer with stable ordinal indices;
//! scopes are hash maps from name to [`SymbolId`] chained through parent
//! links up to the global scope. Lookup walks the chain, insertion only
//! touches the innermost scope, and a duplicate in the innermost scope is
//! an error reported to the caller.

use crate::ir::{NativeId, ProcId};
use crate::types::TypeId;
use bitflags::bitflags;
use hashbrown::HashMap;
use kiln_common::Span;
use serde::Serialize;

pub type SymbolId = u32;
pub type ScopeId = u32;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
    pub struct SymbolFlags: u32 {
        /// Denotes storage; may appear on the left of an assignment
        const LVALUE       = 1 << 0;
        /// May not be assigned to
        const CONSTANT     = 1 << 1;
        /// The name denotes a type
        const TYPE         = 1 << 2;
        /// Value computable at resolve time
        const CONST_EXPR   = 1 << 3;
        /// Injected by the core or the standard library
        const COMPILER_DEF = 1 << 4;
    }
}

/// Where a symbol's storage (or body) lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolAddress {
    /// Byte offset from the current call frame's base
    Stack(u32),
    /// Byte offset into the global/BSS segment
    Global(u32),
    /// A procedure body
    Code(ProcId),
    /// A foreign procedure handle
    Native(NativeId),
    /// No storage (types, resolve-time constants)
    None,
}

/// Resolve-time constant values for `CONST_EXPR` symbols
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ConstValue {
    Integer(i64),
    Real(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub name: String,
    pub ty: TypeId,
    pub address: SymbolAddress,
    pub flags: SymbolFlags,
    pub span: Span,
    pub const_value: Option<ConstValue>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct Scope {
    names: HashMap<String, SymbolId>,
    parent: Option<ScopeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolTables {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
}

impl SymbolTables {
    pub const ROOT: ScopeId = 0;

    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = self.scopes.len() as ScopeId;
        self.scopes.push(Scope { names: HashMap::new(), parent: Some(parent) });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope as usize].parent
    }

    /// Install a symbol in `scope`. On a duplicate name in that same scope
    /// the existing symbol id comes back as the error value.
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.scopes[scope as usize].names.get(&symbol.name) {
            return Err(existing);
        }
        let id = self.symbols.len() as SymbolId;
        self.scopes[scope as usize].names.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    /// Walk the scope chain from innermost to the global scope.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let scope = &self.scopes[scope_id as usize];
            if let Some(&id) = scope.names.get(name) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope as usize].names.get(name).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols visible in one scope (not its parents), for debug consumers.
    pub fn scope_symbols(&self, scope: ScopeId) -> impl Iterator<Item = (&str, SymbolId)> {
        self.scopes[scope as usize].names.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl Default for SymbolTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeArena;
    use pretty_assertions::assert_eq;

    fn symbol(name: &str) -> Symbol {
        Symbol {
            name: name.to_string(),
            ty: TypeArena::INTEGER,
            address: SymbolAddress::Stack(0),
            flags: SymbolFlags::LVALUE,
            span: Span::default(),
            const_value: None,
        }
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut tables = SymbolTables::new();
        let first = tables.declare(SymbolTables::ROOT, symbol("x")).unwrap();
        let err = tables.declare(SymbolTables::ROOT, symbol("x")).unwrap_err();
        assert_eq!(err, first);
    }

    #[test]
    fn inner_scope_shadows_without_replacing() {
        let mut tables = SymbolTables::new();
        let outer = tables.declare(SymbolTables::ROOT, symbol("x")).unwrap();
        let inner_scope = tables.push_scope(SymbolTables::ROOT);
        let inner = tables.declare(inner_scope, symbol("x")).unwrap();

        assert_eq!(tables.lookup(inner_scope, "x"), Some(inner));
        // Exiting the inner scope: the outer binding is visible again.
        assert_eq!(tables.lookup(SymbolTables::ROOT, "x"), Some(outer));
    }

    #[test]
    fn lookup_walks_the_parent_chain() {
        let mut tables = SymbolTables::new();
        let id = tables.declare(SymbolTables::ROOT, symbol("global")).unwrap();
        let a = tables.push_scope(SymbolTables::ROOT);
        let b = tables.push_scope(a);
        assert_eq!(tables.lookup(b, "global"), Some(id));
        assert_eq!(tables.lookup_local(b, "global"), None);
    }

    #[test]
    fn ordinals_are_stable_across_scopes() {
        let mut tables = SymbolTables::new();
        let a = tables.declare(SymbolTables::ROOT, symbol("a")).unwrap();
        let scope = tables.push_scope(SymbolTables::ROOT);
        let b = tables.declare(scope, symbol("b")).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(tables.symbol(b).name, "b");
    }
}
