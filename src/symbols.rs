//! Symbol and scope arenas.
//!
//! Symbols are never removed once created; the binder hands the arena over to
//! codegen together with the typed tree. Scopes form a tree through parent
//! indices and are only needed while binding.

use std::collections::HashMap;

use crate::{token::Span, types::TypeDetail, util::intern::Interned};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub const fn new(index: u32) -> SymbolId {
        SymbolId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Clone, Debug, PartialEq)]
pub enum SymbolKind {
    /// A record type and its fields, in declaration order.
    Type { fields: Vec<SymbolId> },
    Function {
        params: Vec<SymbolId>,
        return_ty: TypeDetail,
        /// Scope holding the parameters.
        scope: ScopeId,
    },
    Param { index: u16 },
    Local,
    Field { record: SymbolId, index: u16 },
}

impl SymbolKind {
    pub fn describe(&self) -> &'static str {
        match self {
            SymbolKind::Type { .. } => "type",
            SymbolKind::Function { .. } => "function",
            SymbolKind::Param { .. } => "parameter",
            SymbolKind::Local => "local",
            SymbolKind::Field { .. } => "field",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: Interned<str>,
    pub ty: TypeDetail,
    pub kind: SymbolKind,
    pub span: Span,
    /// Function whose frame holds this symbol. Only set for parameters and
    /// locals.
    pub owner: Option<SymbolId>,
}

#[derive(Debug, Default)]
pub struct Symbols {
    symbols: Vec<Symbol>,
}

impl Symbols {
    pub fn with_capacity(capacity: usize) -> Symbols {
        Symbols {
            symbols: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = u32::try_from(self.symbols.len()).expect("too many symbols");
        self.symbols.push(symbol);
        SymbolId(id)
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Field symbols of a record type, in declaration order.
    pub fn fields(&self, record: SymbolId) -> &[SymbolId] {
        match &self.get(record).kind {
            SymbolKind::Type { fields } => fields,
            _ => &[],
        }
    }
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    names: HashMap<Interned<str>, SymbolId>,
    types: HashMap<Interned<str>, TypeDetail>,
}

/// Arena of scopes with a cursor on the current one. Entering a scope pushes
/// (makes it current); leaving pops back to its parent.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl Scopes {
    /// Creates the arena with a root scope, which becomes current.
    pub fn new() -> Scopes {
        Scopes {
            scopes: vec![Scope {
                parent: None,
                names: HashMap::new(),
                types: HashMap::new(),
            }],
            current: ScopeId(0),
        }
    }

    /// Creates a child of the current scope without entering it.
    pub fn create_child(&mut self) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).expect("too many scopes"));
        self.scopes.push(Scope {
            parent: Some(self.current),
            names: HashMap::new(),
            types: HashMap::new(),
        });
        id
    }

    /// Creates a child of the current scope and enters it.
    pub fn push(&mut self) -> ScopeId {
        let id = self.create_child();
        self.current = id;
        id
    }

    /// Leaves the current scope, returning to its parent.
    pub fn pop(&mut self) {
        if let Some(parent) = self.scopes[self.current.0 as usize].parent {
            self.current = parent;
        }
    }

    /// Makes `scope` current, returning the previously current one.
    pub fn enter(&mut self, scope: ScopeId) -> ScopeId {
        std::mem::replace(&mut self.current, scope)
    }

    /// Declares a name in the current scope. Fails with the previous
    /// definition if the name is already declared in this same scope.
    pub fn declare(&mut self, name: Interned<str>, symbol: SymbolId) -> Result<(), SymbolId> {
        let scope = &mut self.scopes[self.current.0 as usize];
        match scope.names.get(&name) {
            Some(&previous) => Err(previous),
            None => {
                scope.names.insert(name, symbol);
                Ok(())
            }
        }
    }

    /// Declares a type name in the current scope. Fails if the name is
    /// already a type in this same scope.
    pub fn declare_type(&mut self, name: Interned<str>, ty: TypeDetail) -> Result<(), ()> {
        let scope = &mut self.scopes[self.current.0 as usize];
        if scope.types.contains_key(&name) {
            return Err(());
        }
        scope.types.insert(name, ty);
        Ok(())
    }

    /// Resolves a name, walking outward from the current scope.
    pub fn lookup(&self, name: Interned<str>) -> Option<SymbolId> {
        self.walk().find_map(|scope| scope.names.get(&name).copied())
    }

    /// Resolves a type name, walking outward from the current scope.
    pub fn lookup_type(&self, name: Interned<str>) -> Option<&TypeDetail> {
        self.walk().find_map(|scope| scope.types.get(&name))
    }

    fn walk(&self) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(Some(&self.scopes[self.current.0 as usize]), |scope| {
            scope.parent.map(|parent| &self.scopes[parent.0 as usize])
        })
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::intern::Interner;

    fn local(symbols: &mut Symbols, name: Interned<str>) -> SymbolId {
        symbols.push(Symbol {
            name,
            ty: TypeDetail::Number,
            kind: SymbolKind::Local,
            span: Span::new_of_length(0, 0),
            owner: None,
        })
    }

    #[test]
    fn lookup_walks_outward_and_shadows() {
        let i = &mut Interner::with_capacity(4);
        let x = i.intern("x");
        let symbols = &mut Symbols::default();
        let mut scopes = Scopes::new();

        let outer = local(symbols, x);
        scopes.declare(x, outer).unwrap();

        scopes.push();
        assert_eq!(scopes.lookup(x), Some(outer));

        let inner = local(symbols, x);
        scopes.declare(x, inner).unwrap();
        assert_eq!(scopes.lookup(x), Some(inner));

        scopes.pop();
        assert_eq!(scopes.lookup(x), Some(outer));
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let i = &mut Interner::with_capacity(4);
        let x = i.intern("x");
        let symbols = &mut Symbols::default();
        let mut scopes = Scopes::new();

        let first = local(symbols, x);
        let second = local(symbols, x);
        scopes.declare(x, first).unwrap();
        assert_eq!(scopes.declare(x, second), Err(first));
        assert_eq!(scopes.declare_type(x, TypeDetail::Number), Ok(()));
        assert_eq!(scopes.declare_type(x, TypeDetail::String), Err(()));
    }

    #[test]
    fn names_vanish_when_scope_is_left() {
        let i = &mut Interner::with_capacity(4);
        let y = i.intern("y");
        let symbols = &mut Symbols::default();
        let mut scopes = Scopes::new();

        scopes.push();
        let sym = local(symbols, y);
        scopes.declare(y, sym).unwrap();
        scopes.pop();
        assert_eq!(scopes.lookup(y), None);
    }
}
