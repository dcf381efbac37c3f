//! Nested symbol tables with runtime slot allocation.
//!
//! Slot numbers handed out here are the runtime offsets the VM indexes, so
//! the counting rules mirror the VM's frame layout:
//! - the global scope and every function scope start counting at 0 (each
//!   owns a fresh runtime table);
//! - a block scope continues from its parent's counter, and its slots are
//!   released again when it is popped.

use neco_core::{DataType, SemanticError, Span};
use rustc_hash::FxHashMap;

use super::symbol::{Symbol, VarFlags, VariableSymbol};
use crate::ast::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    symbols: FxHashMap<String, Symbol>,
    next_slot: u16,
    declared_locals: bool,
}

impl Scope {
    fn new(kind: ScopeKind, first_slot: u16) -> Self {
        Self {
            kind,
            symbols: FxHashMap::default(),
            next_slot: first_slot,
            declared_locals: false,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Whether any variable was declared directly in this scope.
    pub fn declared_locals(&self) -> bool {
        self.declared_locals
    }
}

#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// A stack holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global, 0)],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current(&self) -> &Scope {
        // The global scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn in_function(&self) -> bool {
        self.scopes.iter().any(|s| s.kind == ScopeKind::Function)
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let first_slot = match kind {
            ScopeKind::Block => self.current().next_slot,
            ScopeKind::Global | ScopeKind::Function => 0,
        };
        self.scopes.push(Scope::new(kind, first_slot));
    }

    /// Pop the innermost scope. The global scope stays.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn global(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Insert a non-variable symbol into the global scope.
    pub fn define_global(&mut self, name: &str, symbol: Symbol) -> Result<(), SemanticError> {
        let span = symbol.span();
        let global = &mut self.scopes[0];
        if let Some(existing) = global.symbols.get(name) {
            return Err(SemanticError::Redeclaration {
                name: name.to_string(),
                original: existing.span(),
                span,
            });
        }
        global.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn global_symbol_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes[0].symbols.get_mut(name)
    }

    /// Declare a variable in the innermost scope and assign it a slot.
    pub fn declare_variable(
        &mut self,
        name: &str,
        data_type: DataType,
        flags: VarFlags,
        span: Span,
    ) -> Result<u8, SemanticError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| SemanticError::other(span, "no open scope"))?;
        if let Some(existing) = scope.symbols.get(name) {
            return Err(SemanticError::Redeclaration {
                name: name.to_string(),
                original: existing.span(),
                span,
            });
        }
        let slot = u8::try_from(scope.next_slot).map_err(|_| SemanticError::TooManyLocals { span })?;
        scope.next_slot += 1;
        scope.declared_locals = true;
        scope.symbols.insert(
            name.to_string(),
            Symbol::Variable(VariableSymbol {
                data_type,
                slot,
                flags,
                span,
            }),
        );
        Ok(slot)
    }

    /// Innermost symbol with this name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.symbols.get(name))
    }

    /// Innermost variable with this name, with its runtime location.
    ///
    /// Variables of the global scope read from inside a function resolve to
    /// [`Storage::Global`]; everything else is in the current frame.
    pub fn lookup_variable_mut(&mut self, name: &str) -> Option<(&mut VariableSymbol, Storage)> {
        let in_function = self.in_function();
        for (depth, scope) in self.scopes.iter_mut().enumerate().rev() {
            match scope.symbols.get_mut(name) {
                Some(Symbol::Variable(var)) => {
                    let storage = if depth == 0 && in_function {
                        Storage::Global(var.slot)
                    } else {
                        Storage::Local(var.slot)
                    };
                    return Some((var, storage));
                }
                Some(_) => return None,
                None => {}
            }
        }
        None
    }
}
