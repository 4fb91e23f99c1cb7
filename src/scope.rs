//! Transient variable scope for one learn batch.
//!
//! `@var` destinations bind here; graph invocations push a child scope for
//! their parameters and pop it on return. Entries marked `exported` also
//! produced a KB fact; the flag only matters for the `@_ Export` directive
//! and for diagnostics — the scope itself always dies with the batch.

use std::collections::HashMap;

use crate::expr::Expr;
use crate::hdc::Vector;

#[derive(Debug, Clone)]
pub struct ScopeEntry {
    pub vector: Vector,
    /// The resolved expression form, kept so rules can be assembled from
    /// scope references (`Implies $c $k`).
    pub expr: Expr,
    /// `Some(name)` when bound via `@var:name`.
    pub exported: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, ScopeEntry>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn bind(&mut self, name: &str, entry: ScopeEntry) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), entry);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&ScopeEntry> {
        for scope in self.scopes.iter().rev() {
            if let Some(entry) = scope.get(name) {
                return Some(entry);
            }
        }
        None
    }

    /// Drop every binding; used when a learn batch is rolled back.
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.scopes.push(HashMap::new());
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
