//! Lexical scope chain
//!
//! Scopes live in an arena indexed by [`ScopeId`]. Each scope owns its local
//! table and points at its enclosing scope; lookups and updates walk outward
//! through `parent`. Procedure activations push their scopes on top of the
//! arena and truncate back to their base when they finish, so every activation
//! works on its own tables.

use std::collections::{BTreeMap, HashMap};

use super::eval::{EvalError, EvalResult};
use super::program::NodeId;
use super::values::Val;

pub type ScopeId = usize;

/// The global scope at the program root
pub const ROOT_SCOPE: ScopeId = 0;

/// A variable binding: a plain value or an integer-keyed array
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Plain(Val),
    Indexed(BTreeMap<i64, Val>),
}

/// Bindings for one flowchart block
#[derive(Debug, Clone)]
pub struct Scope {
    /// The block this scope belongs to
    pub block: NodeId,
    pub parent: Option<ScopeId>,
    pub locals: HashMap<String, Binding>,
}

#[derive(Debug, Clone)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    /// Create a chain holding only the root scope for `root_block`
    pub fn new(root_block: NodeId) -> Self {
        Self {
            scopes: vec![Scope {
                block: root_block,
                parent: None,
                locals: HashMap::new(),
            }],
        }
    }

    /// Push a fresh scope for `block`, enclosed by `parent`
    pub fn push(&mut self, block: NodeId, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            block,
            parent: Some(parent),
            locals: HashMap::new(),
        });
        self.scopes.len() - 1
    }

    /// Number of scopes currently allocated
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Drop every scope at or above `base` (the root scope is never dropped)
    pub fn truncate(&mut self, base: usize) {
        self.scopes.truncate(base.max(1));
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    /// Scopes from `id` outward to the root
    fn chain(&self, id: ScopeId) -> impl Iterator<Item = (ScopeId, &Scope)> + '_ {
        std::iter::successors(Some(id), move |current| self.scopes.get(*current)?.parent)
            .filter_map(move |sid| self.scopes.get(sid).map(|scope| (sid, scope)))
    }

    /// Nearest scope on the chain that binds `name`
    pub fn resolve(&self, id: ScopeId, name: &str) -> Option<ScopeId> {
        self.chain(id)
            .find(|(_, scope)| scope.locals.contains_key(name))
            .map(|(sid, _)| sid)
    }

    /// Create a binding in this scope. Returns false if `name` is already bound
    /// here; bindings in enclosing scopes do not count.
    pub fn create(&mut self, id: ScopeId, name: &str, index: Option<i64>, value: Val) -> bool {
        let Some(scope) = self.scopes.get_mut(id) else {
            return false;
        };
        if scope.locals.contains_key(name) {
            return false;
        }
        let binding = match index {
            Some(index) => Binding::Indexed(BTreeMap::from([(index, value)])),
            None => Binding::Plain(value),
        };
        scope.locals.insert(name.to_string(), binding);
        true
    }

    /// Read the nearest binding of `name`
    pub fn lookup(&self, id: ScopeId, name: &str, index: Option<i64>) -> EvalResult<Val> {
        let sid = self
            .resolve(id, name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
        match (&self.scopes[sid].locals[name], index) {
            (Binding::Plain(v), None) => Ok(*v),
            (Binding::Indexed(elements), Some(index)) => {
                elements
                    .get(&index)
                    .copied()
                    .ok_or_else(|| EvalError::UndefinedElement {
                        name: name.to_string(),
                        index,
                    })
            }
            (Binding::Plain(_), Some(_)) => Err(EvalError::NotAnArray(name.to_string())),
            (Binding::Indexed(_), None) => Err(EvalError::ArrayNeedsIndex(name.to_string())),
        }
    }

    /// Overwrite the nearest existing binding of `name`
    pub fn update(&mut self, id: ScopeId, name: &str, index: Option<i64>, value: Val) -> EvalResult<()> {
        let sid = self
            .resolve(id, name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
        let binding = self.scopes[sid]
            .locals
            .get_mut(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
        match (binding, index) {
            (Binding::Plain(v), None) => *v = value,
            (Binding::Indexed(elements), Some(index)) => {
                elements.insert(index, value);
            }
            (Binding::Plain(_), Some(_)) => return Err(EvalError::NotAnArray(name.to_string())),
            (Binding::Indexed(_), None) => {
                return Err(EvalError::ArrayNeedsIndex(name.to_string()))
            }
        }
        Ok(())
    }

    /// Update the nearest binding on the chain, or create one in scope `id`
    pub fn update_or_create(&mut self, id: ScopeId, name: &str, index: Option<i64>, value: Val) -> EvalResult<()> {
        if self.resolve(id, name).is_some() {
            self.update(id, name, index, value)
        } else {
            self.create(id, name, index, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (ScopeChain, ScopeId, ScopeId) {
        let mut chain = ScopeChain::new(0);
        let outer = chain.push(1, ROOT_SCOPE);
        let inner = chain.push(2, outer);
        (chain, outer, inner)
    }

    #[test]
    fn test_create_refuses_duplicate_in_same_scope() {
        let (mut chain, outer, inner) = chain();
        assert!(chain.create(outer, "x", None, Val::Num(1.0)));
        assert!(!chain.create(outer, "x", None, Val::Num(2.0)));
        assert_eq!(chain.lookup(outer, "x", None), Ok(Val::Num(1.0)));
        // shadowing an outer binding is legal
        assert!(chain.create(inner, "x", None, Val::Num(3.0)));
    }

    #[test]
    fn test_shadowing_isolates_inner_mutation() {
        let (mut chain, outer, inner) = chain();
        chain.create(outer, "x", None, Val::Num(1.0));
        chain.create(inner, "x", None, Val::Num(10.0));
        chain.update_or_create(inner, "x", None, Val::Num(11.0)).unwrap();
        assert_eq!(chain.lookup(outer, "x", None), Ok(Val::Num(1.0)));
        assert_eq!(chain.lookup(inner, "x", None), Ok(Val::Num(11.0)));
    }

    #[test]
    fn test_inner_sees_and_updates_outer_binding() {
        let (mut chain, outer, inner) = chain();
        chain.create(outer, "x", None, Val::Num(1.0));
        assert_eq!(chain.lookup(inner, "x", None), Ok(Val::Num(1.0)));
        chain.update_or_create(inner, "x", None, Val::Num(2.0)).unwrap();
        assert_eq!(chain.lookup(outer, "x", None), Ok(Val::Num(2.0)));
        assert!(chain.get(inner).unwrap().locals.is_empty());
    }

    #[test]
    fn test_update_or_create_creates_innermost() {
        let (mut chain, outer, inner) = chain();
        chain.update_or_create(inner, "y", None, Val::Num(5.0)).unwrap();
        assert_eq!(
            chain.lookup(outer, "y", None),
            Err(EvalError::UndefinedVariable("y".to_string()))
        );
        assert_eq!(chain.update(outer, "y", None, Val::Num(1.0)), Err(EvalError::UndefinedVariable("y".to_string())));
    }

    #[test]
    fn test_indexed_bindings() {
        let (mut chain, outer, _) = chain();
        chain.update_or_create(outer, "v", Some(3), Val::Num(9.0)).unwrap();
        chain.update_or_create(outer, "v", Some(4), Val::Num(8.0)).unwrap();
        assert_eq!(chain.lookup(outer, "v", Some(4)), Ok(Val::Num(8.0)));
        assert_eq!(
            chain.lookup(outer, "v", Some(0)),
            Err(EvalError::UndefinedElement {
                name: "v".to_string(),
                index: 0
            })
        );
        assert_eq!(chain.lookup(outer, "v", None), Err(EvalError::ArrayNeedsIndex("v".to_string())));
    }

    #[test]
    fn test_truncate_keeps_root() {
        let (mut chain, _, _) = chain();
        chain.truncate(0);
        assert_eq!(chain.len(), 1);
    }
}
