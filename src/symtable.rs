//! Scope stack.
//!
//! The parser keeps one instance mapping names to [`Type`](crate::types::Type)
//! for expression typing; the code generator keeps another mapping names to
//! stack offsets.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use nolog::*;
use thiserror::Error;

/// Lookup or declaration failure, converted into a positioned diagnostic by
/// the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Name already declared in the innermost scope.
    #[error("`{0}` is already declared in this scope")]
    Duplicate(String),
    /// Name not found in any scope.
    #[error("`{0}` is not declared")]
    Undefined(String),
}

/// Chain of lexical scopes, innermost last.
#[derive(Debug, Clone)]
pub struct ScopeStack<V> {
    frames: Vec<HashMap<String, V>>,
}

impl<V> Default for ScopeStack<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ScopeStack<V> {
    /// Create an empty stack with no frames.
    pub fn new() -> Self {
        Self { frames: vec![] }
    }

    /// Open a new innermost scope.
    pub fn push_scope(&mut self) {
        trace!("SCOPE " => "push, depth {}", self.frames.len() + 1);
        self.frames.push(HashMap::new());
    }

    /// Discard the innermost scope and its symbols.
    pub fn pop_scope(&mut self) {
        trace!("SCOPE " => "pop, depth {}", self.frames.len().saturating_sub(1));
        self.frames.pop();
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declare `name` in the innermost scope.
    ///
    /// Shadowing a name from an outer scope is allowed. Declaring with no
    /// open scope opens one.
    pub fn declare(&mut self, name: impl Into<String>, value: V) -> Result<(), ScopeError> {
        let name = name.into();
        if self.frames.is_empty() {
            self.push_scope();
        }
        let frame = self.frames.last_mut().ok_or_else(|| ScopeError::Undefined(name.clone()))?;
        if frame.contains_key(&name) {
            return Err(ScopeError::Duplicate(name));
        }
        frame.insert(name, value);
        Ok(())
    }

    /// Find `name`, searching from the innermost scope outwards.
    pub fn lookup<Q>(&self, name: &Q) -> Result<&V, ScopeError>
    where
        Q: ?Sized + Eq + Hash + ToString,
        String: Borrow<Q>,
    {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.declare("x", 1).unwrap();
        scopes.push_scope();
        scopes.declare("x", 2).unwrap();
        assert_eq!(scopes.lookup("x"), Ok(&2));
        scopes.pop_scope();
        assert_eq!(scopes.lookup("x"), Ok(&1));
    }

    #[test]
    fn duplicate_in_same_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.declare("x", 1).unwrap();
        assert_eq!(
            scopes.declare("x", 3),
            Err(ScopeError::Duplicate("x".to_string()))
        );
    }

    #[test]
    fn undefined_after_pop() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.push_scope();
        scopes.declare("y", 'a').unwrap();
        scopes.pop_scope();
        assert_eq!(scopes.depth(), 1);
        assert_eq!(
            scopes.lookup("y"),
            Err(ScopeError::Undefined("y".to_string()))
        );
    }
}
