//! Variable scopes.
//!
//! A scope maps names to tagged values. Every script instance owns one local
//! scope; the kernel owns the global scope shared by all instances and by bare
//! REPL lines. Reads during interpolation see a merged view where the local
//! scope shadows the global one.

use std::collections::HashMap;

use neet_types::{Variable, VariableKind};
use thiserror::Error;

/// Why an assignment was rejected. The existing value is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("Variable names cannot be empty.")]
    EmptyName,
    #[error("Variable names cannot start with numbers.")]
    LeadingDigit,
    #[error("Variable already exists with a different type.")]
    KindMismatch {
        name: String,
        existing: VariableKind,
        attempted: VariableKind,
    },
}

/// Check that a name is usable as a variable name.
pub fn validate_name(name: &str) -> Result<(), AssignError> {
    match name.chars().next() {
        None => Err(AssignError::EmptyName),
        Some(c) if c.is_ascii_digit() => Err(AssignError::LeadingDigit),
        Some(_) => Ok(()),
    }
}

/// One layer of variables.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: HashMap<String, Variable>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Create or overwrite a variable.
    ///
    /// Overwriting is only allowed with a value of the same tag.
    pub fn assign(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        validate_name(name)?;
        if let Some(existing) = self.vars.get(name) {
            if existing.kind() != value.kind() {
                return Err(AssignError::KindMismatch {
                    name: name.to_string(),
                    existing: existing.kind(),
                    attempted: value.kind(),
                });
            }
        }
        self.vars.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.vars.remove(name)
    }

    /// Variable names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.keys().cloned().collect();
        names.sort();
        names
    }

    /// All variables as sorted (name, value) pairs.
    pub fn all(&self) -> Vec<(String, Variable)> {
        let mut all: Vec<(String, Variable)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_and_get() {
        let mut scope = Scope::new();
        scope.assign("x", Variable::text("1")).unwrap();
        assert_eq!(scope.get("x"), Some(&Variable::text("1")));
        assert!(scope.contains("x"));
    }

    #[test]
    fn same_kind_overwrites() {
        let mut scope = Scope::new();
        scope.assign("x", Variable::text("1")).unwrap();
        scope.assign("x", Variable::text("2")).unwrap();
        assert_eq!(scope.get("x").and_then(Variable::as_text), Some("2"));
    }

    #[test]
    fn kind_change_is_rejected_and_value_kept() {
        let mut scope = Scope::new();
        scope.assign("x", Variable::text("keep")).unwrap();

        let err = scope.assign("x", Variable::empty_list()).unwrap_err();
        assert_eq!(err.to_string(), "Variable already exists with a different type.");
        assert_eq!(scope.get("x"), Some(&Variable::text("keep")));
    }

    #[test]
    fn digit_led_names_rejected() {
        let mut scope = Scope::new();
        assert_eq!(
            scope.assign("1x", Variable::text("v")),
            Err(AssignError::LeadingDigit)
        );
        assert!(scope.is_empty());
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(validate_name(""), Err(AssignError::EmptyName));
        assert!(validate_name("a1").is_ok());
        assert!(validate_name("_x").is_ok());
    }

    #[test]
    fn remove_returns_value() {
        let mut scope = Scope::new();
        scope.assign("x", Variable::text("v")).unwrap();
        assert_eq!(scope.remove("x"), Some(Variable::text("v")));
        assert_eq!(scope.remove("x"), None);
    }

    #[test]
    fn names_sorted() {
        let mut scope = Scope::new();
        scope.assign("b", Variable::text("2")).unwrap();
        scope.assign("a", Variable::text("1")).unwrap();
        assert_eq!(scope.names(), vec!["a", "b"]);
        assert_eq!(scope.all()[0].0, "a");
        assert_eq!(scope.len(), 2);
    }
}
