use std::collections::HashMap;

use crate::runtime_value::RuntimeValue;

/// A single scope level. The root scope holds the render's global bindings;
/// every `for` loop and macro expansion pushes one more.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, RuntimeValue>,
    /// What opened this scope (`for`, a macro name, or `root`), for tracing.
    label: String,
}

impl Scope {
    pub fn new(label: impl Into<String>) -> Self {
        Scope {
            variables: HashMap::new(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: RuntimeValue) {
        self.variables.insert(name.to_string(), value);
    }
}

/// The variable environment shared by a whole render: a stack of scopes whose
/// bottom is the root scope. Lookups search from the innermost scope outward.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![Scope::new("root")],
        }
    }

    /// An environment whose root scope is pre-seeded with `bindings`.
    pub fn from_bindings<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, RuntimeValue)>,
        K: Into<String>,
    {
        let mut env = Environment::new();
        for (name, value) in bindings {
            env.scopes[0].set(&name.into(), value);
        }
        env
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Pop the innermost scope. The root scope is never popped.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Number of scopes on the stack, root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Look up a variable, searching from innermost scope outward.
    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    /// Bind `name` in the innermost scope, shadowing any outer binding.
    pub fn declare(&mut self, name: &str, value: RuntimeValue) {
        self.current_scope_mut().set(name, value);
    }

    /// Assignment from template code: update the innermost scope that already
    /// binds `name`, or create the binding in the root scope.
    pub fn assign(&mut self, name: &str, value: RuntimeValue) {
        match self.scopes.iter_mut().rev().find(|scope| scope.contains(name)) {
            Some(scope) => scope.set(name, value),
            None => self.scopes[0].set(name, value),
        }
    }

    /// Root-scope bindings, sorted by name.
    pub fn root_bindings(&self) -> Vec<(&str, &RuntimeValue)> {
        let mut bindings: Vec<(&str, &RuntimeValue)> = self.scopes[0]
            .variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(b.0));
        bindings
    }

    fn current_scope_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_and_pops() {
        let mut env = Environment::from_bindings([("x", RuntimeValue::Integer(1))]);
        env.push_scope(Scope::new("for"));
        env.declare("x", RuntimeValue::Integer(2));
        assert_eq!(env.get("x"), Some(&RuntimeValue::Integer(2)));
        env.pop_scope();
        assert_eq!(env.get("x"), Some(&RuntimeValue::Integer(1)));
    }

    #[test]
    fn declared_names_vanish_with_their_scope() {
        let mut env = Environment::new();
        env.push_scope(Scope::new("greet"));
        env.declare("name", "Bob".into());
        env.pop_scope();
        assert!(!env.contains("name"));
    }

    #[test]
    fn none_binding_is_distinct_from_absence() {
        let mut env = Environment::from_bindings([("x", RuntimeValue::None)]);
        env.push_scope(Scope::new("for"));
        env.declare("x", RuntimeValue::Integer(3));
        env.pop_scope();
        assert_eq!(env.get("x"), Some(&RuntimeValue::None));
    }

    #[test]
    fn assign_updates_nearest_binding_or_root() {
        let mut env = Environment::new();
        env.push_scope(Scope::new("for"));
        env.declare("i", RuntimeValue::Integer(0));
        env.assign("i", RuntimeValue::Integer(5));
        env.assign("total", RuntimeValue::Integer(7));
        env.pop_scope();
        assert!(!env.contains("i"));
        assert_eq!(env.get("total"), Some(&RuntimeValue::Integer(7)));
    }

    #[test]
    fn root_scope_is_never_popped() {
        let mut env = Environment::new();
        assert!(env.pop_scope().is_none());
        assert_eq!(env.depth(), 1);
    }
}
