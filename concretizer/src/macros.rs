use std::collections::HashMap;
use std::rc::Rc;

use xcb::item::Item;

/// A user macro defined by a `#(macro name(params))` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Item>,
}

/// Registry of the macros defined so far in a render, indexed by name.
/// Macros are never removed; registering a name again replaces the old one.
#[derive(Debug, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, Rc<Macro>>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an earlier definition was replaced.
    pub fn register(&mut self, definition: Macro) -> bool {
        self.macros
            .insert(definition.name.clone(), Rc::new(definition))
            .is_some()
    }

    /// Macros are shared, so a body can keep running while it redefines itself.
    pub fn get(&self, name: &str) -> Option<Rc<Macro>> {
        self.macros.get(name).cloned()
    }

    /// All registered macro names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.macros.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, params: &[&str]) -> Macro {
        Macro {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = MacroRegistry::new();
        assert!(!registry.register(definition("greet", &["name"])));
        assert!(registry.register(definition("greet", &["a", "b"])));
        assert_eq!(registry.get("greet").unwrap().params, vec!["a", "b"]);
        assert_eq!(registry.names(), vec!["greet"]);
    }

    #[test]
    fn unknown_names_are_absent() {
        assert!(MacroRegistry::new().get("nope").is_none());
    }
}
