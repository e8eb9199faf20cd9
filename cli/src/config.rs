use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use concretizer::{Environment, RenderOptions, RuntimeValue};

/// Render settings read from a TOML file (`--vars`, or `<name>.toml` next to
/// a golden test).
///
/// ```toml
/// strict = true
///
/// [vars]
/// title = "Report"
/// items = [1, 2, 3]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RenderConfig {
    /// Abort on the first structural problem instead of warning.
    #[serde(default)]
    pub strict: bool,

    /// Variables bound in the root scope before rendering.
    #[serde(default)]
    pub vars: BTreeMap<String, toml::Value>,
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        Self::parse(&text).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("TOML parse error: {}", e))
    }

    pub fn environment(&self) -> Environment {
        Environment::from_bindings(
            self.vars
                .iter()
                .map(|(name, value)| (name.as_str(), toml_to_runtime(value))),
        )
    }

    pub fn options(&self) -> RenderOptions {
        if self.strict {
            RenderOptions::strict()
        } else {
            RenderOptions::default()
        }
    }
}

pub fn toml_to_runtime(val: &toml::Value) -> RuntimeValue {
    match val {
        toml::Value::Integer(n) => RuntimeValue::Integer(*n),
        toml::Value::Float(f) => RuntimeValue::Float(*f),
        toml::Value::Boolean(b) => RuntimeValue::Boolean(*b),
        toml::Value::String(s) => RuntimeValue::String(s.clone()),
        toml::Value::Array(items) => RuntimeValue::List(items.iter().map(toml_to_runtime).collect()),
        other => RuntimeValue::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_seed_the_root_scope() {
        let config = RenderConfig::parse("strict = true\n[vars]\nn = 3\nnames = ['a', 'b']\n").unwrap();
        assert!(config.strict);
        let env = config.environment();
        assert_eq!(env.get("n"), Some(&RuntimeValue::Integer(3)));
        assert_eq!(
            env.get("names"),
            Some(&RuntimeValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(config.options(), RenderOptions::strict());
    }

    #[test]
    fn empty_config_is_lenient() {
        let config = RenderConfig::parse("").unwrap();
        assert!(!config.strict);
        assert!(config.vars.is_empty());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(RenderConfig::parse("strict = ").is_err());
    }
}
