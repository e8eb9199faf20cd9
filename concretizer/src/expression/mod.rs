//! The built-in expression engine: a small, side-effect free expression
//! language plus assignment statements, used as the default `Evaluator`.

pub mod ast;
pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod parser;

use tracing::trace;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::evaluator::Evaluator;
use crate::runtime_value::RuntimeValue;

/// Evaluates template code with the built-in expression language.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        ExpressionEvaluator
    }
}

impl Evaluator for ExpressionEvaluator {
    fn evaluate(&mut self, source: &str, env: &mut Environment) -> Result<RuntimeValue, RuntimeError> {
        let expr = parser::parse_expression(source)?;
        trace!(?expr, "evaluate");
        interpreter::evaluate(&expr, env)
    }

    fn execute(&mut self, source: &str, env: &mut Environment) -> Result<(), RuntimeError> {
        for statement in parser::parse_statements(source)? {
            trace!(?statement, "execute");
            interpreter::execute(&statement, env)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executes_then_evaluates_against_shared_environment() {
        let mut engine = ExpressionEvaluator::new();
        let mut env = Environment::new();
        engine
            .execute("total = 0\nfor_each = [1, 2, 3]\ntotal += len(for_each)", &mut env)
            .unwrap();
        assert_eq!(
            engine.evaluate("total * 2", &mut env).unwrap(),
            RuntimeValue::Integer(6)
        );
    }

    #[test]
    fn syntax_errors_surface_as_runtime_errors() {
        let mut engine = ExpressionEvaluator::new();
        let mut env = Environment::new();
        assert!(matches!(
            engine.evaluate("1 +", &mut env),
            Err(RuntimeError::Syntax(_))
        ));
    }
}
