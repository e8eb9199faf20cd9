use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::runtime_value::RuntimeValue;

/// The capability that gives meaning to the code embedded in a template.
///
/// The concretizer never interprets expressions or statements itself: every
/// interpolation, `#{ }#` block, directive condition, loop sequence and macro
/// argument is handed to an `Evaluator` together with the render's
/// Environment. Any error returned here aborts the render.
pub trait Evaluator {
    /// Evaluate `source` as a single expression.
    fn evaluate(&mut self, source: &str, env: &mut Environment) -> Result<RuntimeValue, RuntimeError>;

    /// Run `source` as statements for their effect on `env`.
    fn execute(&mut self, source: &str, env: &mut Environment) -> Result<(), RuntimeError>;
}
