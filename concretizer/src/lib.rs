pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod expression;
pub mod helpers;
pub mod macros;
pub mod options;
pub mod runtime_value;

pub use environment::Environment;
pub use error::{DiagnosticError, RuntimeError};
pub use evaluator::Evaluator;
pub use executor::{Rendered, render_template, render_template_with};
pub use expression::ExpressionEvaluator;
pub use options::{ErrorPolicy, RenderOptions};
pub use runtime_value::RuntimeValue;
