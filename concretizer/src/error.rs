use std::fmt;
use std::ops::Range;

use xcb::parser::ParseError;

/// A failure while rendering. Evaluation failures raised by an `Evaluator`
/// are always fatal; `Structural` is only fatal under `ErrorPolicy::Abort`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("undefined function: {0}")]
    UndefinedFunction(String),
    #[error("{function}() takes {expected} argument(s), got {got}")]
    ArgumentCount {
        function: String,
        expected: String,
        got: usize,
    },
    #[error("index {0} out of bounds")]
    IndexOutOfBounds(i64),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("stack overflow: macro expansion nested deeper than {0} levels")]
    StackOverflow(usize),
    #[error("{0}")]
    Structural(String),
}

/// A runtime error or warning enriched with source location information.
#[derive(Debug, Clone)]
pub struct DiagnosticError {
    pub error: RuntimeError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    pub is_warning: bool,
}

impl DiagnosticError {
    /// Create a warning diagnostic with a source span.
    pub fn warning(message: String, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error: RuntimeError::Structural(message),
            span: Some(span),
            source_id,
            is_warning: true,
        }
    }

    pub fn at(mut self, span: Range<usize>, source_id: usize) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
            self.source_id = source_id;
        }
        self
    }
}

impl From<RuntimeError> for DiagnosticError {
    fn from(error: RuntimeError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
            is_warning: false,
        }
    }
}

impl From<&ParseError> for DiagnosticError {
    fn from(error: &ParseError) -> Self {
        DiagnosticError::warning(error.message.clone(), error.span.clone(), error.file_id)
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DiagnosticError {}
