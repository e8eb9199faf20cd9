use std::cmp::Ordering;
use std::fmt;

use crate::error::RuntimeError;

/// Longest string (in bytes) or list an expression may build. Anything larger
/// is reported as `RuntimeError::Overflow`.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// A value produced by evaluating an expression and stored in the Environment.
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    None,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<RuntimeValue>),
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::None => false,
            RuntimeValue::Boolean(b) => *b,
            RuntimeValue::Integer(n) => *n != 0,
            RuntimeValue::Float(n) => *n != 0.0,
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::List(items) => !items.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::None => "None",
            RuntimeValue::Boolean(_) => "Boolean",
            RuntimeValue::Integer(_) => "Integer",
            RuntimeValue::Float(_) => "Float",
            RuntimeValue::String(_) => "String",
            RuntimeValue::List(_) => "List",
        }
    }

    /// The elements a `for` directive iterates over.
    pub fn iterate(self) -> Result<Vec<RuntimeValue>, RuntimeError> {
        match self {
            RuntimeValue::List(items) => Ok(items),
            RuntimeValue::String(s) => Ok(s
                .chars()
                .map(|c| RuntimeValue::String(c.to_string()))
                .collect()),
            other => Err(RuntimeError::TypeError {
                expected: "List or String".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuntimeValue::Integer(n) => Some(*n as f64),
            RuntimeValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Ordering for `<`, `>`, `min` and `max`: numbers with numbers, strings
    /// with strings, lists element-wise.
    pub fn compare(&self, other: &RuntimeValue) -> Result<Ordering, RuntimeError> {
        match (self, other) {
            (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => Ok(a.cmp(b)),
            (RuntimeValue::String(a), RuntimeValue::String(b)) => Ok(a.cmp(b)),
            (RuntimeValue::Boolean(a), RuntimeValue::Boolean(b)) => Ok(a.cmp(b)),
            (RuntimeValue::List(a), RuntimeValue::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        unequal => return Ok(unequal),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| RuntimeError::TypeError {
                    expected: "comparable numbers".to_string(),
                    got: "NaN".to_string(),
                }),
                _ => Err(RuntimeError::TypeError {
                    expected: "comparable types".to_string(),
                    got: format!("{} and {}", self.type_name(), other.type_name()),
                }),
            },
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::None => write!(f, "none"),
            RuntimeValue::Boolean(b) => write!(f, "{}", b),
            RuntimeValue::Integer(n) => write!(f, "{}", n),
            RuntimeValue::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            RuntimeValue::String(s) => write!(f, "{}", s),
            RuntimeValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        RuntimeValue::String(s) => write!(f, "{:?}", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::None, RuntimeValue::None) => true,
            (RuntimeValue::Boolean(a), RuntimeValue::Boolean(b)) => a == b,
            (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
            (RuntimeValue::List(a), RuntimeValue::List(b)) => a == b,
            (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b, // NaN != NaN per IEEE 754
                _ => false,
            },
        }
    }
}

impl From<i64> for RuntimeValue {
    fn from(n: i64) -> Self {
        RuntimeValue::Integer(n)
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(s.to_string())
    }
}

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        RuntimeValue::Boolean(b)
    }
}
