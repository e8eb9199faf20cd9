use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::runtime_value::{MAX_SEQUENCE_LEN, RuntimeValue};

/// Call the builtin named `function` with already evaluated arguments.
pub fn call(function: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    match function {
        "range" => range(args),
        "len" => {
            let value = single(function, args)?;
            let len = match &value {
                RuntimeValue::String(s) => s.chars().count(),
                RuntimeValue::List(items) => items.len(),
                other => return Err(type_error("List or String", other)),
            };
            Ok(RuntimeValue::Integer(len as i64))
        }
        "str" => {
            let value = single(function, args)?;
            Ok(RuntimeValue::String(value.to_string()))
        }
        "int" => {
            let value = single(function, args)?;
            to_int(value)
        }
        "float" => {
            let value = single(function, args)?;
            match value {
                RuntimeValue::Integer(n) => Ok(RuntimeValue::Float(n as f64)),
                RuntimeValue::Float(n) => Ok(RuntimeValue::Float(n)),
                RuntimeValue::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(RuntimeValue::Float)
                    .map_err(|_| type_error("numeric string", &RuntimeValue::String(s))),
                other => Err(type_error("Integer, Float or String", &other)),
            }
        }
        "abs" => {
            let value = single(function, args)?;
            match value {
                RuntimeValue::Integer(n) => n
                    .checked_abs()
                    .map(RuntimeValue::Integer)
                    .ok_or(RuntimeError::Overflow),
                RuntimeValue::Float(n) => Ok(RuntimeValue::Float(n.abs())),
                other => Err(type_error("Integer or Float", &other)),
            }
        }
        "min" => extreme(function, args, Ordering::Less),
        "max" => extreme(function, args, Ordering::Greater),
        "upper" | "lower" => {
            let value = single(function, args)?;
            match value {
                RuntimeValue::String(s) if function == "upper" => {
                    Ok(RuntimeValue::String(s.to_uppercase()))
                }
                RuntimeValue::String(s) => Ok(RuntimeValue::String(s.to_lowercase())),
                other => Err(type_error("String", &other)),
            }
        }
        "join" => {
            if !(1..=2).contains(&args.len()) {
                return Err(arity(function, "1 or 2", args.len()));
            }
            let mut args = args.into_iter();
            let items = args.next().unwrap_or(RuntimeValue::None).iterate()?;
            let separator = match args.next() {
                Some(RuntimeValue::String(s)) => s,
                Some(other) => return Err(type_error("String", &other)),
                None => String::new(),
            };
            Ok(RuntimeValue::String(
                items
                    .iter()
                    .map(|item| item.to_string())
                    .collect::<Vec<_>>()
                    .join(&separator),
            ))
        }
        _ => Err(RuntimeError::UndefinedFunction(function.to_string())),
    }
}

fn range(args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let bounds = args
        .iter()
        .map(|arg| match arg {
            RuntimeValue::Integer(n) => Ok(*n),
            other => Err(type_error("Integer", other)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(arity("range", "1 to 3", bounds.len())),
    };
    if step == 0 {
        return Err(RuntimeError::TypeError {
            expected: "non-zero step".to_string(),
            got: "0".to_string(),
        });
    }

    let (span, stride) = (i128::from(stop) - i128::from(start), i128::from(step));
    let count = if span.signum() == stride.signum() {
        (span.abs() + stride.abs() - 1) / stride.abs()
    } else {
        0
    };
    if count > MAX_SEQUENCE_LEN as i128 {
        return Err(RuntimeError::Overflow);
    }

    // `count` fits in a usize and every produced value lies between start and stop.
    Ok(RuntimeValue::List(
        (0..count)
            .map(|i| RuntimeValue::Integer((i128::from(start) + i * stride) as i64))
            .collect(),
    ))
}

fn to_int(value: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match value {
        RuntimeValue::Integer(n) => Ok(RuntimeValue::Integer(n)),
        RuntimeValue::Boolean(b) => Ok(RuntimeValue::Integer(b as i64)),
        RuntimeValue::Float(n) => {
            let truncated = n.trunc();
            if truncated.is_finite() && truncated.abs() < i64::MAX as f64 {
                Ok(RuntimeValue::Integer(truncated as i64))
            } else {
                Err(RuntimeError::Overflow)
            }
        }
        RuntimeValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(RuntimeValue::Integer)
            .map_err(|_| type_error("integer string", &RuntimeValue::String(s))),
        other => Err(type_error("Integer, Float, Boolean or String", &other)),
    }
}

/// `min`/`max` over a single list argument or over all arguments.
fn extreme(
    function: &str,
    args: Vec<RuntimeValue>,
    wanted: Ordering,
) -> Result<RuntimeValue, RuntimeError> {
    let candidates = match <[RuntimeValue; 1]>::try_from(args) {
        Ok([RuntimeValue::List(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    };

    let mut candidates = candidates.into_iter();
    let mut best = candidates
        .next()
        .ok_or_else(|| arity(function, "at least 1", 0))?;
    for candidate in candidates {
        if candidate.compare(&best)? == wanted {
            best = candidate;
        }
    }
    Ok(best)
}

fn single(function: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let got = args.len();
    match <[RuntimeValue; 1]>::try_from(args) {
        Ok([value]) => Ok(value),
        Err(_) => Err(arity(function, "1", got)),
    }
}

fn arity(function: &str, expected: &str, got: usize) -> RuntimeError {
    RuntimeError::ArgumentCount {
        function: function.to_string(),
        expected: expected.to_string(),
        got,
    }
}

fn type_error(expected: &str, got: &RuntimeValue) -> RuntimeError {
    RuntimeError::TypeError {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> RuntimeValue {
        RuntimeValue::List(values.iter().map(|n| RuntimeValue::Integer(*n)).collect())
    }

    #[test]
    fn range_forms() {
        assert_eq!(call("range", vec![RuntimeValue::Integer(3)]).unwrap(), ints(&[0, 1, 2]));
        assert_eq!(
            call("range", ints(&[5, 0, -2]).iterate().unwrap()).unwrap(),
            ints(&[5, 3, 1])
        );
        assert!(call("range", ints(&[0, 3, 0]).iterate().unwrap()).is_err());
        assert_eq!(
            call("range", vec![RuntimeValue::Integer(i64::MAX)]),
            Err(RuntimeError::Overflow)
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", vec!["42".into()]).unwrap(), RuntimeValue::Integer(42));
        assert_eq!(
            call("int", vec![RuntimeValue::Float(-2.7)]).unwrap(),
            RuntimeValue::Integer(-2)
        );
        assert_eq!(call("str", vec![ints(&[1])]).unwrap(), RuntimeValue::from("[1]"));
        assert!(call("int", vec!["x".into()]).is_err());
    }

    #[test]
    fn min_max_accept_list_or_varargs() {
        assert_eq!(call("max", vec![ints(&[3, 9, 4])]).unwrap(), RuntimeValue::Integer(9));
        assert_eq!(
            call("min", vec![RuntimeValue::Integer(3), RuntimeValue::Float(1.5)]).unwrap(),
            RuntimeValue::Float(1.5)
        );
        assert!(call("min", vec![]).is_err());
    }

    #[test]
    fn join_and_case() {
        assert_eq!(
            call("join", vec![ints(&[1, 2]), "-".into()]).unwrap(),
            RuntimeValue::from("1-2")
        );
        assert_eq!(call("upper", vec!["ab".into()]).unwrap(), RuntimeValue::from("AB"));
        assert_eq!(call("len", vec!["héllo".into()]).unwrap(), RuntimeValue::Integer(5));
    }

    #[test]
    fn wrong_arity_and_unknown_names() {
        assert_eq!(
            call("len", vec![]),
            Err(RuntimeError::ArgumentCount {
                function: "len".into(),
                expected: "1".into(),
                got: 0,
            })
        );
        assert_eq!(
            call("print", vec![]),
            Err(RuntimeError::UndefinedFunction("print".into()))
        );
    }
}
