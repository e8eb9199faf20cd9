use std::cmp::Ordering;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expression::ast::{BinaryOperator, Expr, Statement, UnaryOperator};
use crate::expression::builtins;
use crate::runtime_value::{MAX_SEQUENCE_LEN, RuntimeValue};

/// Evaluate an expression AST node against `env`.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<RuntimeValue, RuntimeError> {
    match expr {
        // --- Literals ---
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => Ok(RuntimeValue::List(
            items
                .iter()
                .map(|item| evaluate(item, env))
                .collect::<Result<Vec<_>, _>>()?,
        )),

        // --- References ---
        Expr::Variable(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),

        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            builtins::call(function, args)
        }

        Expr::Index { target, index } => {
            let target = evaluate(target, env)?;
            let index = evaluate(index, env)?;
            eval_index(target, &index)
        }

        // --- Operations ---
        Expr::UnaryOperation { operator, operand } => {
            let value = evaluate(operand, env)?;
            match operator {
                UnaryOperator::LogicalNot => Ok(RuntimeValue::Boolean(!value.is_truthy())),
                UnaryOperator::Negation => match value {
                    RuntimeValue::Integer(n) => n
                        .checked_neg()
                        .map(RuntimeValue::Integer)
                        .ok_or(RuntimeError::Overflow),
                    RuntimeValue::Float(n) => Ok(RuntimeValue::Float(-n)),
                    other => Err(RuntimeError::TypeError {
                        expected: "Integer or Float".to_string(),
                        got: other.type_name().to_string(),
                    }),
                },
            }
        }

        Expr::BinaryOperation {
            operator,
            left,
            right,
        } => {
            let left = evaluate(left, env)?;
            // Short-circuit: the right operand is only evaluated when needed.
            match operator {
                BinaryOperator::LogicalAnd if !left.is_truthy() => {
                    return Ok(RuntimeValue::Boolean(false));
                }
                BinaryOperator::LogicalOr if left.is_truthy() => {
                    return Ok(RuntimeValue::Boolean(true));
                }
                _ => {}
            }
            let right = evaluate(right, env)?;
            eval_binary_op(operator, &left, &right)
        }

        Expr::Conditional {
            condition,
            true_branch,
            false_branch,
        } => {
            if evaluate(condition, env)?.is_truthy() {
                evaluate(true_branch, env)
            } else {
                evaluate(false_branch, env)
            }
        }
    }
}

/// Run one statement for its effect on `env`.
pub fn execute(statement: &Statement, env: &mut Environment) -> Result<(), RuntimeError> {
    match statement {
        Statement::Assignment {
            variable,
            operator,
            value,
        } => {
            let value = evaluate(value, env)?;
            let value = match operator {
                Some(operator) => {
                    let current = env
                        .get(variable)
                        .ok_or_else(|| RuntimeError::UndefinedVariable(variable.clone()))?;
                    eval_binary_op(operator, current, &value)?
                }
                None => value,
            };
            env.assign(variable, value);
            Ok(())
        }
        Statement::Expression(expr) => evaluate(expr, env).map(|_| ()),
    }
}

fn eval_index(target: RuntimeValue, index: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    let RuntimeValue::Integer(i) = *index else {
        return Err(RuntimeError::TypeError {
            expected: "Integer index".to_string(),
            got: index.type_name().to_string(),
        });
    };
    match target {
        RuntimeValue::List(mut items) => {
            let position = resolve_index(i, items.len())?;
            Ok(items.swap_remove(position))
        }
        RuntimeValue::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let position = resolve_index(i, chars.len())?;
            Ok(RuntimeValue::String(chars[position].to_string()))
        }
        other => Err(RuntimeError::TypeError {
            expected: "List or String".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// Map a possibly negative index onto `0..len`.
fn resolve_index(index: i64, len: usize) -> Result<usize, RuntimeError> {
    let len = len as i64;
    let position = if index < 0 { index + len } else { index };
    if (0..len).contains(&position) {
        Ok(position as usize)
    } else {
        Err(RuntimeError::IndexOutOfBounds(index))
    }
}

fn coerce_number(val: &RuntimeValue) -> Result<f64, RuntimeError> {
    val.as_number().ok_or_else(|| RuntimeError::TypeError {
        expected: "Integer or Float".to_string(),
        got: val.type_name().to_string(),
    })
}

fn eval_binary_op(
    op: &BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    match op {
        BinaryOperator::Addition => match (left, right) {
            (RuntimeValue::String(a), RuntimeValue::String(b)) => {
                sequence_len(a.len().checked_add(b.len()))?;
                Ok(RuntimeValue::String(format!("{}{}", a, b)))
            }
            (RuntimeValue::List(a), RuntimeValue::List(b)) => {
                sequence_len(a.len().checked_add(b.len()))?;
                Ok(RuntimeValue::List(a.iter().chain(b).cloned().collect()))
            }
            _ => arithmetic(left, right, i64::checked_add, |a, b| a + b),
        },
        BinaryOperator::Subtraction => arithmetic(left, right, i64::checked_sub, |a, b| a - b),
        BinaryOperator::Multiplication => match (left, right) {
            (RuntimeValue::String(s), RuntimeValue::Integer(n))
            | (RuntimeValue::Integer(n), RuntimeValue::String(s)) => {
                let count = repeat_count(*n);
                sequence_len(s.len().checked_mul(count))?;
                Ok(RuntimeValue::String(s.repeat(count)))
            }
            (RuntimeValue::List(items), RuntimeValue::Integer(n))
            | (RuntimeValue::Integer(n), RuntimeValue::List(items)) => {
                let total = sequence_len(items.len().checked_mul(repeat_count(*n)))?;
                Ok(RuntimeValue::List(
                    items.iter().cloned().cycle().take(total).collect(),
                ))
            }
            _ => arithmetic(left, right, i64::checked_mul, |a, b| a * b),
        },
        BinaryOperator::Division => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(RuntimeValue::Float(a / b))
        }
        BinaryOperator::FloorDivision => match (left, right) {
            (RuntimeValue::Integer(_), RuntimeValue::Integer(0)) => Err(RuntimeError::DivisionByZero),
            (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => {
                let quotient = a.checked_div(*b).ok_or(RuntimeError::Overflow)?;
                if a % b != 0 && (*a < 0) != (*b < 0) {
                    Ok(RuntimeValue::Integer(quotient - 1))
                } else {
                    Ok(RuntimeValue::Integer(quotient))
                }
            }
            _ => {
                let a = coerce_number(left)?;
                let b = coerce_number(right)?;
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Ok(RuntimeValue::Float((a / b).floor()))
            }
        },
        BinaryOperator::Modulo => match (left, right) {
            (RuntimeValue::Integer(_), RuntimeValue::Integer(0)) => Err(RuntimeError::DivisionByZero),
            (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => {
                let remainder = a.checked_rem(*b).ok_or(RuntimeError::Overflow)?;
                if remainder != 0 && (remainder < 0) != (*b < 0) {
                    Ok(RuntimeValue::Integer(remainder + b))
                } else {
                    Ok(RuntimeValue::Integer(remainder))
                }
            }
            _ => {
                let a = coerce_number(left)?;
                let b = coerce_number(right)?;
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                let remainder = a % b;
                if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                    Ok(RuntimeValue::Float(remainder + b))
                } else {
                    Ok(RuntimeValue::Float(remainder))
                }
            }
        },
        BinaryOperator::Equality => Ok(RuntimeValue::Boolean(left == right)),
        BinaryOperator::Inequality => Ok(RuntimeValue::Boolean(left != right)),
        BinaryOperator::GreaterThan => ordering(left, right, Ordering::is_gt),
        BinaryOperator::LessThan => ordering(left, right, Ordering::is_lt),
        BinaryOperator::GreaterThanOrEqual => ordering(left, right, Ordering::is_ge),
        BinaryOperator::LessThanOrEqual => ordering(left, right, Ordering::is_le),
        BinaryOperator::LogicalAnd => {
            Ok(RuntimeValue::Boolean(left.is_truthy() && right.is_truthy()))
        }
        BinaryOperator::LogicalOr => {
            Ok(RuntimeValue::Boolean(left.is_truthy() || right.is_truthy()))
        }
    }
}

fn repeat_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

/// Check the length of a string or list about to be built.
fn sequence_len(len: Option<usize>) -> Result<usize, RuntimeError> {
    len.filter(|&len| len <= MAX_SEQUENCE_LEN)
        .ok_or(RuntimeError::Overflow)
}

/// Integer arithmetic when both sides are integers, float otherwise.
fn arithmetic(
    left: &RuntimeValue,
    right: &RuntimeValue,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<RuntimeValue, RuntimeError> {
    match (left, right) {
        (RuntimeValue::Integer(a), RuntimeValue::Integer(b)) => int_op(*a, *b)
            .map(RuntimeValue::Integer)
            .ok_or(RuntimeError::Overflow),
        _ => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            Ok(RuntimeValue::Float(float_op(a, b)))
        }
    }
}

fn ordering(
    left: &RuntimeValue,
    right: &RuntimeValue,
    f: impl Fn(Ordering) -> bool,
) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Boolean(f(left.compare(right)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::{parse_expression, parse_statements};

    fn eval(source: &str, env: &Environment) -> Result<RuntimeValue, RuntimeError> {
        evaluate(&parse_expression(source)?, env)
    }

    fn eval_ok(source: &str) -> RuntimeValue {
        eval(source, &Environment::new()).unwrap()
    }

    #[test]
    fn integer_and_float_arithmetic() {
        assert_eq!(eval_ok("1 + 2 * 3"), RuntimeValue::Integer(7));
        assert!(matches!(eval_ok("7 / 2"), RuntimeValue::Float(n) if n == 3.5));
        assert!(matches!(eval_ok("1 + 0.5"), RuntimeValue::Float(n) if n == 1.5));
    }

    #[test]
    fn floor_division_and_modulo_round_down() {
        assert_eq!(eval_ok("-7 // 2"), RuntimeValue::Integer(-4));
        assert_eq!(eval_ok("-7 % 3"), RuntimeValue::Integer(2));
        assert_eq!(eval_ok("7 % -3"), RuntimeValue::Integer(-2));
    }

    #[test]
    fn division_by_zero_and_overflow_are_errors() {
        let env = Environment::new();
        assert_eq!(eval("1 / 0", &env), Err(RuntimeError::DivisionByZero));
        assert_eq!(eval("1 % 0", &env), Err(RuntimeError::DivisionByZero));
        assert_eq!(
            eval("9223372036854775807 + 1", &env),
            Err(RuntimeError::Overflow)
        );
    }

    #[test]
    fn strings_and_lists_concatenate_and_repeat() {
        assert_eq!(eval_ok("'ab' + \"cd\""), RuntimeValue::from("abcd"));
        assert_eq!(eval_ok("'-' * 3"), RuntimeValue::from("---"));
        assert_eq!(
            eval_ok("[1] + [2] * 2"),
            RuntimeValue::List(vec![
                RuntimeValue::Integer(1),
                RuntimeValue::Integer(2),
                RuntimeValue::Integer(2),
            ])
        );
    }

    #[test]
    fn oversized_repetition_is_an_overflow() {
        let env = Environment::new();
        assert_eq!(
            eval("'ab' * 9223372036854775807", &env),
            Err(RuntimeError::Overflow)
        );
        assert_eq!(
            eval("len([1, 2] * 9223372036854775807)", &env),
            Err(RuntimeError::Overflow)
        );
        assert_eq!(eval_ok("'ab' * -3"), RuntimeValue::from(""));
    }

    #[test]
    fn indexing_counts_from_either_end() {
        assert_eq!(eval_ok("[1, 2, 3][-1]"), RuntimeValue::Integer(3));
        assert_eq!(eval_ok("'abc'[1]"), RuntimeValue::from("b"));
        assert_eq!(
            eval("[1][5]", &Environment::new()),
            Err(RuntimeError::IndexOutOfBounds(5))
        );
    }

    #[test]
    fn logic_short_circuits() {
        // `missing` is never looked up.
        assert_eq!(eval_ok("false and missing"), RuntimeValue::Boolean(false));
        assert_eq!(eval_ok("1 || missing"), RuntimeValue::Boolean(true));
        assert_eq!(eval_ok("not 0"), RuntimeValue::Boolean(true));
        assert_eq!(eval_ok("1 < 2 ? 'y' : 'n'"), RuntimeValue::from("y"));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        assert_eq!(
            eval("nope", &Environment::new()),
            Err(RuntimeError::UndefinedVariable("nope".into()))
        );
    }

    #[test]
    fn statements_assign_and_update() {
        let mut env = Environment::new();
        for statement in parse_statements("x = 2\nx *= 5; x -= 1").unwrap() {
            execute(&statement, &mut env).unwrap();
        }
        assert_eq!(env.get("x"), Some(&RuntimeValue::Integer(9)));
    }

    #[test]
    fn compound_assignment_needs_existing_binding() {
        let mut env = Environment::new();
        let statements = parse_statements("y += 1").unwrap();
        assert_eq!(
            execute(&statements[0], &mut env),
            Err(RuntimeError::UndefinedVariable("y".into()))
        );
    }
}
