use crate::runtime_value::RuntimeValue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    /// Arithmetic negation: -x
    Negation,
    /// Logical not: !x, not x
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    FloorDivision,
    Modulo,
    LogicalAnd,
    LogicalOr,
    Equality,
    Inequality,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// An expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(RuntimeValue),
    Variable(String),
    List(Vec<Expr>),
    Call {
        function: String,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expr>,
    },
    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// cond ? expr : expr
    Conditional {
        condition: Box<Expr>,
        true_branch: Box<Expr>,
        false_branch: Box<Expr>,
    },
}

/// A statement from a `#{ }#` code block.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`, or `name op= expr` when `operator` is set.
    Assignment {
        variable: String,
        operator: Option<BinaryOperator>,
        value: Expr,
    },
    /// Expression evaluation (side effects only, result discarded).
    Expression(Expr),
}
