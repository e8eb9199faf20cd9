use crate::error::RuntimeError;
use crate::expression::ast::{BinaryOperator, Expr, Statement, UnaryOperator};
use crate::expression::lexer::{Token, tokenize};
use crate::runtime_value::RuntimeValue;

/// Parse `source` as exactly one expression. Line breaks inside it are
/// ignored.
pub fn parse_expression(source: &str) -> Result<Expr, RuntimeError> {
    let tokens = tokenize(source)?
        .into_iter()
        .filter(|token| *token != Token::Separator)
        .collect();
    let mut parser = ExprParser::new(tokens);
    let expr = parser.parse_expr(0)?;
    if !parser.at_end() {
        return Err(parser.error("unexpected tokens after expression"));
    }
    Ok(expr)
}

/// Parse `source` as a sequence of statements separated by newlines or `;`.
pub fn parse_statements(source: &str) -> Result<Vec<Statement>, RuntimeError> {
    let mut parser = ExprParser::new(tokenize(source)?);
    let mut statements = Vec::new();

    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        statements.push(parser.parse_statement()?);
        if !parser.at_end() && parser.peek() != Some(&Token::Separator) {
            return Err(parser.error("expected end of statement"));
        }
    }

    Ok(statements)
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    /// Depth of the expression tree being built.
    nesting: usize,
}

/// Deepest expression tree the parser accepts.
pub const MAX_NESTING: usize = 256;

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_CONDITIONAL: u8 = 2; // ? :
const BP_OR: u8 = 4; // || or
const BP_AND: u8 = 6; // && and
const BP_EQUALITY: u8 = 8; // == !=
const BP_COMPARISON: u8 = 10; // < > <= >=
const BP_ADDITIVE: u8 = 12; // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / // %
const BP_UNARY: u8 = 16; // ! not -

impl ExprParser {
    fn new(tokens: Vec<Token>) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error(&self, msg: impl Into<String>) -> RuntimeError {
        RuntimeError::Syntax(msg.into())
    }

    fn skip_separators(&mut self) {
        while self.peek() == Some(&Token::Separator) {
            self.pos += 1;
        }
    }

    /// Open one more level of the tree. Nothing is released on error, the
    /// whole parse fails anyway.
    fn nest(&mut self) -> Result<(), RuntimeError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.error(format!(
                "expression nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), RuntimeError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {:?}, found {:?}", expected, token))),
            None => Err(self.error(format!("expected {:?}, found end of input", expected))),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, RuntimeError> {
        let operator = match (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)) {
            (Some(Token::Ident(_)), Some(Token::Eq)) => Some(None),
            (Some(Token::Ident(_)), Some(Token::PlusEq)) => Some(Some(BinaryOperator::Addition)),
            (Some(Token::Ident(_)), Some(Token::MinusEq)) => Some(Some(BinaryOperator::Subtraction)),
            (Some(Token::Ident(_)), Some(Token::StarEq)) => {
                Some(Some(BinaryOperator::Multiplication))
            }
            _ => None,
        };

        match operator {
            Some(operator) => {
                let Some(Token::Ident(variable)) = self.advance() else {
                    return Err(self.error("expected identifier"));
                };
                self.advance();
                let value = self.parse_expr(0)?;
                Ok(Statement::Assignment {
                    variable,
                    operator,
                    value,
                })
            }
            None => Ok(Statement::Expression(self.parse_expr(0)?)),
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, RuntimeError> {
        self.nest()?;
        let mut levels = 1;
        let mut left = self.parse_prefix()?;

        loop {
            let Some(token) = self.peek() else { break };
            let Some((l_bp, r_bp)) = infix_bp(token) else { break };

            if l_bp < min_bp {
                break;
            }

            let is_conditional = *token == Token::Question;
            // every operator wraps `left` one level deeper
            self.nest()?;
            levels += 1;

            // Conditional operator: cond ? a : b
            if is_conditional {
                self.advance();
                let true_branch = self.parse_expr(0)?;
                self.expect(Token::Colon)?;
                let false_branch = self.parse_expr(r_bp)?;
                left = Expr::Conditional {
                    condition: Box::new(left),
                    true_branch: Box::new(true_branch),
                    false_branch: Box::new(false_branch),
                };
                continue;
            }

            let operator = match self.advance() {
                Some(Token::Plus) => BinaryOperator::Addition,
                Some(Token::Minus) => BinaryOperator::Subtraction,
                Some(Token::Star) => BinaryOperator::Multiplication,
                Some(Token::Slash) => BinaryOperator::Division,
                Some(Token::SlashSlash) => BinaryOperator::FloorDivision,
                Some(Token::Percent) => BinaryOperator::Modulo,
                Some(Token::EqEq) => BinaryOperator::Equality,
                Some(Token::BangEq) => BinaryOperator::Inequality,
                Some(Token::Gt) => BinaryOperator::GreaterThan,
                Some(Token::Lt) => BinaryOperator::LessThan,
                Some(Token::GtEq) => BinaryOperator::GreaterThanOrEqual,
                Some(Token::LtEq) => BinaryOperator::LessThanOrEqual,
                Some(Token::AmpAmp | Token::And) => BinaryOperator::LogicalAnd,
                Some(Token::PipePipe | Token::Or) => BinaryOperator::LogicalOr,
                _ => return Err(self.error("unexpected infix operator")),
            };
            let right = self.parse_expr(r_bp)?;

            left = Expr::BinaryOperation {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.nesting -= levels;
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, RuntimeError> {
        let token = self
            .advance()
            .ok_or_else(|| self.error("unexpected end of expression"))?;

        let expr = match token {
            // Literals
            Token::Integer(n) => Expr::Literal(RuntimeValue::Integer(n)),
            Token::Float(n) => Expr::Literal(RuntimeValue::Float(n)),
            Token::StringLit(s) => Expr::Literal(RuntimeValue::String(s)),
            Token::True => Expr::Literal(RuntimeValue::Boolean(true)),
            Token::False => Expr::Literal(RuntimeValue::Boolean(false)),
            Token::None => Expr::Literal(RuntimeValue::None),

            // References and calls
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let args = self.parse_list(Token::RParen)?;
                    Expr::Call {
                        function: name,
                        args,
                    }
                } else {
                    Expr::Variable(name)
                }
            }

            // Unary operators
            Token::Bang | Token::Not => {
                let operand = self.parse_expr(BP_UNARY)?;
                Expr::UnaryOperation {
                    operator: UnaryOperator::LogicalNot,
                    operand: Box::new(operand),
                }
            }
            Token::Minus => {
                let operand = self.parse_expr(BP_UNARY)?;
                Expr::UnaryOperation {
                    operator: UnaryOperator::Negation,
                    operand: Box::new(operand),
                }
            }

            // Parenthesized expression
            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                expr
            }

            Token::LBracket => Expr::List(self.parse_list(Token::RBracket)?),

            other => return Err(self.error(format!("unexpected token: {:?}", other))),
        };

        self.parse_postfix(expr)
    }

    /// Indexing binds tighter than any prefix or infix operator.
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, RuntimeError> {
        let mut levels = 0;
        while self.peek() == Some(&Token::LBracket) {
            self.nest()?;
            levels += 1;
            self.advance();
            let index = self.parse_expr(0)?;
            self.expect(Token::RBracket)?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        self.nesting -= levels;
        Ok(expr)
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, RuntimeError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&close) {
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_expr(0)?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(token) if token == close => return Ok(items),
                _ => return Err(self.error(format!("expected ',' or {:?}", close))),
            }
        }
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    match token {
        Token::Question => Some((BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::PipePipe | Token::Or => Some((BP_OR, BP_OR + 1)),
        Token::AmpAmp | Token::And => Some((BP_AND, BP_AND + 1)),
        Token::EqEq | Token::BangEq => Some((BP_EQUALITY, BP_EQUALITY + 1)),
        Token::Gt | Token::Lt | Token::GtEq | Token::LtEq => Some((BP_COMPARISON, BP_COMPARISON + 1)),
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::SlashSlash | Token::Percent => {
            Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1))
        }
        _ => None,
    }
}
