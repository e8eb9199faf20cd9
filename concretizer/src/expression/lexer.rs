use crate::error::RuntimeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(i64),
    Float(f64),
    StringLit(String),
    True,
    False,
    None,

    Ident(String),

    // Keywords
    And,
    Or,
    Not,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash, // //
    Percent,
    Eq,       // =
    PlusEq,   // +=
    MinusEq,  // -=
    StarEq,   // *=
    EqEq,     // ==
    BangEq,   // !=
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,     // !
    Question, // ?
    Colon,    // :
    Comma,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,

    /// End of a statement: a newline or `;` outside any brackets.
    Separator,
}

/// Tokenize expression or statement source text.
pub fn tokenize(text: &str) -> Result<Vec<Token>, RuntimeError> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;
    // Bracket nesting; newlines inside brackets do not end a statement.
    let mut depth = 0usize;

    while i < len {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => {
                i += 1;
            }

            '\n' | ';' => {
                i += 1;
                if depth == 0 && tokens.last() != Some(&Token::Separator) {
                    tokens.push(Token::Separator);
                }
            }

            // Comment to end of line
            '#' => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
            }

            // String literal
            '"' | '\'' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(RuntimeError::Syntax("unterminated string literal".into())),
                        Some(&q) if q == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = chars.get(i + 1).copied().ok_or_else(|| {
                                RuntimeError::Syntax("unterminated string literal".into())
                            })?;
                            s.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                            i += 2;
                        }
                        Some(&other) => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::StringLit(s));
            }

            // Numbers
            '0'..='9' => {
                let start = i;
                while i < len && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let is_float = i + 1 < len && chars[i] == '.' && chars[i + 1].is_ascii_digit();
                if is_float {
                    i += 1;
                    while i < len && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let num_str: String = chars[start..i].iter().collect();
                if is_float {
                    let n = num_str
                        .parse::<f64>()
                        .map_err(|e| RuntimeError::Syntax(format!("bad number '{}': {}", num_str, e)))?;
                    tokens.push(Token::Float(n));
                } else {
                    let n = num_str.parse::<i64>().map_err(|_| RuntimeError::Overflow)?;
                    tokens.push(Token::Integer(n));
                }
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(match ident.as_str() {
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    "none" | "None" => Token::None,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(ident),
                });
            }

            _ => {
                let next = chars.get(i + 1).copied();
                let (token, width) = match (c, next) {
                    ('=', Some('=')) => (Token::EqEq, 2),
                    ('!', Some('=')) => (Token::BangEq, 2),
                    ('>', Some('=')) => (Token::GtEq, 2),
                    ('<', Some('=')) => (Token::LtEq, 2),
                    ('+', Some('=')) => (Token::PlusEq, 2),
                    ('-', Some('=')) => (Token::MinusEq, 2),
                    ('*', Some('=')) => (Token::StarEq, 2),
                    ('/', Some('/')) => (Token::SlashSlash, 2),
                    ('&', Some('&')) => (Token::AmpAmp, 2),
                    ('|', Some('|')) => (Token::PipePipe, 2),
                    ('=', _) => (Token::Eq, 1),
                    ('!', _) => (Token::Bang, 1),
                    ('>', _) => (Token::Gt, 1),
                    ('<', _) => (Token::Lt, 1),
                    ('+', _) => (Token::Plus, 1),
                    ('-', _) => (Token::Minus, 1),
                    ('*', _) => (Token::Star, 1),
                    ('/', _) => (Token::Slash, 1),
                    ('%', _) => (Token::Percent, 1),
                    ('?', _) => (Token::Question, 1),
                    (':', _) => (Token::Colon, 1),
                    (',', _) => (Token::Comma, 1),
                    ('(', _) => (Token::LParen, 1),
                    (')', _) => (Token::RParen, 1),
                    ('[', _) => (Token::LBracket, 1),
                    (']', _) => (Token::RBracket, 1),
                    _ => return Err(RuntimeError::Syntax(format!("unexpected character '{}'", c))),
                };
                match token {
                    Token::LParen | Token::LBracket => depth += 1,
                    Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                    _ => {}
                }
                tokens.push(token);
                i += width;
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_and_literals() {
        assert_eq!(
            tokenize("x >= 1.5 // 'a\\'b'").unwrap(),
            vec![
                Token::Ident("x".into()),
                Token::GtEq,
                Token::Float(1.5),
                Token::SlashSlash,
                Token::StringLit("a'b".into()),
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_do_not_separate() {
        assert_eq!(
            tokenize("f(1,\n2)\ny").unwrap(),
            vec![
                Token::Ident("f".into()),
                Token::LParen,
                Token::Integer(1),
                Token::Comma,
                Token::Integer(2),
                Token::RParen,
                Token::Separator,
                Token::Ident("y".into()),
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            tokenize("x = 1 # set x\n").unwrap(),
            vec![
                Token::Ident("x".into()),
                Token::Eq,
                Token::Integer(1),
                Token::Separator,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(tokenize("\"abc"), Err(RuntimeError::Syntax(_))));
    }
}
