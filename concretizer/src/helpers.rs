use xcb::token::{Token, TokenKind};

/// Normalize indentation of embedded code: tabs become four spaces and the
/// common leading spaces of all non-blank lines are stripped from every line.
pub fn dedent(text: &str) -> String {
    let text = text.replace('\t', "    ");
    let indent = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(leading_spaces)
        .min()
        .unwrap_or(0);

    text.split('\n')
        .map(|line| &line[leading_spaces(line).min(indent)..])
        .collect::<Vec<_>>()
        .join("\n")
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// The template text covered by directive argument tokens, exactly as written
/// (string literals keep their inner whitespace).
pub fn args_text<'a>(source: &str, tokens: impl IntoIterator<Item = &'a Token>) -> String {
    let tokens: Vec<&Token> = tokens.into_iter().collect();
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return String::new();
    };
    match source.get(first.span.start..last.span.end) {
        Some(text) => text.trim().to_string(),
        None => join_args(tokens),
    }
}

/// Concatenate the raw text of the tokens, for spans that do not index into
/// the source. The lexer drops the whitespace between two identifiers, so a
/// single space is put back there (`i in range(3)` rather than `iinrange(3)`).
fn join_args<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> String {
    let mut joined = String::new();
    let mut previous: Option<TokenKind> = None;
    for token in tokens {
        if previous == Some(TokenKind::Ident) && token.is(TokenKind::Ident) {
            joined.push(' ');
        }
        joined.push_str(&token.text);
        previous = Some(token.kind);
    }
    joined
}

/// Split the argument tokens of a macro call, `(a, f(b, c), "x, y")`, into the
/// raw text of each argument. Commas only split at the top level: parentheses,
/// brackets, braces and string literals are tracked. A bare `#(name)` call has
/// no arguments.
pub fn split_call_args(source: &str, tokens: &[Token]) -> Result<Vec<String>, String> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(Vec::new());
    };
    if !first.is(TokenKind::OpenParen) {
        return Err(format!("expected '(' after macro name, found '{}'", first.text));
    }

    let mut args: Vec<Vec<&Token>> = Vec::new();
    let mut current: Vec<&Token> = Vec::new();
    let mut scan = NestingScan::default();
    let mut closed_at = None;

    for (index, token) in rest.iter().enumerate() {
        if scan.in_string() || token.is(TokenKind::Other) {
            scan.feed(&token.text);
            current.push(token);
            continue;
        }
        match token.kind {
            TokenKind::OpenParen => {
                scan.depth += 1;
                current.push(token);
            }
            TokenKind::CloseParen if scan.depth == 0 => {
                closed_at = Some(index);
                break;
            }
            TokenKind::CloseParen => {
                scan.depth -= 1;
                current.push(token);
            }
            TokenKind::Comma if scan.depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(token),
        }
    }

    let Some(closed_at) = closed_at else {
        return Err("missing ')' in macro call".to_string());
    };
    if let Some(extra) = rest.get(closed_at + 1) {
        return Err(format!("unexpected '{}' after macro call arguments", extra.text));
    }

    // `()` is a call with no arguments.
    if !(args.is_empty() && current.is_empty()) {
        args.push(current);
    }

    Ok(args
        .into_iter()
        .map(|arg| args_text(source, arg))
        .collect())
}

/// Parse the parameter list of a macro definition: nothing at all, or
/// `(a, b, ...)` with one identifier per parameter.
pub fn parse_params(tokens: &[Token]) -> Result<Vec<String>, String> {
    let Some((first, rest)) = tokens.split_first() else {
        return Ok(Vec::new());
    };
    if !first.is(TokenKind::OpenParen) {
        return Err(format!("expected '(' before macro parameters, found '{}'", first.text));
    }

    let mut params = Vec::new();
    let mut expect_name = true;
    for (index, token) in rest.iter().enumerate() {
        match token.kind {
            TokenKind::CloseParen if expect_name && !params.is_empty() => {
                return Err("expected parameter name after ','".to_string());
            }
            TokenKind::CloseParen => {
                return match rest.get(index + 1) {
                    Some(extra) => Err(format!(
                        "unexpected '{}' after macro parameters",
                        extra.text
                    )),
                    None => Ok(params),
                };
            }
            TokenKind::Ident if expect_name => {
                params.push(token.text.clone());
                expect_name = false;
            }
            TokenKind::Comma if !expect_name => expect_name = true,
            _ => return Err(format!("invalid macro parameter '{}'", token.text.trim())),
        }
    }

    Err("missing ')' after macro parameters".to_string())
}

/// Bracket and string-literal state while scanning raw argument text.
#[derive(Default)]
struct NestingScan {
    depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl NestingScan {
    fn in_string(&self) -> bool {
        self.quote.is_some()
    }

    fn feed(&mut self, text: &str) {
        for c in text.chars() {
            match self.quote {
                Some(_) if self.escaped => self.escaped = false,
                Some(_) if c == '\\' => self.escaped = true,
                Some(q) if c == q => self.quote = None,
                Some(_) => {}
                None => match c {
                    '"' | '\'' => self.quote = Some(c),
                    '[' | '{' => self.depth += 1,
                    ']' | '}' => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xcb::parser::lexer::tokenize;

    /// Argument tokens of the first directive in `source`.
    fn directive_args(source: &str) -> Vec<Token> {
        tokenize(source)
            .into_iter()
            .skip_while(|t| !t.is(TokenKind::StartDirective))
            .skip(2)
            .take_while(|t| !t.is(TokenKind::EndDirective))
            .collect()
    }

    fn call_args(source: &str) -> Result<Vec<String>, String> {
        split_call_args(source, &directive_args(source))
    }

    #[test]
    fn dedent_strips_common_indentation() {
        assert_eq!(dedent("    a\n      b\n    c"), "a\n  b\nc");
        assert_eq!(dedent("\tx = 1\n\n\ty = 2"), "x = 1\n\ny = 2");
        assert_eq!(dedent("x\n  y"), "x\n  y");
        assert_eq!(dedent("   "), "   ");
    }

    #[test]
    fn argument_text_is_sliced_from_the_source() {
        let source = "#(for i  in range(3))";
        assert_eq!(args_text(source, &directive_args(source)), "i  in range(3)");
        let source = "#($ \"Hello,  world\" )";
        assert_eq!(args_text(source, &directive_args(source)), "\"Hello,  world\"");
        assert_eq!(args_text(source, &Vec::<Token>::new()), "");
    }

    #[test]
    fn identifiers_are_rejoined_when_spans_do_not_match() {
        let args = directive_args("#(for i in range(3))");
        assert_eq!(args_text("", &args), "i in range(3)");
    }

    #[test]
    fn call_args_split_on_top_level_commas() {
        assert_eq!(
            call_args("#(greet(\"Bob\", max(1, 2), [3, 4]))").unwrap(),
            vec!["\"Bob\"", "max(1, 2)", "[3, 4]"]
        );
    }

    #[test]
    fn commas_inside_strings_do_not_split() {
        assert_eq!(
            call_args("#(greet(\"a,  b\", 'c'))").unwrap(),
            vec!["\"a,  b\"", "'c'"]
        );
    }

    #[test]
    fn empty_parens_mean_no_arguments() {
        assert!(call_args("#(greet())").unwrap().is_empty());
        assert!(call_args("#(greet)").unwrap().is_empty());
    }

    #[test]
    fn malformed_calls_are_reported() {
        assert!(call_args("#(greet \"Bob\")").is_err());
        assert!(call_args("#(greet(1, 2)x)").is_err());
        assert!(call_args("#(greet(1, 2").is_err());
    }

    #[test]
    fn macro_parameters() {
        assert_eq!(
            parse_params(&directive_args("#(macro greet(name, greeting))")[1..]).unwrap(),
            vec!["name", "greeting"]
        );
        assert!(parse_params(&directive_args("#(macro banner)")[1..]).unwrap().is_empty());
        assert!(parse_params(&directive_args("#(macro m())")[1..]).unwrap().is_empty());
    }

    #[test]
    fn malformed_parameters_are_reported() {
        assert!(parse_params(&directive_args("#(macro m(a b))")[1..]).is_err());
        assert!(parse_params(&directive_args("#(macro m(a, 1))")[1..]).is_err());
        assert!(parse_params(&directive_args("#(macro m(a,))")[1..]).is_err());
        assert!(parse_params(&directive_args("#(macro m(a, b")[1..]).is_err());
    }
}
