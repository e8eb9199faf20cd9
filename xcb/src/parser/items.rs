use crate::item::{Directive, Item};
use crate::parser::error::ParseError;
use crate::token::{Token, TokenKind};

/// Convert a token stream into a flat item sequence. Directive arguments are
/// captured verbatim, not interpreted.
pub fn parse_items(tokens: Vec<Token>, file_id: usize, diagnostics: &mut Vec<ParseError>) -> Vec<Item> {
    let mut tokens = tokens.into_iter();
    let mut items = Vec::new();

    while let Some(token) = tokens.next() {
        match token.kind {
            TokenKind::Text => items.push(Item::Text {
                value: token.text,
                span: token.span,
            }),
            TokenKind::Code => items.push(Item::CodeBlock {
                body: strip_code_delimiters(&token.text).to_string(),
                span: token.span,
            }),
            TokenKind::Name => items.push(Item::Interpolation {
                expr: token.text[1..].to_string(),
                span: token.span,
            }),
            TokenKind::StartDirective => {
                if let Some(directive) = parse_directive(token, &mut tokens, file_id, diagnostics) {
                    items.push(Item::Directive(directive));
                }
            }
            TokenKind::Comment => {}
            _ => diagnostics.push(ParseError::warning(
                format!("unexpected token: {}", token.text),
                token.span,
                file_id,
            )),
        }
    }

    items
}

fn strip_code_delimiters(text: &str) -> &str {
    let body = text.strip_prefix("#{").unwrap_or(text);
    body.strip_suffix("}#").unwrap_or(body)
}

fn parse_directive(
    start: Token,
    tokens: &mut std::vec::IntoIter<Token>,
    file_id: usize,
    diagnostics: &mut Vec<ParseError>,
) -> Option<Directive> {
    let name = match tokens.next() {
        Some(token) if token.kind == TokenKind::EndDirective => {
            diagnostics.push(ParseError::warning(
                "empty directive",
                start.span.start..token.span.end,
                file_id,
            ));
            return None;
        }
        Some(token) => token,
        None => {
            diagnostics.push(ParseError::warning("empty directive", start.span, file_id));
            return None;
        }
    };

    let mut end = name.span.end;
    let mut args = Vec::new();
    let mut closed = false;

    for token in tokens.by_ref() {
        end = token.span.end;
        if token.kind == TokenKind::EndDirective {
            closed = true;
            break;
        }
        args.push(token);
    }

    let span = start.span.start..end;
    if !closed {
        diagnostics.push(
            ParseError::warning(
                format!("directive '{}' is not closed", name.text),
                span.clone(),
                file_id,
            )
            .with_note("expected ')' before end of input"),
        );
    }

    Some(Directive {
        name: name.text,
        args,
        span,
    })
}
