use crate::token::{Token, TokenKind, is_name_char};

/// Tokenize raw template text. Lexing never fails: every input yields a token
/// stream of TEXT plus whatever constructs were recognized.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    lexer.lex();
    lexer.tokens
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    /// Byte offset where the pending token started.
    start: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            start: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len())
    }

    /// Close the pending run as a token of `kind`. Runs without any
    /// non-whitespace content are dropped.
    fn token(&mut self, kind: TokenKind) {
        let end = self.offset();
        let text = &self.source[self.start..end];
        if !text.trim().is_empty() {
            self.tokens.push(Token::new(kind, text, self.start..end));
        }
        self.start = end;
    }

    fn lex(&mut self) {
        while let Some(c) = self.peek(0) {
            if c != '#' {
                self.bump();
                continue;
            }

            self.token(TokenKind::Text);
            match self.peek(1) {
                Some('#') => self.lex_comment(),
                Some('{') => self.lex_code(),
                Some('(') => self.lex_directive(),
                _ => self.lex_name(),
            }
        }

        self.token(TokenKind::Text);
    }

    fn lex_comment(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
        self.token(TokenKind::Comment);
    }

    fn lex_code(&mut self) {
        // skip `#{`
        self.bump();
        self.bump();
        while let Some(c) = self.bump() {
            if c == '}' && self.peek(0) == Some('#') {
                self.bump();
                break;
            }
        }
        self.token(TokenKind::Code);
    }

    fn lex_directive(&mut self) {
        self.bump();
        self.bump();
        self.token(TokenKind::StartDirective);

        let mut depth = 1u32;
        while let Some(c) = self.bump() {
            match c {
                ')' if depth == 1 => break,
                ')' => {
                    depth -= 1;
                    self.token(TokenKind::CloseParen);
                }
                '(' => {
                    depth += 1;
                    self.token(TokenKind::OpenParen);
                }
                ',' => self.token(TokenKind::Comma),
                '$' => self.token(TokenKind::Dollar),
                c if is_name_char(c) => self.lex_ident(),
                _ => self.lex_other(),
            }
        }

        self.token(TokenKind::EndDirective);
    }

    fn lex_ident(&mut self) {
        while self.peek(0).is_some_and(is_name_char) {
            self.bump();
        }
        self.token(TokenKind::Ident);
    }

    fn lex_other(&mut self) {
        while let Some(c) = self.peek(0) {
            if is_name_char(c) || matches!(c, '(' | ')' | ',' | '$') {
                break;
            }
            self.bump();
        }
        self.token(TokenKind::Other);
    }

    fn lex_name(&mut self) {
        // skip `#`
        self.bump();
        while self.peek(0).is_some_and(is_name_char) {
            self.bump();
        }
        self.token(TokenKind::Name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(kinds("hello\nworld"), vec![(TokenKind::Text, "hello\nworld".into())]);
    }

    #[test]
    fn whitespace_only_runs_are_dropped() {
        assert!(tokenize("  \n\t ").is_empty());
        assert_eq!(
            kinds("#a\n  #b"),
            vec![(TokenKind::Name, "#a".into()), (TokenKind::Name, "#b".into())]
        );
    }

    #[test]
    fn comment_consumes_the_newline() {
        assert_eq!(
            kinds("## note\nrest"),
            vec![
                (TokenKind::Comment, "## note\n".into()),
                (TokenKind::Text, "rest".into()),
            ]
        );
    }

    #[test]
    fn code_runs_to_first_closer() {
        assert_eq!(
            kinds("#{ x = {1} }# tail"),
            vec![
                (TokenKind::Code, "#{ x = {1} }#".into()),
                (TokenKind::Text, " tail".into()),
            ]
        );
    }

    #[test]
    fn directive_tracks_paren_depth() {
        assert_eq!(
            kinds("#(for i in range(3))"),
            vec![
                (TokenKind::StartDirective, "#(".into()),
                (TokenKind::Ident, "for".into()),
                (TokenKind::Ident, "i".into()),
                (TokenKind::Ident, "in".into()),
                (TokenKind::Ident, "range".into()),
                (TokenKind::OpenParen, "(".into()),
                (TokenKind::Other, "3".into()),
                (TokenKind::CloseParen, ")".into()),
                (TokenKind::EndDirective, ")".into()),
            ]
        );
    }

    #[test]
    fn other_runs_keep_punctuation_verbatim() {
        assert_eq!(
            kinds("#(if x > 0)"),
            vec![
                (TokenKind::StartDirective, "#(".into()),
                (TokenKind::Ident, "if".into()),
                (TokenKind::Ident, "x".into()),
                (TokenKind::Other, " > 0".into()),
                (TokenKind::EndDirective, ")".into()),
            ]
        );
    }

    #[test]
    fn dollar_and_comma() {
        assert_eq!(
            kinds("#($ a, b)"),
            vec![
                (TokenKind::StartDirective, "#(".into()),
                (TokenKind::Dollar, "$".into()),
                (TokenKind::Ident, "a".into()),
                (TokenKind::Comma, ",".into()),
                (TokenKind::Ident, "b".into()),
                (TokenKind::EndDirective, ")".into()),
            ]
        );
    }

    #[test]
    fn unterminated_directive_has_no_end_token() {
        let tokens = tokenize("#(if x");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Ident));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = tokenize("é #x");
        assert_eq!(tokens[1].span, 3..5);
        assert_eq!(&"é #x"[tokens[1].span.clone()], "#x");
    }
}
