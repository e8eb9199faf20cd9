use std::ops::Range;

/// The lexical category of a template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal template text outside any construct.
    Text,
    /// `## ...` through end of line.
    Comment,
    /// `#{ ... }#`, delimiters included.
    Code,
    /// `#(`
    StartDirective,
    /// The `)` closing a directive.
    EndDirective,
    /// Letters and underscores inside a directive.
    Ident,
    /// `#name` interpolation shorthand, `#` included.
    Name,
    OpenParen,
    CloseParen,
    Comma,
    Dollar,
    /// Any other run of directive characters, kept verbatim.
    Other,
}

/// A token produced by the lexer. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The raw source text of the token.
    pub text: String,
    /// Byte span in source for error reporting.
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Range<usize>) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Characters that may start or continue an identifier.
pub fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}
