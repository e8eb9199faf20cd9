pub mod analyzer;
pub mod error;
pub mod items;
pub mod lexer;

pub use error::ParseError;

use tracing::debug;

use crate::Template;
use crate::token::Token;

/// Parser entry point: lexer, flat item parser and block analyzer in sequence.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// The raw token stream, including comments.
    pub fn tokenize(&self) -> Vec<Token> {
        lexer::tokenize(&self.source)
    }

    /// Parse the source into an analyzed Template. Never fails; structural
    /// problems are collected in `Template::diagnostics`.
    pub fn parse(&self) -> Template {
        let mut diagnostics = Vec::new();
        let tokens = self.tokenize();
        let items = items::parse_items(tokens, self.file_id, &mut diagnostics);
        let items = analyzer::analyze(items, self.file_id, &mut diagnostics);
        debug!(
            items = items.len(),
            diagnostics = diagnostics.len(),
            "parsed template"
        );
        Template {
            items,
            source_id: self.file_id,
            source: self.source.clone(),
            diagnostics,
        }
    }
}
