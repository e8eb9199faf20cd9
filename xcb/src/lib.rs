pub mod item;
pub mod parser;
pub mod token;

use std::fmt;

use crate::item::Item;
use crate::parser::ParseError;

/// A parsed and analyzed template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Top-level items with every block resolved into a nested body.
    pub items: Vec<Item>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
    /// The template text. Token spans index into it.
    pub source: String,
    /// Non-fatal structural problems found while parsing.
    pub diagnostics: Vec<ParseError>,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        item::write_items(f, &self.items, 0)
    }
}
