use std::fmt;
use std::ops::Range;

use crate::token::Token;

/// Directive names that open a block terminated by `#(end <name>)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    For,
    Macro,
}

impl BlockKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(BlockKind::If),
            "for" => Some(BlockKind::For),
            "macro" => Some(BlockKind::Macro),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::For => "for",
            BlockKind::Macro => "macro",
        }
    }
}

/// A `#( ... )` construct: its name and the raw argument tokens that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// An identifier (`if`, `end`, a macro name, ...) or `$`.
    pub name: String,
    /// Argument tokens, captured verbatim with their original kinds.
    pub args: Vec<Token>,
    /// Byte span of the whole directive.
    pub span: Range<usize>,
}

impl Directive {
    /// True if this directive is `#(end <kind>)`.
    pub fn ends(&self, kind: BlockKind) -> bool {
        self.name == "end"
            && self
                .args
                .first()
                .is_some_and(|arg| arg.text == kind.name())
    }
}

/// A single unit of a template, flat after parsing and nested after analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Literal output.
    Text { value: String, span: Range<usize> },
    /// `#name`: an expression to evaluate and print.
    Interpolation { expr: String, span: Range<usize> },
    /// `#{ ... }#`: statements executed for their side effects.
    CodeBlock { body: String, span: Range<usize> },
    /// A non-block directive or macro invocation.
    Directive(Directive),
    /// A block directive owning the items up to its matching `end`.
    Block {
        kind: BlockKind,
        directive: Directive,
        body: Vec<Item>,
    },
}

impl Item {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Item::Text { span, .. } => span,
            Item::Interpolation { span, .. } => span,
            Item::CodeBlock { span, .. } => span,
            Item::Directive(directive) => &directive.span,
            Item::Block { directive, .. } => &directive.span,
        }
    }
}

/// Writes the indented debug tree of a sequence of items.
pub(crate) fn write_items(f: &mut fmt::Formatter<'_>, items: &[Item], indent: usize) -> fmt::Result {
    for item in items {
        write_item(f, item, indent)?;
    }
    Ok(())
}

fn write_item(f: &mut fmt::Formatter<'_>, item: &Item, indent: usize) -> fmt::Result {
    let pad = " ".repeat(indent);
    match item {
        Item::Text { value, .. } => writeln!(f, "{}text '{}'", pad, value),
        Item::Interpolation { expr, .. } => writeln!(f, "{}name {}", pad, expr),
        Item::CodeBlock { body, .. } => writeln!(f, "{}code {}", pad, body),
        Item::Block { kind, body, .. } => {
            writeln!(f, "{}block {}", pad, kind.name())?;
            write_items(f, body, indent + 4)?;
            writeln!(f, "{}end {}", pad, kind.name())
        }
        Item::Directive(directive) => {
            writeln!(f, "{}directive {}", pad, directive.name)?;
            for arg in &directive.args {
                writeln!(f, "{}{}", pad, arg.text)?;
            }
            Ok(())
        }
    }
}
