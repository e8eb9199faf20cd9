use tracing::trace;

use crate::item::{BlockKind, Directive, Item};
use crate::parser::error::ParseError;

/// Deepest block nesting the analyzer builds.
pub const MAX_NESTING: usize = 256;

/// Nest the flat item sequence: every `if`/`for`/`macro` directive takes the
/// items up to its matching `#(end <name>)` as its body. The terminator is
/// consumed. A block without a terminator absorbs the rest of the sequence.
///
/// An opener nested deeper than [`MAX_NESTING`] is reported and left as a
/// plain directive.
pub fn analyze(items: Vec<Item>, file_id: usize, diagnostics: &mut Vec<ParseError>) -> Vec<Item> {
    let mut items = items.into_iter();
    let mut output = Vec::new();

    while let Some(item) = items.next() {
        output.push(analyze_item(item, &mut items, 0, file_id, diagnostics));
    }

    output
}

fn analyze_item(
    item: Item,
    rest: &mut std::vec::IntoIter<Item>,
    depth: usize,
    file_id: usize,
    diagnostics: &mut Vec<ParseError>,
) -> Item {
    match item {
        Item::Directive(directive) => match BlockKind::from_name(&directive.name) {
            Some(_) if depth >= MAX_NESTING => {
                diagnostics.push(ParseError::warning(
                    format!("blocks nested deeper than {} levels", MAX_NESTING),
                    directive.span.clone(),
                    file_id,
                ));
                Item::Directive(directive)
            }
            Some(kind) => collect_block(kind, directive, rest, depth, file_id, diagnostics),
            None => Item::Directive(directive),
        },
        other => other,
    }
}

fn collect_block(
    kind: BlockKind,
    directive: Directive,
    rest: &mut std::vec::IntoIter<Item>,
    depth: usize,
    file_id: usize,
    diagnostics: &mut Vec<ParseError>,
) -> Item {
    let mut body = Vec::new();
    let mut terminated = false;

    while let Some(item) = rest.next() {
        if matches!(&item, Item::Directive(d) if d.ends(kind)) {
            terminated = true;
            break;
        }
        body.push(analyze_item(item, rest, depth + 1, file_id, diagnostics));
    }

    if !terminated {
        diagnostics.push(
            ParseError::warning(
                format!("unterminated '{}' block", kind.name()),
                directive.span.clone(),
                file_id,
            )
            .with_note(format!(
                "expected '#(end {})'; the block runs to the end of the input",
                kind.name()
            )),
        );
    }

    trace!(block = kind.name(), items = body.len(), "collected block");
    Item::Block {
        kind,
        directive,
        body,
    }
}
