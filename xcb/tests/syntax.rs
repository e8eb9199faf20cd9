use pretty_assertions::assert_eq;

use xcb::Template;
use xcb::item::{BlockKind, Item};
use xcb::parser::Parser;
use xcb::parser::analyzer::MAX_NESTING;
use xcb::token::TokenKind;

fn parse(source: &str) -> Template {
    Parser::new(source.to_string(), 0).parse()
}

fn dump(source: &str) -> String {
    parse(source).to_string()
}

#[test]
fn text_code_and_interpolation() {
    let template = parse("Hello #{ x = 1 }# #name!");
    assert!(template.diagnostics.is_empty());
    match template.items.as_slice() {
        [
            Item::Text { value: hello, .. },
            Item::CodeBlock { body, .. },
            Item::Interpolation { expr, .. },
            Item::Text { value: bang, .. },
        ] => {
            assert_eq!(hello, "Hello ");
            assert_eq!(body, " x = 1 ");
            assert_eq!(expr, "name");
            assert_eq!(bang, "!");
        }
        other => panic!("unexpected items: {:?}", other),
    }
}

#[test]
fn comments_are_discarded() {
    let template = parse("## header comment\nbody");
    assert!(template.diagnostics.is_empty());
    assert_eq!(template.items.len(), 1);
    assert_eq!(dump("## header comment\nbody"), "text 'body'\n");
}

#[test]
fn directive_arguments_keep_their_kinds() {
    let template = parse("#(greet(\"Bob\", 2))");
    let Item::Directive(directive) = &template.items[0] else {
        panic!("expected directive");
    };
    assert_eq!(directive.name, "greet");
    let kinds: Vec<TokenKind> = directive.args.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::OpenParen,
            TokenKind::Other,
            TokenKind::Ident,
            TokenKind::Other,
            TokenKind::Comma,
            TokenKind::Other,
            TokenKind::CloseParen,
        ]
    );
    assert_eq!(directive.span, 0..18);
}

#[test]
fn inline_eval_directive_is_named_dollar() {
    let template = parse("#($ 1 + 2)#($)");
    let names: Vec<(&str, usize)> = template
        .items
        .iter()
        .map(|item| match item {
            Item::Directive(d) => (d.name.as_str(), d.args.len()),
            other => panic!("unexpected item: {:?}", other),
        })
        .collect();
    assert_eq!(names, vec![("$", 1), ("$", 0)]);
}

#[test]
fn blocks_nest_and_consume_their_terminator() {
    let source = "#(for i in xs)#(if i)#i#(end if)#(end for)after";
    assert_eq!(
        dump(source),
        "block for\n    block if\n        name i\n    end if\nend for\ntext 'after'\n"
    );
}

#[test]
fn same_name_blocks_nest() {
    let template = parse("#(if a)#(if b)x#(end if)y#(end if)z");
    assert!(template.diagnostics.is_empty());
    let Item::Block { kind, body, .. } = &template.items[0] else {
        panic!("expected block");
    };
    assert_eq!(*kind, BlockKind::If);
    assert_eq!(body.len(), 2);
    assert!(matches!(&body[0], Item::Block { kind: BlockKind::If, body, .. } if body.len() == 1));
    assert!(matches!(&template.items[1], Item::Text { value, .. } if value == "z"));
}

#[test]
fn mismatched_end_stays_in_the_body() {
    let template = parse("#(for i in xs)#(end if)#(end for)");
    let Item::Block { body, .. } = &template.items[0] else {
        panic!("expected block");
    };
    assert!(matches!(&body[0], Item::Directive(d) if d.name == "end"));
}

#[test]
fn unterminated_block_absorbs_the_rest() {
    let template = parse("#(if x)a#b");
    assert_eq!(template.items.len(), 1);
    let Item::Block { body, .. } = &template.items[0] else {
        panic!("expected block");
    };
    assert_eq!(body.len(), 2);
    assert_eq!(template.diagnostics.len(), 1);
    assert!(template.diagnostics[0].message.contains("unterminated 'if' block"));
}

#[test]
fn block_nesting_is_bounded() {
    let depth = MAX_NESTING + 44;
    let source = format!("{}x{}", "#(if 1)".repeat(depth), "#(end if)".repeat(depth));
    let template = parse(&source);

    // openers past the limit stay flat, so their `end`s are left over at the top
    assert_eq!(template.diagnostics.len(), 44);
    assert_eq!(
        template.diagnostics[0].message,
        format!("blocks nested deeper than {} levels", MAX_NESTING)
    );
    assert_eq!(template.items.len(), 45);
    assert!(matches!(template.items[0], Item::Block { kind: BlockKind::If, .. }));
}

#[test]
fn template_keeps_its_source() {
    assert_eq!(parse("#(if  a)x#(end if)").source, "#(if  a)x#(end if)");
}

#[test]
fn empty_directive_is_skipped_with_a_warning() {
    let template = parse("a#()b");
    assert_eq!(template.items.len(), 2);
    assert_eq!(template.diagnostics.len(), 1);
    assert_eq!(template.diagnostics[0].message, "empty directive");
}

#[test]
fn unclosed_directive_is_reported() {
    let template = parse("#(greet(1)");
    assert_eq!(template.items.len(), 1);
    assert!(template.diagnostics[0].message.contains("not closed"));
}

#[test]
fn whitespace_between_constructs_disappears() {
    assert_eq!(dump("#a\n\n   #b\n"), "name a\nname b\n");
    assert!(parse(" \n\t\n").items.is_empty());
}

#[test]
fn directive_dump_lists_arguments() {
    assert_eq!(dump("#(greet(1))"), "directive greet\n(\n1\n)\n");
}
