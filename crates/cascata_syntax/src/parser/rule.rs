use cascata_shared::byte_stream::{ByteStream, Location};

use crate::ast::{ErrorKind, Node, NodeType};
use crate::parser::IntoComponentValues;
use crate::tokenizer::Tokenizer;

/// Parses a non-top-level rule list: qualified rules and at-rules. `<!--`
/// and `-->` have no meaning here and are replaced by error nodes.
pub fn parse_rule_list(
    input: impl IntoComponentValues,
    skip_comments: bool,
    skip_whitespace: bool,
) -> Vec<Node> {
    log::trace!("parse_rule_list");

    parse_rules(input, skip_comments, skip_whitespace, false)
}

/// Parses a top-level stylesheet. `<!--` and `-->` between the rules are
/// skipped, for compatibility with stylesheets written in HTML comments.
pub fn parse_stylesheet(
    input: impl IntoComponentValues,
    skip_comments: bool,
    skip_whitespace: bool,
) -> Vec<Node> {
    log::trace!("parse_stylesheet");

    parse_rules(input, skip_comments, skip_whitespace, true)
}

/// Decodes the given bytes with the CSS encoding selection algorithm, then
/// parses the text as a top-level stylesheet.
pub fn parse_stylesheet_bytes(
    bytes: &[u8],
    protocol_encoding: Option<&str>,
    environment_encoding: Option<&str>,
    skip_comments: bool,
    skip_whitespace: bool,
) -> Vec<Node> {
    log::trace!("parse_stylesheet_bytes");

    let mut stream = ByteStream::new();
    stream.read_from_bytes(bytes, protocol_encoding, environment_encoding);

    let tokens = Tokenizer::new(&mut stream, Location::default()).tokenize();
    parse_stylesheet(tokens, skip_comments, skip_whitespace)
}

fn parse_rules(
    input: impl IntoComponentValues,
    skip_comments: bool,
    skip_whitespace: bool,
    top_level: bool,
) -> Vec<Node> {
    let mut iter = input.into_component_values().into_iter();
    let mut result = Vec::new();

    while let Some(node) = iter.next() {
        if node.is_whitespace() {
            if !skip_whitespace {
                result.push(node);
            }
            continue;
        }
        if node.is_comment() {
            if !skip_comments {
                result.push(node);
            }
            continue;
        }
        if node.is_literal("<!--") || node.is_literal("-->") {
            if !top_level {
                result.push(Node::new_error(
                    ErrorKind::Invalid,
                    "CDO/CDC tokens are not allowed in rule lists",
                    node.location,
                ));
            }
            continue;
        }

        result.push(consume_rule(node, &mut iter));
    }

    result
}

/// Consumes one rule starting at the given component value: an at-rule when
/// it is an at-keyword, a qualified rule otherwise.
pub(crate) fn consume_rule(first: Node, iter: &mut impl Iterator<Item = Node>) -> Node {
    if first.is_at_keyword() {
        return consume_at_rule(first, iter);
    }

    let location = first.location.clone();
    let mut prelude = Vec::new();

    // a rule may start directly with its block, leaving the prelude empty
    match *first.node_type {
        NodeType::CurlyBlock { content } => {
            return Node::new(NodeType::QualifiedRule { prelude, content }, location);
        }
        other => prelude.push(Node::new(other, first.location)),
    }

    for node in iter.by_ref() {
        let node_location = node.location;
        match *node.node_type {
            NodeType::CurlyBlock { content } => {
                return Node::new(NodeType::QualifiedRule { prelude, content }, location);
            }
            other => prelude.push(Node::new(other, node_location)),
        }
    }

    // the error points at the last thing seen before the input ran out
    let error_location = prelude
        .last()
        .map_or(location, |node| node.location.clone());
    Node::new_error(
        ErrorKind::Invalid,
        "EOF reached before {} block for a qualified rule",
        error_location,
    )
}

/// Consumes an at-rule: its prelude runs to either a `;` (no content) or a
/// `{}` block (whose content becomes the rule's content). Running out of
/// input before either terminator invalidates the rule.
pub(crate) fn consume_at_rule(at_keyword: Node, iter: &mut impl Iterator<Item = Node>) -> Node {
    let location = at_keyword.location.clone();
    let name = match *at_keyword.node_type {
        NodeType::AtKeyword { value, .. } => value,
        // callers only hand us at-keyword nodes
        other => return Node::new(other, location),
    };

    let mut prelude = Vec::new();

    for node in iter.by_ref() {
        let node_location = node.location;
        match *node.node_type {
            NodeType::Literal { value } if value == ";" => {
                return Node::new_at_rule(name, prelude, None, location);
            }
            NodeType::CurlyBlock { content } => {
                return Node::new_at_rule(name, prelude, Some(content), location);
            }
            other => prelude.push(Node::new(other, node_location)),
        }
    }

    let error_location = prelude
        .last()
        .map_or(location, |node| node.location.clone());
    Node::new_error(
        ErrorKind::Invalid,
        "EOF reached before the end of an at-rule",
        error_location,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn qualified_parts(node: &Node) -> (&[Node], &[Node]) {
        node.as_qualified_rule().unwrap()
    }

    #[test]
    fn parse_style_rule() {
        let rules = parse_stylesheet(".a { color: red }", true, true);

        assert_eq!(rules.len(), 1);
        let (prelude, content) = qualified_parts(&rules[0]);

        assert!(prelude[0].is_literal("."));
        assert!(prelude[1].is_ident());
        assert!(prelude[2].is_whitespace());
        assert_eq!(prelude.len(), 3);

        // the block content is kept as raw component values
        assert_eq!(content.len(), 6);
        assert!(content[1].is_ident());
        assert!(content[2].is_literal(":"));
    }

    #[test]
    fn parse_rule_starting_with_block() {
        let rules = parse_rule_list("{ a: b }", true, true);

        let (prelude, content) = qualified_parts(&rules[0]);
        assert!(prelude.is_empty());
        assert_eq!(content.len(), 6);
    }

    #[test]
    fn parse_at_rule_with_block() {
        let rules = parse_stylesheet("@media print { a {} }", true, true);

        assert_eq!(rules.len(), 1);
        match &*rules[0].node_type {
            NodeType::AtRule {
                at_keyword,
                lower_at_keyword,
                prelude,
                content,
            } => {
                assert_eq!(at_keyword, "media");
                assert_eq!(lower_at_keyword, "media");
                assert!(prelude[1].is_ident());
                assert!(content.is_some());
            }
            other => unreachable!("expected an at-rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_at_rule_without_block() {
        let rules = parse_stylesheet("@import \"a.css\";", true, true);

        let (keyword, prelude, content) = rules[0].as_at_rule().unwrap();
        assert_eq!(keyword, "import");
        assert_eq!(prelude.len(), 2);
        assert!(content.is_none());
    }

    #[test]
    fn eof_in_rule_preludes_is_invalid() {
        let rules = parse_stylesheet(".a color: red", true, true);
        assert!(rules[0].is_error_kind(ErrorKind::Invalid));

        let rules = parse_stylesheet("@media print", true, true);
        assert!(rules[0].is_error_kind(ErrorKind::Invalid));
    }

    #[test]
    fn cdo_cdc_skipped_at_the_top_level() {
        let rules = parse_stylesheet("<!-- .a {} -->", true, true);

        assert_eq!(rules.len(), 1);
        assert!(rules[0].is_qualified_rule());
    }

    #[test]
    fn cdo_cdc_are_errors_in_rule_lists() {
        let rules = parse_rule_list("<!-- .a {} -->", true, true);

        assert_eq!(rules.len(), 3);
        assert!(rules[0].is_error_kind(ErrorKind::Invalid));
        assert!(rules[1].is_qualified_rule());
        assert!(rules[2].is_error_kind(ErrorKind::Invalid));
    }

    #[test]
    fn rules_keep_their_order_and_whitespace() {
        let rules = parse_stylesheet("a {} /* x */ b {}", false, false);

        assert!(rules[0].is_qualified_rule());
        assert!(rules[1].is_whitespace());
        assert!(rules[2].is_comment());
        assert!(rules[3].is_whitespace());
        assert!(rules[4].is_qualified_rule());
    }
}
