use cascata_shared::byte_stream::Location;

use crate::ast::{ErrorKind, Node, NodeType};
use crate::parser::rule::consume_at_rule;
use crate::parser::{next_significant, IntoComponentValues};

/// Parses a single `name: value [!important]` declaration covering the whole
/// input. Leading whitespace and comments are skipped; anything that does not
/// fit the declaration grammar yields an error node.
pub fn parse_one_declaration(input: impl IntoComponentValues) -> Node {
    log::trace!("parse_one_declaration");

    let mut iter = input.into_component_values().into_iter();

    let Some(first) = next_significant(&mut iter) else {
        return Node::new_error(ErrorKind::Empty, "input is empty", Location::default());
    };

    parse_declaration(first, &mut iter)
}

/// Parses a `;`-separated list of declarations and at-rules. A malformed
/// declaration is replaced by an error node and parsing continues with the
/// rest of the list. Whitespace and comments between the items are kept
/// unless the corresponding flag skips them.
pub fn parse_declaration_list(
    input: impl IntoComponentValues,
    skip_comments: bool,
    skip_whitespace: bool,
) -> Vec<Node> {
    log::trace!("parse_declaration_list");

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
        if node.is_literal(";") {
            continue;
        }
        if node.is_at_keyword() {
            result.push(consume_at_rule(node, &mut iter));
            continue;
        }

        // everything up to the separating `;` belongs to this declaration
        let mut declaration_nodes = Vec::new();
        for node in iter.by_ref() {
            if node.is_literal(";") {
                break;
            }
            declaration_nodes.push(node);
        }
        result.push(parse_declaration(node, &mut declaration_nodes.into_iter()));
    }

    result
}

/// Parses one declaration from its first significant component value and the
/// values that follow it.
pub(crate) fn parse_declaration(first: Node, iter: &mut impl Iterator<Item = Node>) -> Node {
    let location = first.location.clone();

    let name = match first.as_ident() {
        Some(value) => value.to_string(),
        None => {
            return Node::new_error(
                ErrorKind::Invalid,
                &format!(
                    "expected <ident> for declaration name, got {}",
                    first.type_name()
                ),
                first.location,
            );
        }
    };

    match next_significant(iter) {
        Some(node) if node.is_literal(":") => {}
        Some(node) => {
            return Node::new_error(
                ErrorKind::Invalid,
                &format!("expected ':' after declaration name, got {}", node.type_name()),
                node.location,
            );
        }
        None => {
            return Node::new_error(
                ErrorKind::Invalid,
                "expected ':' after declaration name, got EOF",
                location,
            );
        }
    }

    let mut value: Vec<Node> = iter.collect();
    let mut important = false;

    // `!important` counts only when nothing but whitespace and comments
    // follows it; scan from the right
    let mut bang = None;
    {
        let mut significant = value
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, node)| !node.is_whitespace() && !node.is_comment());

        if let Some((_, node)) = significant.next() {
            let is_important = matches!(
                &*node.node_type,
                NodeType::Ident { lower_value, .. } if lower_value == "important"
            );
            if is_important {
                if let Some((index, node)) = significant.next() {
                    if node.is_literal("!") {
                        bang = Some(index);
                    }
                }
            }
        }
    }
    if let Some(index) = bang {
        value.truncate(index);
        important = true;
    }

    while value.last().is_some_and(Node::is_whitespace) {
        value.pop();
    }

    Node::new_declaration(name, value, important, location)
}

#[cfg(test)]
mod test {
    use super::*;

    fn declaration_parts(node: &Node) -> (&str, &[Node], bool) {
        node.as_declaration().unwrap()
    }

    #[test]
    fn parse_simple_declaration() {
        let decl = parse_one_declaration("color: red");
        let (name, value, important) = declaration_parts(&decl);

        assert_eq!(name, "color");
        assert_eq!(value.len(), 2);
        assert!(value[0].is_whitespace());
        assert!(value[1].is_ident());
        assert!(!important);
    }

    #[test]
    fn parse_important() {
        let decl = parse_one_declaration("color: red ! ImPorTant ");
        let (_, value, important) = declaration_parts(&decl);

        assert!(important);
        // the marker and the trailing whitespace are stripped
        assert_eq!(value.len(), 2);
        assert!(value[1].is_ident());
    }

    #[test]
    fn important_must_be_last() {
        let decl = parse_one_declaration("color: red !important blue");
        let (_, value, important) = declaration_parts(&decl);

        assert!(!important);
        assert_eq!(value.len(), 7);
    }

    #[test]
    fn ident_named_important_alone_is_a_value() {
        let decl = parse_one_declaration("a: important");
        let (_, value, important) = declaration_parts(&decl);

        assert!(!important);
        assert_eq!(value.len(), 2);
    }

    #[test]
    fn custom_properties_keep_their_case() {
        let decl = parse_one_declaration("--Foo: bar");

        match &*decl.node_type {
            NodeType::Declaration { name, lower_name, .. } => {
                assert_eq!(name, "--Foo");
                assert_eq!(lower_name, "--foo");
            }
            other => unreachable!("expected a declaration, got {other:?}"),
        }
    }

    #[test]
    fn empty_value_is_allowed() {
        let decl = parse_one_declaration("--x:");
        let (_, value, _) = declaration_parts(&decl);

        assert!(value.is_empty());
    }

    #[test]
    fn declaration_errors() {
        assert!(parse_one_declaration("  ").is_error_kind(ErrorKind::Empty));
        assert!(parse_one_declaration("42: x").is_error_kind(ErrorKind::Invalid));
        assert!(parse_one_declaration("color red").is_error_kind(ErrorKind::Invalid));
        assert!(parse_one_declaration("color").is_error_kind(ErrorKind::Invalid));
    }

    #[test]
    fn parse_list_of_declarations() {
        let nodes = parse_declaration_list("foo: 1em; bar: baz", false, false);

        assert_eq!(nodes.len(), 3);
        let (name, value, important) = declaration_parts(&nodes[0]);
        assert_eq!(name, "foo");
        assert!(!important);
        assert!(matches!(
            &*value[1].node_type,
            NodeType::Dimension { value, unit, .. } if *value == 1.0 && unit == "em"
        ));

        assert!(nodes[1].is_whitespace());

        let (name, value, _) = declaration_parts(&nodes[2]);
        assert_eq!(name, "bar");
        assert!(value[1].is_ident());
    }

    #[test]
    fn malformed_declaration_is_replaced_and_list_continues() {
        let nodes = parse_declaration_list("@#$%; color: red", true, true);

        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_error_kind(ErrorKind::Invalid));
        assert!(nodes[1].is_declaration());
    }

    #[test]
    fn at_rules_interleave_with_declarations() {
        let nodes = parse_declaration_list("color: red; @page { a: b }; x: y", true, true);

        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].is_declaration());
        assert!(nodes[1].is_at_rule());
        assert!(nodes[2].is_declaration());
    }
}
