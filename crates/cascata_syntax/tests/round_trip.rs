//! Round-trip properties: serializing a parsed tree and parsing it again
//! must reproduce the tree. Source locations are not part of the comparison
//! (an inserted comment may shift them); the JSON dump skips them.

use cascata_syntax::{parse_component_value_list, parse_stylesheet, serialize, Node, NodeType};
use serde_json::Value;

fn dump(nodes: &[Node]) -> Value {
    serde_json::to_value(nodes).unwrap()
}

#[test]
fn component_value_lists_survive_a_round_trip() {
    let corpus = [
        "a { b: 1em; c: url(x.png) }",
        "  \t\n multiple   runs\t",
        "fn(1, 20%, -3.5e2) [nested (deeply {ok}) ]",
        "#Hash #0bad @key u+1f4a9-1f4ff",
        "'string' \"other\" /* comment */ url( spaced )",
        "@media (min-width: 10px) { a {} }",
        "stray ) ] } closers",
        "--custom: var(--x, fallback)",
        "unicode \\26 escape \\2764\\FE0F",
        "url('eof",
    ];

    for input in corpus {
        let first = parse_component_value_list(input, false);
        let text = serialize(&first);
        let second = parse_component_value_list(text.clone(), false);

        assert_eq!(
            dump(&first),
            dump(&second),
            "round trip changed the tree for {input:?} (serialized as {text:?})"
        );
    }
}

#[test]
fn representations_are_preserved_byte_for_byte() {
    let tokens = [
        "1.50em", "+3", "-0", ".5", "1e3", "1E+2", "0.0001", "'str'", "\"s\\\"t\"",
        "url( http://a.example/ )", "url(plain)", "12%",
    ];

    for token in tokens {
        let values = parse_component_value_list(token, false);
        assert_eq!(serialize(&values), token, "representation lost for {token:?}");
    }
}

#[test]
fn stylesheets_survive_a_round_trip() {
    let corpus = [
        ".a { color: red }",
        "@import \"a.css\"; h1, h2 > .b { margin: 0 auto !important }",
        "@media print { a {} b { x: y } }",
    ];

    for input in corpus {
        let first = parse_stylesheet(input, false, false);
        let text = serialize(&first);
        let second = parse_stylesheet(text.clone(), false, false);

        assert_eq!(
            dump(&first),
            dump(&second),
            "round trip changed the stylesheet for {input:?} (serialized as {text:?})"
        );
    }
}

#[test]
fn numeric_tokens_keep_value_and_integer_flag_consistent() {
    let values = parse_component_value_list("1 1.0 +2 -2.5 3e1 40% 4.5% 5px 5.5px", false);

    for node in &values {
        match &*node.node_type {
            NodeType::Number { value, int_value, .. }
            | NodeType::Percentage { value, int_value, .. }
            | NodeType::Dimension { value, int_value, .. } => {
                assert_eq!(node.is_integer(), int_value.is_some());
                if let Some(int_value) = int_value {
                    assert_eq!(*value, *int_value as f64);
                }
            }
            _ => {}
        }
    }
}

#[test]
fn lowered_fields_match_ascii_lowercase() {
    let values = parse_component_value_list("IDent @AtKey Func(1EM) 2REM", false);

    for node in &values {
        match &*node.node_type {
            NodeType::Ident { value, lower_value }
            | NodeType::AtKeyword { value, lower_value } => {
                assert_eq!(*lower_value, value.to_ascii_lowercase());
            }
            NodeType::Function { name, lower_name, .. } => {
                assert_eq!(*lower_name, name.to_ascii_lowercase());
            }
            NodeType::Dimension { unit, lower_unit, .. } => {
                assert_eq!(*lower_unit, unit.to_ascii_lowercase());
            }
            _ => {}
        }
    }
}

#[test]
fn unicode_ranges_stay_ordered_and_in_unicode_space() {
    let values = parse_component_value_list("u+26 U+0-10FFFF U+FF???? u+5-3 u+abcdef", false);

    for node in &values {
        if let NodeType::UnicodeRange { start, end } = &*node.node_type {
            assert!(start <= end);
            assert!(*end <= 0x10FFFF);
        }
    }
}

#[test]
fn identifier_hashes_re_parse_as_identifier_hashes() {
    let values = parse_component_value_list("#header #-x #--y #\\33 three", false);

    for node in &values {
        if let NodeType::Hash { value, is_identifier } = &*node.node_type {
            assert!(*is_identifier, "{value:?} should be an identifier hash");
        }
    }

    let text = serialize(&values);
    let again = parse_component_value_list(text, false);
    assert_eq!(dump(&values), dump(&again));
}
