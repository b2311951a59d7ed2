use itertools::iproduct;
use lazy_static::lazy_static;

use crate::ast::{ErrorKind, Node, NodeType};

lazy_static! {
    /// Pairs of adjacent serialization keys that would re-tokenize as a
    /// single token. An empty comment written between them keeps the tokens
    /// apart. Keys are node type names, except literals which key on their
    /// own value.
    static ref BAD_PAIRS: Vec<(&'static str, &'static str)> = {
        let mut pairs: Vec<(&'static str, &'static str)> = Vec::new();

        // an ident-ish tail glues onto anything that starts ident-ish
        pairs.extend(iproduct!(
            ["ident", "at-keyword", "hash", "dimension", "#", "-", "number", "@"],
            ["ident", "function", "url", "number", "percentage", "dimension", "unicode-range"]
        ));
        pairs.extend(iproduct!(
            ["ident", "at-keyword", "hash", "dimension"],
            ["-", "-->"]
        ));
        pairs.extend(iproduct!(
            ["unicode-range", ".", "+"],
            ["number", "percentage", "dimension"]
        ));
        pairs.extend(iproduct!(["unicode-range"], ["ident", "function", "?"]));
        pairs.extend(iproduct!(["$", "*", "^", "~", "|"], ["="]));
        pairs.extend([("ident", "("), ("|", "|"), ("/", "*"), ("number", "%")]);

        pairs
    };
}

fn bad_pair(left: &str, right: &str) -> bool {
    BAD_PAIRS.iter().any(|&(a, b)| a == left && b == right)
}

/// The key a node contributes to the adjacency table
fn serialization_key(node: &Node) -> &str {
    match &*node.node_type {
        NodeType::Whitespace { .. } => "whitespace",
        NodeType::Comment { .. } => "comment",
        NodeType::Literal { value } => value,
        NodeType::Ident { .. } => "ident",
        NodeType::AtKeyword { .. } => "at-keyword",
        NodeType::Hash { .. } => "hash",
        NodeType::QuotedString { .. } => "string",
        NodeType::Url { .. } => "url",
        NodeType::UnicodeRange { .. } => "unicode-range",
        NodeType::Number { .. } => "number",
        NodeType::Percentage { .. } => "percentage",
        NodeType::Dimension { .. } => "dimension",
        NodeType::ParenBlock { .. } => "(",
        NodeType::SquareBlock { .. } => "[",
        NodeType::CurlyBlock { .. } => "{",
        NodeType::Function { .. } => "function",
        NodeType::Error { .. } => "error",
        NodeType::Declaration { .. } => "declaration",
        NodeType::QualifiedRule { .. } => "qualified-rule",
        NodeType::AtRule { .. } => "at-rule",
    }
}

/// Serializes a list of nodes back to CSS text. Adjacent tokens that would
/// re-tokenize as one get an empty comment between them, so that parsing the
/// result yields the same tokens again.
#[must_use]
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    serialize_to(nodes, &mut out);
    out
}

pub(crate) fn serialize_to(nodes: &[Node], out: &mut String) {
    let mut previous_key: Option<&str> = None;

    for node in nodes {
        let key = serialization_key(node);
        if let Some(previous) = previous_key {
            if bad_pair(previous, key) {
                out.push_str("/**/");
            } else if previous == "\\" && !whitespace_starting_with_newline(node) {
                // a trailing backslash would otherwise escape what follows;
                // backslash-newline is not an escape
                out.push('\n');
            }
        }

        serialize_node(node, out);
        previous_key = Some(key);
    }
}

fn whitespace_starting_with_newline(node: &Node) -> bool {
    matches!(&*node.node_type, NodeType::Whitespace { value } if value.starts_with('\n'))
}

/// A function block is left unclosed when the input ended inside a string in
/// its (possibly nested) last argument, since the error already signifies
/// unterminated input.
fn suppress_closing_paren(arguments: &[Node]) -> bool {
    let mut arguments = arguments;
    loop {
        match arguments.last().map(|node| &*node.node_type) {
            Some(NodeType::Error {
                kind: ErrorKind::EofInString,
                ..
            }) => return true,
            Some(NodeType::Function {
                arguments: nested, ..
            }) => arguments = nested,
            _ => return false,
        }
    }
}

/// Writes a single node as CSS text
pub fn serialize_node(node: &Node, out: &mut String) {
    match &*node.node_type {
        NodeType::Whitespace { value } | NodeType::Literal { value } => out.push_str(value),
        NodeType::Comment { value } => {
            out.push_str("/*");
            out.push_str(value);
            out.push_str("*/");
        }
        NodeType::Ident { value, .. } => out.push_str(&serialize_identifier(value)),
        NodeType::AtKeyword { value, .. } => {
            out.push('@');
            out.push_str(&serialize_identifier(value));
        }
        NodeType::Hash { value, is_identifier } => {
            out.push('#');
            if *is_identifier {
                out.push_str(&serialize_identifier(value));
            } else {
                out.push_str(&serialize_name(value));
            }
        }
        NodeType::QuotedString { representation, .. } | NodeType::Url { representation, .. } => {
            out.push_str(representation);
        }
        NodeType::UnicodeRange { start, end } => {
            if start == end {
                out.push_str(&format!("U+{start:X}"));
            } else {
                out.push_str(&format!("U+{start:X}-{end:X}"));
            }
        }
        NodeType::Number { representation, .. } => out.push_str(representation),
        NodeType::Percentage { representation, .. } => {
            out.push_str(representation);
            out.push('%');
        }
        NodeType::Dimension {
            representation,
            unit,
            ..
        } => {
            out.push_str(representation);
            let exponent_like =
                unit == "e" || unit == "E" || unit.starts_with("e-") || unit.starts_with("E-");
            if exponent_like {
                // escape the `e` so the unit cannot re-parse as scientific
                // notation
                let mut chars = unit.chars();
                if let Some(first) = chars.next() {
                    out.push_str(&format!("\\{:X} ", first as u32));
                    out.push_str(&serialize_name(chars.as_str()));
                }
            } else {
                out.push_str(&serialize_identifier(unit));
            }
        }
        NodeType::ParenBlock { content } => {
            out.push('(');
            serialize_to(content, out);
            out.push(')');
        }
        NodeType::SquareBlock { content } => {
            out.push('[');
            serialize_to(content, out);
            out.push(']');
        }
        NodeType::CurlyBlock { content } => {
            out.push('{');
            serialize_to(content, out);
            out.push('}');
        }
        NodeType::Function {
            name, arguments, ..
        } => {
            out.push_str(&serialize_identifier(name));
            out.push('(');
            serialize_to(arguments, out);
            if !suppress_closing_paren(arguments) {
                out.push(')');
            }
        }
        NodeType::Error { kind, .. } => match kind {
            ErrorKind::BadString => out.push_str("\"[bad string]\n"),
            ErrorKind::BadUrl => out.push_str("url([bad url])"),
            ErrorKind::UnmatchedParen => out.push(')'),
            ErrorKind::UnmatchedBracket => out.push(']'),
            ErrorKind::UnmatchedBrace => out.push('}'),
            // the remaining kinds stand for absent or already-consumed
            // input and have no textual form
            ErrorKind::EofInString
            | ErrorKind::EofInUrl
            | ErrorKind::Empty
            | ErrorKind::ExtraInput
            | ErrorKind::Invalid => {}
        },
        NodeType::Declaration {
            name,
            value,
            important,
            ..
        } => {
            out.push_str(&serialize_identifier(name));
            out.push(':');
            serialize_to(value, out);
            if *important {
                out.push_str("!important");
            }
        }
        NodeType::QualifiedRule { prelude, content } => {
            serialize_to(prelude, out);
            out.push('{');
            serialize_to(content, out);
            out.push('}');
        }
        NodeType::AtRule {
            at_keyword,
            prelude,
            content,
            ..
        } => {
            out.push('@');
            out.push_str(&serialize_identifier(at_keyword));
            serialize_to(prelude, out);
            match content {
                Some(content) => {
                    out.push('{');
                    serialize_to(content, out);
                    out.push('}');
                }
                None => out.push(';'),
            }
        }
    }
}

/// Serializes any string as a CSS identifier, escaping as little as
/// possible.
#[must_use]
pub fn serialize_identifier(value: &str) -> String {
    if value == "-" {
        return "\\-".to_string();
    }

    if let Some(rest) = value.strip_prefix("--") {
        return format!("--{}", serialize_name(rest));
    }

    let (prefix, rest) = match value.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", value),
    };

    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return prefix.to_string();
    };

    let mut result = String::from(prefix);
    match first {
        c if c.is_ascii_alphabetic() || c == '_' || !c.is_ascii() => result.push(c),
        '\n' => result.push_str("\\A "),
        '\r' => result.push_str("\\D "),
        '\u{000C}' => result.push_str("\\C "),
        c if c.is_ascii_digit() => result.push_str(&format!("\\{:X} ", c as u32)),
        c => {
            result.push('\\');
            result.push(c);
        }
    }
    result.push_str(&serialize_name(chars.as_str()));

    result
}

/// Serializes any string as a CSS name: like an identifier, but without the
/// restrictions on the first code point.
#[must_use]
pub fn serialize_name(value: &str) -> String {
    let mut result = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => {
                result.push(c);
            }
            '\n' => result.push_str("\\A "),
            '\r' => result.push_str("\\D "),
            '\u{000C}' => result.push_str("\\C "),
            c => {
                result.push('\\');
                result.push(c);
            }
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use cascata_shared::byte_stream::Location;
    use crate::ast::Number;

    fn loc() -> Location {
        Location::default()
    }

    fn ident(value: &str) -> Node {
        Node::new_ident(value.to_string(), loc())
    }

    fn literal(value: &str) -> Node {
        Node::new(
            NodeType::Literal {
                value: value.to_string(),
            },
            loc(),
        )
    }

    fn number(value: Number, int_value: Option<i64>, representation: &str) -> Node {
        Node::new(
            NodeType::Number {
                value,
                int_value,
                representation: representation.to_string(),
            },
            loc(),
        )
    }

    #[test]
    fn identifier_escaping() {
        assert_eq!(serialize_identifier("red"), "red");
        assert_eq!(serialize_identifier("-"), "\\-");
        assert_eq!(serialize_identifier("--custom"), "--custom");
        assert_eq!(serialize_identifier("9lives"), "\\39 lives");
        assert_eq!(serialize_identifier("-5x"), "-\\35 x");
        assert_eq!(serialize_identifier("a b"), "a\\ b");
        assert_eq!(serialize_identifier("a\nb"), "a\\A b");
        assert_eq!(serialize_identifier("âcc"), "âcc");
    }

    #[test]
    fn name_escaping() {
        assert_eq!(serialize_name("0red"), "0red");
        assert_eq!(serialize_name("a.b"), "a\\.b");
        assert_eq!(serialize_name("a\u{000C}b"), "a\\C b");
    }

    #[test]
    fn comment_inserted_between_merging_tokens() {
        assert_eq!(serialize(&[ident("a"), ident("b")]), "a/**/b");
        assert_eq!(
            serialize(&[number(3.0, Some(3), "3"), ident("em")]),
            "3/**/em"
        );
        assert_eq!(serialize(&[literal("/"), literal("*")]), "//**/*");
        assert_eq!(serialize(&[literal("|"), literal("|")]), "|/**/|");
        assert_eq!(serialize(&[literal("$"), literal("=")]), "$/**/=");
        assert_eq!(
            serialize(&[ident("f"), Node::new(NodeType::ParenBlock { content: vec![] }, loc())]),
            "f/**/()"
        );
    }

    #[test]
    fn no_comment_between_safe_tokens() {
        assert_eq!(serialize(&[ident("a"), literal(":"), ident("b")]), "a:b");
        assert_eq!(serialize(&[literal(";"), ident("b")]), ";b");
    }

    #[test]
    fn newline_after_trailing_backslash() {
        assert_eq!(serialize(&[literal("\\"), ident("x")]), "\\\nx");

        let newline_ws = Node::new(
            NodeType::Whitespace {
                value: "\n".to_string(),
            },
            loc(),
        );
        assert_eq!(serialize(&[literal("\\"), newline_ws]), "\\\n");
    }

    #[test]
    fn exponent_like_units_are_escaped() {
        let dim = |unit: &str| {
            Node::new_dimension(3.0, Some(3), "3".to_string(), unit.to_string(), loc())
        };

        assert_eq!(serialize(&[dim("em")]), "3em");
        assert_eq!(serialize(&[dim("e")]), "3\\65 ");
        assert_eq!(serialize(&[dim("E")]), "3\\45 ");
        assert_eq!(serialize(&[dim("e-x")]), "3\\65 -x");
    }

    #[test]
    fn error_tokens_serialize_per_kind() {
        let error = |kind| Node::new_error(kind, "", loc());

        assert_eq!(serialize(&[error(ErrorKind::BadString)]), "\"[bad string]\n");
        assert_eq!(serialize(&[error(ErrorKind::BadUrl)]), "url([bad url])");
        assert_eq!(serialize(&[error(ErrorKind::UnmatchedBrace)]), "}");
        assert_eq!(serialize(&[error(ErrorKind::EofInString)]), "");
        assert_eq!(serialize(&[error(ErrorKind::EofInUrl)]), "");
    }

    #[test]
    fn unclosed_function_with_eof_in_string() {
        let string = Node::new(
            NodeType::QuotedString {
                value: "eof".to_string(),
                representation: "'eof".to_string(),
            },
            loc(),
        );
        let error = Node::new_error(ErrorKind::EofInString, "EOF in string", loc());
        let function = Node::new_function("url".to_string(), vec![string, error], loc());

        assert_eq!(serialize(&[function]), "url('eof");
    }

    #[test]
    fn unicode_range_formats() {
        let range = |start, end| Node::new(NodeType::UnicodeRange { start, end }, loc());

        assert_eq!(serialize(&[range(0x26, 0x26)]), "U+26");
        assert_eq!(serialize(&[range(0x1F, 0x2A)]), "U+1F-2A");
    }
}
