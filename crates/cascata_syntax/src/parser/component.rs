use std::vec::IntoIter;

use cascata_shared::byte_stream::{ByteStream, Location};

use crate::ast::{ErrorKind, Node, NodeType};
use crate::parser::{filter_top_level, next_significant};
use crate::tokenizer::{Token, TokenType, Tokenizer};

/// Input accepted by the parser entry points: a decoded string (tokenized on
/// the fly), a pre-tokenized sequence (for callers that configured the
/// tokenizer themselves, e.g. to turn unicode-range recognition off), or an
/// already built component value list. The latter makes the entry points
/// idempotent: feeding a parse result back in returns equivalent results.
pub trait IntoComponentValues {
    fn into_component_values(self) -> Vec<Node>;
}

impl IntoComponentValues for &str {
    fn into_component_values(self) -> Vec<Node> {
        let mut stream = ByteStream::new();
        stream.read_from_str(self);

        let tokens = Tokenizer::new(&mut stream, Location::default()).tokenize();
        build_component_values(tokens)
    }
}

impl IntoComponentValues for String {
    fn into_component_values(self) -> Vec<Node> {
        self.as_str().into_component_values()
    }
}

impl IntoComponentValues for Vec<Token> {
    fn into_component_values(self) -> Vec<Node> {
        build_component_values(self)
    }
}

impl IntoComponentValues for Vec<Node> {
    fn into_component_values(self) -> Vec<Node> {
        self
    }
}

impl IntoComponentValues for &[Node] {
    fn into_component_values(self) -> Vec<Node> {
        self.to_vec()
    }
}

/// Folds a flat token stream into a component value tree: blocks swallow
/// their content up to the matching closer, function tokens swallow their
/// arguments. A closer that matches nothing becomes an error node in place;
/// a block that is still open at the end of the input is closed implicitly.
pub(crate) fn build_component_values(tokens: Vec<Token>) -> Vec<Node> {
    let mut iter = tokens.into_iter();
    let mut values = Vec::new();

    while let Some(token) = iter.next() {
        if let Some(node) = build_value(token, &mut iter) {
            values.push(node);
        }
    }

    values
}

fn build_value(token: Token, tokens: &mut IntoIter<Token>) -> Option<Node> {
    let loc = token.location;

    let node = match token.token_type {
        TokenType::Eof => return None,
        TokenType::Whitespace(value) => Node::new(NodeType::Whitespace { value }, loc),
        TokenType::Comment(value) => Node::new(NodeType::Comment { value }, loc),
        TokenType::Literal(value) => Node::new(NodeType::Literal { value }, loc),
        TokenType::Ident(value) => Node::new_ident(value, loc),
        TokenType::AtKeyword(value) => Node::new_at_keyword(value, loc),
        TokenType::Hash { value, is_identifier } => {
            Node::new(NodeType::Hash { value, is_identifier }, loc)
        }
        TokenType::QuotedString { value, representation } => {
            Node::new(NodeType::QuotedString { value, representation }, loc)
        }
        TokenType::Url { value, representation } => {
            Node::new(NodeType::Url { value, representation }, loc)
        }
        TokenType::UnicodeRange { start, end } => {
            Node::new(NodeType::UnicodeRange { start, end }, loc)
        }
        TokenType::Number {
            value,
            int_value,
            representation,
        } => Node::new(
            NodeType::Number {
                value,
                int_value,
                representation,
            },
            loc,
        ),
        TokenType::Percentage {
            value,
            int_value,
            representation,
        } => Node::new(
            NodeType::Percentage {
                value,
                int_value,
                representation,
            },
            loc,
        ),
        TokenType::Dimension {
            value,
            int_value,
            representation,
            unit,
        } => Node::new_dimension(value, int_value, representation, unit, loc),
        TokenType::Function(name) => {
            let arguments = consume_block(tokens, &TokenType::RParen);
            Node::new_function(name, arguments, loc)
        }
        TokenType::LParen => Node::new(
            NodeType::ParenBlock {
                content: consume_block(tokens, &TokenType::RParen),
            },
            loc,
        ),
        TokenType::LBracket => Node::new(
            NodeType::SquareBlock {
                content: consume_block(tokens, &TokenType::RBracket),
            },
            loc,
        ),
        TokenType::LCurly => Node::new(
            NodeType::CurlyBlock {
                content: consume_block(tokens, &TokenType::RCurly),
            },
            loc,
        ),
        // closers reaching this point have no opener to match
        TokenType::RParen => Node::new_error(ErrorKind::UnmatchedParen, "unmatched )", loc),
        TokenType::RBracket => Node::new_error(ErrorKind::UnmatchedBracket, "unmatched ]", loc),
        TokenType::RCurly => Node::new_error(ErrorKind::UnmatchedBrace, "unmatched }", loc),
        TokenType::BadString => {
            Node::new_error(ErrorKind::BadString, "bad string token", loc)
        }
        TokenType::BadUrl => Node::new_error(ErrorKind::BadUrl, "bad url token", loc),
        TokenType::EofInString => Node::new_error(
            ErrorKind::EofInString,
            "EOF reached before the end of a string token",
            loc,
        ),
        TokenType::EofInUrl => Node::new_error(
            ErrorKind::EofInUrl,
            "EOF reached before the end of a url token",
            loc,
        ),
    };

    Some(node)
}

fn consume_block(tokens: &mut IntoIter<Token>, end: &TokenType) -> Vec<Node> {
    let mut content = Vec::new();

    while let Some(token) = tokens.next() {
        if token.token_type == *end {
            break;
        }
        if let Some(node) = build_value(token, tokens) {
            content.push(node);
        }
    }

    content
}

/// Parses a single component value. The input must contain exactly one
/// besides whitespace and comments; otherwise an `empty` or `extra-input`
/// error is returned.
pub fn parse_component_value(input: impl IntoComponentValues) -> Node {
    log::trace!("parse_component_value");

    let mut iter = input.into_component_values().into_iter();

    let Some(first) = next_significant(&mut iter) else {
        return Node::new_error(ErrorKind::Empty, "input is empty", Location::default());
    };

    match next_significant(&mut iter) {
        Some(second) => Node::new_error(
            ErrorKind::ExtraInput,
            "expected a single component value",
            second.location,
        ),
        None => first,
    }
}

/// Parses a list of component values. `skip_comments` drops comments from
/// the top level of the list only.
pub fn parse_component_value_list(input: impl IntoComponentValues, skip_comments: bool) -> Vec<Node> {
    log::trace!("parse_component_value_list");

    filter_top_level(input.into_component_values(), skip_comments, false)
}
