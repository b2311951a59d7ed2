use core::fmt::{Display, Formatter};

use cascata_shared::byte_stream::Location;
use cow_utils::CowUtils;
use serde::Serialize;

use crate::serializer;

pub type Number = f64;

/// Machine-readable identifier for a syntax error carried in the tree.
///
/// Errors are regular nodes: the tokenizer and the parsers never abort, they
/// record what went wrong at the position where it happened and keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A string token was cut short by an unescaped newline
    BadString,
    /// An invalid character inside a `url(...)` token
    BadUrl,
    /// The input ended in the middle of a string token
    EofInString,
    /// The input ended in the middle of a `url(...)` token
    EofInUrl,
    /// A `)` with no matching `(`
    UnmatchedParen,
    /// A `]` with no matching `[`
    UnmatchedBracket,
    /// A `}` with no matching `{`
    UnmatchedBrace,
    /// The input contained nothing but whitespace and comments
    Empty,
    /// Trailing content after a single expected item
    ExtraInput,
    /// A construct that does not match its grammar
    Invalid,
}

impl ErrorKind {
    /// The stable name of this error kind. Stray closers are named after the
    /// closer character itself.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadString => "bad-string",
            ErrorKind::BadUrl => "bad-url",
            ErrorKind::EofInString => "eof-in-string",
            ErrorKind::EofInUrl => "eof-in-url",
            ErrorKind::UnmatchedParen => ")",
            ErrorKind::UnmatchedBracket => "]",
            ErrorKind::UnmatchedBrace => "}",
            ErrorKind::Empty => "empty",
            ErrorKind::ExtraInput => "extra-input",
            ErrorKind::Invalid => "invalid",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The payload of a node in the syntax tree.
///
/// A *component value* is any of the token variants or a block/function; the
/// higher-level parsers additionally produce `Declaration`, `QualifiedRule`
/// and `AtRule` nodes. All `lower_*` fields hold the ASCII-lowercased form of
/// their source-cased sibling and are computed at construction.
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "type")]
pub enum NodeType {
    /// A run of whitespace, as found in the source
    #[serde(rename = "whitespace")]
    Whitespace { value: String },
    /// The text between `/*` and `*/`
    #[serde(rename = "comment")]
    Comment { value: String },
    /// One piece of punctuation: `:` `;` `,` `<!--` `-->` `~=` `|=` `^=`
    /// `$=` `*=` `||`, or a single delim code point
    #[serde(rename = "literal")]
    Literal { value: String },
    #[serde(rename = "ident")]
    Ident { value: String, lower_value: String },
    /// The value does not include the `@` marker
    #[serde(rename = "at-keyword")]
    AtKeyword { value: String, lower_value: String },
    /// The value does not include the `#` marker. `is_identifier` is true
    /// when the source formed a valid identifier (only such hashes are valid
    /// ID selectors).
    #[serde(rename = "hash")]
    Hash { value: String, is_identifier: bool },
    /// A quoted string. `value` is unescaped and has no quotes;
    /// `representation` is the original source including the quotes.
    #[serde(rename = "string")]
    QuotedString { value: String, representation: String },
    /// `value` is the unescaped URL; `representation` is the original
    /// `url(...)` source.
    #[serde(rename = "url")]
    Url { value: String, representation: String },
    #[serde(rename = "unicode-range")]
    UnicodeRange { start: u32, end: u32 },
    /// `int_value` is present iff the source was syntactically an integer;
    /// `representation` re-parses to the same numeric value.
    #[serde(rename = "number")]
    Number {
        value: Number,
        int_value: Option<i64>,
        representation: String,
    },
    /// The representation does not include the `%` marker
    #[serde(rename = "percentage")]
    Percentage {
        value: Number,
        int_value: Option<i64>,
        representation: String,
    },
    /// The representation does not include the unit
    #[serde(rename = "dimension")]
    Dimension {
        value: Number,
        int_value: Option<i64>,
        representation: String,
        unit: String,
        lower_unit: String,
    },
    /// A `( … )` block; the parens themselves are not part of the content
    #[serde(rename = "() block")]
    ParenBlock { content: Vec<Node> },
    /// A `[ … ]` block
    #[serde(rename = "[] block")]
    SquareBlock { content: Vec<Node> },
    /// A `{ … }` block
    #[serde(rename = "{} block")]
    CurlyBlock { content: Vec<Node> },
    /// `name( … )`. Commas in the arguments are ordinary `,` literals.
    #[serde(rename = "function")]
    Function {
        name: String,
        lower_name: String,
        arguments: Vec<Node>,
    },
    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
    /// `name : value [!important]`. When `important` is true the
    /// `!important` marker has been stripped from `value`.
    #[serde(rename = "declaration")]
    Declaration {
        name: String,
        lower_name: String,
        value: Vec<Node>,
        important: bool,
    },
    /// A prelude followed by a `{}` block; `content` is the block's content
    #[serde(rename = "qualified-rule")]
    QualifiedRule { prelude: Vec<Node>, content: Vec<Node> },
    /// `content` is `None` iff the rule was terminated by a `;`
    #[serde(rename = "at-rule")]
    AtRule {
        at_keyword: String,
        lower_at_keyword: String,
        prelude: Vec<Node>,
        content: Option<Vec<Node>>,
    },
}

/// A node is a single element in the tree: a token, a block or one of the
/// higher-level constructs. Every node records the line and column of its
/// first code point in the source; positions are fixed at construction.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub node_type: Box<NodeType>,
    #[serde(skip)]
    pub location: Location,
}

fn ascii_lowercase(value: &str) -> String {
    value.cow_to_ascii_lowercase().into_owned()
}

impl Node {
    pub fn new(node_type: NodeType, location: Location) -> Self {
        Self {
            node_type: Box::new(node_type),
            location,
        }
    }

    pub fn new_ident(value: String, location: Location) -> Self {
        let lower_value = ascii_lowercase(&value);
        Node::new(NodeType::Ident { value, lower_value }, location)
    }

    pub fn new_at_keyword(value: String, location: Location) -> Self {
        let lower_value = ascii_lowercase(&value);
        Node::new(NodeType::AtKeyword { value, lower_value }, location)
    }

    pub fn new_function(name: String, arguments: Vec<Node>, location: Location) -> Self {
        let lower_name = ascii_lowercase(&name);
        Node::new(
            NodeType::Function {
                name,
                lower_name,
                arguments,
            },
            location,
        )
    }

    pub fn new_dimension(
        value: Number,
        int_value: Option<i64>,
        representation: String,
        unit: String,
        location: Location,
    ) -> Self {
        let lower_unit = ascii_lowercase(&unit);
        Node::new(
            NodeType::Dimension {
                value,
                int_value,
                representation,
                unit,
                lower_unit,
            },
            location,
        )
    }

    pub fn new_declaration(name: String, value: Vec<Node>, important: bool, location: Location) -> Self {
        let lower_name = ascii_lowercase(&name);
        Node::new(
            NodeType::Declaration {
                name,
                lower_name,
                value,
                important,
            },
            location,
        )
    }

    pub fn new_at_rule(
        at_keyword: String,
        prelude: Vec<Node>,
        content: Option<Vec<Node>>,
        location: Location,
    ) -> Self {
        let lower_at_keyword = ascii_lowercase(&at_keyword);
        Node::new(
            NodeType::AtRule {
                at_keyword,
                lower_at_keyword,
                prelude,
                content,
            },
            location,
        )
    }

    pub fn new_error(kind: ErrorKind, message: &str, location: Location) -> Self {
        Node::new(
            NodeType::Error {
                kind,
                message: message.to_string(),
            },
            location,
        )
    }
}

impl Node {
    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        matches!(&*self.node_type, NodeType::Whitespace { .. })
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(&*self.node_type, NodeType::Comment { .. })
    }

    /// Returns true for a literal token with exactly the given value, so
    /// delimiters can be checked without inspecting tags: `node.is_literal(";")`
    #[must_use]
    pub fn is_literal(&self, value: &str) -> bool {
        matches!(&*self.node_type, NodeType::Literal { value: v } if v == value)
    }

    #[must_use]
    pub fn is_ident(&self) -> bool {
        matches!(&*self.node_type, NodeType::Ident { .. })
    }

    #[must_use]
    pub fn is_at_keyword(&self) -> bool {
        matches!(&*self.node_type, NodeType::AtKeyword { .. })
    }

    #[must_use]
    pub fn is_curly_block(&self) -> bool {
        matches!(&*self.node_type, NodeType::CurlyBlock { .. })
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(&*self.node_type, NodeType::Error { .. })
    }

    #[must_use]
    pub fn is_error_kind(&self, kind: ErrorKind) -> bool {
        matches!(&*self.node_type, NodeType::Error { kind: k, .. } if *k == kind)
    }

    #[must_use]
    pub fn is_declaration(&self) -> bool {
        matches!(&*self.node_type, NodeType::Declaration { .. })
    }

    #[must_use]
    pub fn is_qualified_rule(&self) -> bool {
        matches!(&*self.node_type, NodeType::QualifiedRule { .. })
    }

    #[must_use]
    pub fn is_at_rule(&self) -> bool {
        matches!(&*self.node_type, NodeType::AtRule { .. })
    }

    /// Whether a numeric token was syntactically an integer
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.int_value().is_some()
    }

    /// The integer value of a numeric token, when it was syntactically an
    /// integer
    #[must_use]
    pub fn int_value(&self) -> Option<i64> {
        match &*self.node_type {
            NodeType::Number { int_value, .. }
            | NodeType::Percentage { int_value, .. }
            | NodeType::Dimension { int_value, .. } => *int_value,
            _ => None,
        }
    }

    /// The unescaped value of an ident token
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match &*self.node_type {
            NodeType::Ident { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The lowercased name, the value and the importance of a declaration
    #[must_use]
    pub fn as_declaration(&self) -> Option<(&str, &[Node], bool)> {
        match &*self.node_type {
            NodeType::Declaration {
                lower_name,
                value,
                important,
                ..
            } => Some((lower_name, value, *important)),
            _ => None,
        }
    }

    /// The prelude and the content of a qualified rule
    #[must_use]
    pub fn as_qualified_rule(&self) -> Option<(&[Node], &[Node])> {
        match &*self.node_type {
            NodeType::QualifiedRule { prelude, content } => Some((prelude, content)),
            _ => None,
        }
    }

    /// The lowercased keyword, the prelude and the content of an at-rule
    #[must_use]
    pub fn as_at_rule(&self) -> Option<(&str, &[Node], Option<&[Node]>)> {
        match &*self.node_type {
            NodeType::AtRule {
                lower_at_keyword,
                prelude,
                content,
                ..
            } => Some((lower_at_keyword, prelude, content.as_deref())),
            _ => None,
        }
    }

    /// The name of this node's type, as used in error messages and JSON
    /// dumps
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match &*self.node_type {
            NodeType::Whitespace { .. } => "whitespace",
            NodeType::Comment { .. } => "comment",
            NodeType::Literal { .. } => "literal",
            NodeType::Ident { .. } => "ident",
            NodeType::AtKeyword { .. } => "at-keyword",
            NodeType::Hash { .. } => "hash",
            NodeType::QuotedString { .. } => "string",
            NodeType::Url { .. } => "url",
            NodeType::UnicodeRange { .. } => "unicode-range",
            NodeType::Number { .. } => "number",
            NodeType::Percentage { .. } => "percentage",
            NodeType::Dimension { .. } => "dimension",
            NodeType::ParenBlock { .. } => "() block",
            NodeType::SquareBlock { .. } => "[] block",
            NodeType::CurlyBlock { .. } => "{} block",
            NodeType::Function { .. } => "function",
            NodeType::Error { .. } => "error",
            NodeType::Declaration { .. } => "declaration",
            NodeType::QualifiedRule { .. } => "qualified-rule",
            NodeType::AtRule { .. } => "at-rule",
        }
    }

    /// The ASCII-lowercased value of an ident-ish node: the value of an
    /// ident or at-keyword, the name of a function or declaration, the unit
    /// of a dimension
    #[must_use]
    pub fn lower_value(&self) -> Option<&str> {
        match &*self.node_type {
            NodeType::Ident { lower_value, .. } | NodeType::AtKeyword { lower_value, .. } => {
                Some(lower_value)
            }
            NodeType::Function { lower_name, .. } | NodeType::Declaration { lower_name, .. } => {
                Some(lower_name)
            }
            NodeType::Dimension { lower_unit, .. } => Some(lower_unit),
            _ => None,
        }
    }
}

/// Literal tokens compare equal to their bare textual value
impl PartialEq<&str> for Node {
    fn eq(&self, other: &&str) -> bool {
        self.is_literal(other)
    }
}

/// Writes the node back as CSS text
impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        serializer::serialize_node(self, &mut out);
        write!(f, "{out}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lowered_fields() {
        let node = Node::new_ident("Red".to_string(), Location::default());
        match &*node.node_type {
            NodeType::Ident { value, lower_value } => {
                assert_eq!(value, "Red");
                assert_eq!(lower_value, "red");
            }
            _ => unreachable!(),
        }

        let node = Node::new_dimension(1.5, None, "1.5".to_string(), "REM".to_string(), Location::default());
        assert_eq!(node.lower_value(), Some("rem"));
    }

    #[test]
    fn literal_equality() {
        let semicolon = Node::new(
            NodeType::Literal {
                value: ";".to_string(),
            },
            Location::default(),
        );

        assert!(semicolon.is_literal(";"));
        assert!(semicolon == ";");
        assert!(semicolon != ":");
    }

    #[test]
    fn integer_flag_follows_int_value() {
        let int = Node::new(
            NodeType::Number {
                value: 3.0,
                int_value: Some(3),
                representation: "3".to_string(),
            },
            Location::default(),
        );
        let float = Node::new(
            NodeType::Number {
                value: 3.0,
                int_value: None,
                representation: "3.0".to_string(),
            },
            Location::default(),
        );

        assert!(int.is_integer());
        assert_eq!(int.int_value(), Some(3));
        assert!(!float.is_integer());
    }

    #[test]
    fn serializes_with_type_tag() {
        let node = Node::new_ident("a".to_string(), Location::default());
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["type"], "ident");
        assert_eq!(json["value"], "a");
    }
}
