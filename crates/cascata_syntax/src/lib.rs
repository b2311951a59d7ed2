//! A CSS Syntax Module Level 3 engine: tokenizer, component value parser
//! and serializer.
//!
//! The parsers turn CSS text (or raw bytes with encoding hints) into a tree
//! of component values, declarations and rules. Syntax errors never abort a
//! parse; they are recorded as error nodes at the position where they
//! occurred, as the syntax spec's error recovery demands. The serializer
//! writes any tree back out so that re-parsing it yields the same tokens.
//!
//! ```
//! use cascata_syntax::{parse_stylesheet, serialize};
//!
//! let rules = parse_stylesheet(".a { color: red }", true, true);
//! assert!(rules[0].is_qualified_rule());
//! assert_eq!(serialize(&rules), ".a { color: red }");
//! ```
//!
//! Parsing is a pure transform over owned, immutable data: no global state,
//! no interior mutability, so independent parses can run on as many threads
//! as desired.

pub mod ast;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{ErrorKind, Node, NodeType, Number};
pub use parser::{
    parse_component_value, parse_component_value_list, parse_declaration_list,
    parse_one_declaration, parse_rule_list, parse_stylesheet, parse_stylesheet_bytes,
    IntoComponentValues,
};
pub use serializer::{serialize, serialize_identifier, serialize_name};
pub use tokenizer::{Token, TokenType, Tokenizer};
