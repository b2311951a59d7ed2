use crate::ast::Node;

mod component;
mod declaration;
mod rule;

pub use component::{parse_component_value, parse_component_value_list, IntoComponentValues};
pub use declaration::{parse_declaration_list, parse_one_declaration};
pub use rule::{parse_rule_list, parse_stylesheet, parse_stylesheet_bytes};

/// Advances past whitespace and comments and returns the next component
/// value, if any
pub(crate) fn next_significant(iter: &mut impl Iterator<Item = Node>) -> Option<Node> {
    iter.find(|node| !node.is_whitespace() && !node.is_comment())
}

/// Drops comments and/or whitespace from the top level of a component value
/// list. Values nested in blocks and functions are left alone.
pub(crate) fn filter_top_level(
    values: Vec<Node>,
    skip_comments: bool,
    skip_whitespace: bool,
) -> Vec<Node> {
    if !skip_comments && !skip_whitespace {
        return values;
    }

    values
        .into_iter()
        .filter(|node| {
            !((skip_comments && node.is_comment()) || (skip_whitespace && node.is_whitespace()))
        })
        .collect()
}
