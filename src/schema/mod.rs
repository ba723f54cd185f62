//! Column type grammar.
//!
//! This module defines the typed column descriptors and the parser that
//! turns Native type strings into them.

mod parser;
mod types;

pub use parser::{
    parse_column_type, parse_type_expr, split_element_name, split_type_args, TypeExpr,
    MAX_DATETIME64_PRECISION,
};
pub use types::*;
