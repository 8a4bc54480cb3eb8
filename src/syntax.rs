//! Literal syntax for expectation resources and tuple literals.

pub mod parser;

pub use parser::{parse_properties, parse_tuple};
