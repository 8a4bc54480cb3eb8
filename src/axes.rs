//! The standard axis tables.
//!
//! Each set holds three ordered axis lists (arguments, declared, selected) and the constant
//! inserted by the function under test. List order fixes case-name order and nothing else.

use once_cell::sync::Lazy;

use crate::errors::{MatrixError, MatrixResult};
use crate::fields::Fields;

#[derive(Debug, Clone, PartialEq)]
pub struct AxisSet {
    pub name: &'static str,
    pub arguments: Vec<Fields>,
    pub declared: Vec<Fields>,
    pub selected: Vec<Fields>,
    pub value: String,
}

impl AxisSet {
    /// Size of the full cartesian product.
    pub fn combinations(&self) -> usize {
        self.arguments.len() * self.declared.len() * self.selected.len()
    }

    pub fn named(name: &str) -> MatrixResult<&'static AxisSet> {
        match name.to_lowercase().as_str() {
            "op" => Ok(&*OP_AXES),
            "lhs" => Ok(&*LHS_AXES),
            "rhs" => Ok(&*RHS_AXES),
            _ => Err(MatrixError::UnknownAxisSet {
                name: name.to_string(),
            }),
        }
    }
}

/// Single-function axes.
pub static OP_AXES: Lazy<AxisSet> = Lazy::new(|| AxisSet {
    name: "op",
    arguments: vec![Fields::pos(-1), Fields::pos(0), Fields::All],
    declared: vec![
        Fields::name("field"),
        Fields::Unknown,
        Fields::Values,
        Fields::Args,
    ],
    selected: vec![
        Fields::pos(-1),
        Fields::name("field"),
        Fields::Results,
        Fields::All,
        Fields::Replace,
        Fields::Swap,
    ],
    value: "value".to_string(),
});

/// Left-hand side of a two-branch assembly.
pub static LHS_AXES: Lazy<AxisSet> = Lazy::new(|| AxisSet {
    name: "lhs",
    arguments: vec![Fields::pos(-1), Fields::All],
    declared: vec![Fields::name("field"), Fields::Unknown, Fields::Args],
    selected: vec![Fields::Results, Fields::All],
    value: "value".to_string(),
});

/// Right-hand side of a two-branch assembly.
pub static RHS_AXES: Lazy<AxisSet> = Lazy::new(|| AxisSet {
    name: "rhs",
    arguments: vec![Fields::pos(-1), Fields::pos(0), Fields::All],
    declared: vec![
        Fields::name("field2"),
        Fields::Unknown,
        Fields::Values,
        Fields::Args,
    ],
    selected: vec![
        Fields::pos(-1),
        Fields::name("field2"),
        Fields::name("field"),
        Fields::Results,
        Fields::All,
    ],
    value: "value2".to_string(),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_sets_have_expected_sizes() {
        assert_eq!(OP_AXES.combinations(), 72);
        assert_eq!(LHS_AXES.combinations(), 12);
        assert_eq!(RHS_AXES.combinations(), 60);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(AxisSet::named("RHS").unwrap().value, "value2");
        assert!(matches!(
            AxisSet::named("join"),
            Err(MatrixError::UnknownAxisSet { .. })
        ));
    }
}
