//! Field selectors and declarations.
//!
//! A [`Fields`] value is the axis token of the case matrix: it names one facet of a pipe
//! configuration (which arguments to read, what a function declares, what to keep). Its
//! `Display` form is part of every generated case name, so the rendering of each variant must
//! stay disjoint from every other variant's rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One position in a field layout: a name, or an anonymous slot.
pub type FieldSlot = Option<String>;

/// A field selector, declaration, or sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fields {
    /// Positional selection; negative positions count from the end.
    Positions(Vec<isize>),
    /// Named selection or declaration.
    Names(Vec<String>),
    All,
    Unknown,
    Values,
    Args,
    Results,
    Replace,
    Swap,
}

impl Fields {
    pub fn pos(position: isize) -> Self {
        Fields::Positions(vec![position])
    }

    pub fn name(name: impl Into<String>) -> Self {
        Fields::Names(vec![name.into()])
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fields::Names(names.into_iter().map(Into::into).collect())
    }

}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fields::Positions(positions) => {
                let rendered: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", rendered.join(", "))
            }
            Fields::Names(names) => {
                let rendered: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
                write!(f, "{}", rendered.join(", "))
            }
            Fields::All => write!(f, "ALL"),
            Fields::Unknown => write!(f, "UNKNOWN"),
            Fields::Values => write!(f, "VALUES"),
            Fields::Args => write!(f, "ARGS"),
            Fields::Results => write!(f, "RESULTS"),
            Fields::Replace => write!(f, "REPLACE"),
            Fields::Swap => write!(f, "SWAP"),
        }
    }
}

/// Renders a layout as `'offset', 'line', 1` for diagnostics.
pub fn render_layout(layout: &[FieldSlot]) -> String {
    layout
        .iter()
        .enumerate()
        .map(|(i, slot)| match slot {
            Some(name) => format!("'{}'", name),
            None => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
