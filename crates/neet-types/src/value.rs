//! Script variable values.
//!
//! Every variable carries a fixed tag: text, an ordered list of text, or a
//! text-keyed map. The tag is chosen on first assignment and never changes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A variable's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Variable {
    /// Plain text. The only kind that interpolation substitutes.
    #[serde(rename = "string")]
    Text(String),
    /// Ordered list of text values.
    List(Vec<String>),
    /// Text-keyed map of text values.
    #[serde(rename = "object")]
    Map(BTreeMap<String, String>),
}

impl Variable {
    /// Create a text variable.
    pub fn text(value: impl Into<String>) -> Self {
        Variable::Text(value.into())
    }

    /// Create an empty list variable.
    pub fn empty_list() -> Self {
        Variable::List(Vec::new())
    }

    /// Create an empty map variable.
    pub fn empty_map() -> Self {
        Variable::Map(BTreeMap::new())
    }

    /// The tag of this value.
    pub fn kind(&self) -> VariableKind {
        match self {
            Variable::Text(_) => VariableKind::Text,
            Variable::List(_) => VariableKind::List,
            Variable::Map(_) => VariableKind::Map,
        }
    }

    /// Borrow the text payload, if this is a text variable.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Variable::Text(s) => Some(s),
            Variable::List(_) | Variable::Map(_) => None,
        }
    }
}

/// The fixed type classification of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Text,
    List,
    Map,
}

impl VariableKind {
    /// Name shown to scripts (`vartype`).
    pub fn script_name(&self) -> &'static str {
        match self {
            VariableKind::Text => "string",
            VariableKind::List => "list",
            VariableKind::Map => "object",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.script_name())
    }
}
