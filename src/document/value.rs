//! The canonical document value.
//!
//! Every piece of content a player document can hold is one of the eight
//! [`ValueTree`] variants. Encoding native values into this shape is total;
//! reading them back out is partial and always shape-checked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A key/value map of document content. Key order is irrelevant to equality;
/// the BTreeMap only keeps the encoded form deterministic.
pub type Document = BTreeMap<String, ValueTree>;

/// Tagged-variant value modelling any storable document content.
///
/// Different variants are never equal, even when they carry the "same" value:
/// `Integer(1) != Float(1.0)` and `Text("1") != Integer(1)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ValueTree {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<ValueTree>),
    Map(Document),
}

/// The variant tag of a [`ValueTree`], checked on every decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Null,
    Boolean,
    Integer,
    Float,
    Text,
    Timestamp,
    List,
    Map,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Boolean => "boolean",
            Shape::Integer => "integer",
            Shape::Float => "float",
            Shape::Text => "text",
            Shape::Timestamp => "timestamp",
            Shape::List => "list",
            Shape::Map => "map",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValueTree {
    pub fn shape(&self) -> Shape {
        match self {
            ValueTree::Null => Shape::Null,
            ValueTree::Boolean(_) => Shape::Boolean,
            ValueTree::Integer(_) => Shape::Integer,
            ValueTree::Float(_) => Shape::Float,
            ValueTree::Text(_) => Shape::Text,
            ValueTree::Timestamp(_) => Shape::Timestamp,
            ValueTree::List(_) => Shape::List,
            ValueTree::Map(_) => Shape::Map,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.shape().as_str()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueTree::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueTree::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueTree::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ValueTree::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ValueTree::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            ValueTree::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ValueTree]> {
        match self {
            ValueTree::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Document> {
        match self {
            ValueTree::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Nesting depth of the tree: scalars are 0, an empty list or map is 1.
    pub fn depth(&self) -> usize {
        match self {
            ValueTree::List(items) => 1 + items.iter().map(ValueTree::depth).max().unwrap_or(0),
            ValueTree::Map(map) => 1 + map.values().map(ValueTree::depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}
