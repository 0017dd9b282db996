//! Recursive encode/decode between native Rust values and [`ValueTree`].
//!
//! Encoding ([`ToValueTree`]) is total over the supported types. Decoding
//! ([`FromValueTree`]) is partial: a value of the wrong shape yields `None`.
//! The field accessors here never raise; a missing or ill-shaped field
//! degrades to its fallback so one bad field cannot abort a whole record.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value::{Document, ValueTree};
use crate::diagnostics::{Diagnostic, DiagnosticsSink};

/// Native values that have exactly one [`ValueTree`] encoding.
pub trait ToValueTree {
    fn to_value_tree(&self) -> ValueTree;
}

/// Native values that can be read back from a [`ValueTree`] of the right shape.
pub trait FromValueTree: Sized {
    /// Human-readable name of the accepted shape, used in diagnostics.
    const EXPECTED: &'static str;

    fn from_value_tree(value: &ValueTree) -> Option<Self>;
}

/// Encode a native value for storage. Lists and maps are normalized
/// recursively; map keys are coerced to text.
pub fn normalize_for_storage<T: ToValueTree + ?Sized>(value: &T) -> ValueTree {
    value.to_value_tree()
}

/// Decode a stored value into `T`, or `None` if any part has the wrong shape.
pub fn materialize_from_storage<T: FromValueTree>(value: &ValueTree) -> Option<T> {
    T::from_value_tree(value)
}

/// Read `key` as `T`, returning `fallback` when absent or ill-shaped.
pub fn field_value<T: FromValueTree>(doc: &Document, key: impl AsRef<str>, fallback: T) -> T {
    read_field(doc, key.as_ref(), None).unwrap_or(fallback)
}

/// Read `key` as `T`, or `None` when absent or ill-shaped.
pub fn field_value_opt<T: FromValueTree>(doc: &Document, key: impl AsRef<str>) -> Option<T> {
    read_field(doc, key.as_ref(), None)
}

/// Read `key` as a list of `T`.
///
/// Returns `None` when the key is absent or not a list. Elements of the wrong
/// shape are dropped; the remaining elements keep their order.
pub fn list_field<T: FromValueTree>(doc: &Document, key: impl AsRef<str>) -> Option<Vec<T>> {
    read_list(doc, key.as_ref(), None)
}

fn read_field<T: FromValueTree>(
    doc: &Document,
    key: &str,
    sink: Option<&dyn DiagnosticsSink>,
) -> Option<T> {
    let raw = doc.get(key)?;
    let decoded = T::from_value_tree(raw);
    if decoded.is_none() {
        if let Some(sink) = sink {
            sink.report(Diagnostic::ShapeMismatch {
                key: key.to_string(),
                index: None,
                expected: T::EXPECTED,
                found: raw.shape(),
            });
        }
    }
    decoded
}

fn read_list<T: FromValueTree>(
    doc: &Document,
    key: &str,
    sink: Option<&dyn DiagnosticsSink>,
) -> Option<Vec<T>> {
    let raw = doc.get(key)?;
    let Some(items) = raw.as_list() else {
        if let Some(sink) = sink {
            sink.report(Diagnostic::ShapeMismatch {
                key: key.to_string(),
                index: None,
                expected: "list",
                found: raw.shape(),
            });
        }
        return None;
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::from_value_tree(item) {
            Some(value) => out.push(value),
            None => {
                if let Some(sink) = sink {
                    sink.report(Diagnostic::ShapeMismatch {
                        key: key.to_string(),
                        index: Some(index),
                        expected: T::EXPECTED,
                        found: item.shape(),
                    });
                }
            }
        }
    }
    Some(out)
}

/// Field accessors over one document that report every fallback to a
/// [`DiagnosticsSink`] instead of staying silent.
pub struct DocumentReader<'a> {
    doc: &'a Document,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a> DocumentReader<'a> {
    pub fn new(doc: &'a Document, sink: &'a dyn DiagnosticsSink) -> Self {
        Self { doc, sink }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn raw(&self, key: impl AsRef<str>) -> Option<&'a ValueTree> {
        self.doc.get(key.as_ref())
    }

    pub fn get<T: FromValueTree>(&self, key: impl AsRef<str>, fallback: T) -> T {
        read_field(self.doc, key.as_ref(), Some(self.sink)).unwrap_or(fallback)
    }

    pub fn get_opt<T: FromValueTree>(&self, key: impl AsRef<str>) -> Option<T> {
        read_field(self.doc, key.as_ref(), Some(self.sink))
    }

    pub fn list<T: FromValueTree>(&self, key: impl AsRef<str>) -> Option<Vec<T>> {
        read_list(self.doc, key.as_ref(), Some(self.sink))
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl<T: ToValueTree + ?Sized> ToValueTree for &T {
    fn to_value_tree(&self) -> ValueTree {
        (**self).to_value_tree()
    }
}

impl<T: ToValueTree + ?Sized> ToValueTree for Box<T> {
    fn to_value_tree(&self) -> ValueTree {
        (**self).to_value_tree()
    }
}

impl ToValueTree for ValueTree {
    fn to_value_tree(&self) -> ValueTree {
        self.clone()
    }
}

impl ToValueTree for bool {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Boolean(*self)
    }
}

macro_rules! lossless_integer {
    ($($t:ty),*) => {$(
        impl ToValueTree for $t {
            fn to_value_tree(&self) -> ValueTree {
                ValueTree::Integer(i64::from(*self))
            }
        }

        impl FromValueTree for $t {
            const EXPECTED: &'static str = "integer";

            fn from_value_tree(value: &ValueTree) -> Option<Self> {
                value.as_i64().and_then(|i| <$t>::try_from(i).ok())
            }
        }
    )*};
}

// Only widths that fit in a stored i64 both ways; u64 and usize are left out.
lossless_integer!(i8, i16, i32, i64, u8, u16, u32);


impl ToValueTree for f64 {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Float(*self)
    }
}

impl ToValueTree for f32 {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Float(f64::from(*self))
    }
}

impl ToValueTree for str {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Text(self.to_string())
    }
}

impl ToValueTree for String {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Text(self.clone())
    }
}

impl ToValueTree for DateTime<Utc> {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Timestamp(*self)
    }
}

impl ToValueTree for Uuid {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Text(self.hyphenated().to_string())
    }
}

impl<T: ToValueTree> ToValueTree for Option<T> {
    fn to_value_tree(&self) -> ValueTree {
        match self {
            Some(value) => value.to_value_tree(),
            None => ValueTree::Null,
        }
    }
}

impl<T: ToValueTree> ToValueTree for [T] {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::List(self.iter().map(ToValueTree::to_value_tree).collect())
    }
}

impl<T: ToValueTree> ToValueTree for Vec<T> {
    fn to_value_tree(&self) -> ValueTree {
        self.as_slice().to_value_tree()
    }
}

impl<K: Display, V: ToValueTree> ToValueTree for HashMap<K, V> {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_value_tree()))
                .collect(),
        )
    }
}

impl<K: Display, V: ToValueTree> ToValueTree for BTreeMap<K, V> {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_value_tree()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

impl FromValueTree for ValueTree {
    const EXPECTED: &'static str = "any";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValueTree for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValueTree for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValueTree for f32 {
    const EXPECTED: &'static str = "float";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        let f = value.as_f64()?;
        let narrowed = f as f32;
        // A finite value outside f32's range is a mismatch, not infinity.
        (narrowed.is_finite() || !f.is_finite()).then_some(narrowed)
    }
}

impl FromValueTree for String {
    const EXPECTED: &'static str = "text";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

impl FromValueTree for DateTime<Utc> {
    const EXPECTED: &'static str = "timestamp";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value.as_timestamp().copied()
    }
}

impl FromValueTree for Uuid {
    const EXPECTED: &'static str = "uuid text";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value.as_text().and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// `Null` decodes to `Some(None)`; anything else must decode as `T`.
impl<T: FromValueTree> FromValueTree for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        match value {
            ValueTree::Null => Some(None),
            other => T::from_value_tree(other).map(Some),
        }
    }
}

/// Strict: one element of the wrong shape rejects the whole list. Use
/// [`list_field`] for the lenient, element-dropping read.
impl<T: FromValueTree> FromValueTree for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value
            .as_list()?
            .iter()
            .map(T::from_value_tree)
            .collect::<Option<Vec<T>>>()
    }
}

impl<V: FromValueTree> FromValueTree for HashMap<String, V> {
    const EXPECTED: &'static str = "map";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value
            .as_map()?
            .iter()
            .map(|(k, v)| V::from_value_tree(v).map(|v| (k.clone(), v)))
            .collect()
    }
}

impl<V: FromValueTree> FromValueTree for BTreeMap<String, V> {
    const EXPECTED: &'static str = "map";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value
            .as_map()?
            .iter()
            .map(|(k, v)| V::from_value_tree(v).map(|v| (k.clone(), v)))
            .collect()
    }
}

/// Helper for map keys that are not plain strings but round-trip through
/// `Display`/`FromStr` (player ids, numeric slots).
pub fn materialize_keyed<K, V>(value: &ValueTree) -> Option<HashMap<K, V>>
where
    K: std::str::FromStr + Eq + Hash,
    V: FromValueTree,
{
    value
        .as_map()?
        .iter()
        .map(|(k, v)| Some((k.parse().ok()?, V::from_value_tree(v)?)))
        .collect()
}
