//! Loosely typed per-player settings.
//!
//! Writes accept anything with a [`ToValueTree`] encoding. Type enforcement
//! happens only on read: a missing key and a key stored with the wrong shape
//! both yield the caller's default.

use std::collections::btree_map;

use crate::document::{Document, FromValueTree, ToValueTree, ValueTree};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingStore {
    values: Document,
}

impl SettingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(values: Document) -> Self {
        Self { values }
    }

    pub fn to_document(&self) -> Document {
        self.values.clone()
    }

    /// The stored value, or `default` when absent or of another type.
    pub fn get<T: FromValueTree>(&self, key: &str, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    /// The stored value, or `None` when absent or of another type.
    pub fn get_opt<T: FromValueTree>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(T::from_value_tree)
    }

    /// The stored value without any type check.
    pub fn raw(&self, key: &str) -> Option<&ValueTree> {
        self.values.get(key)
    }

    pub fn set<V: ToValueTree + ?Sized>(&mut self, key: impl Into<String>, value: &V) {
        self.values.insert(key.into(), value.to_value_tree());
    }

    pub fn remove(&mut self, key: &str) -> Option<ValueTree> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ValueTree> {
        self.values.iter()
    }
}
