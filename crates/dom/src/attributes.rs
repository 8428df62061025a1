//! Element attribute storage.

use indexmap::IndexMap;
use std::sync::Arc;

/// Map of element attributes preserving insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeMap {
    attrs: IndexMap<Arc<str>, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self {
            attrs: IndexMap::new(),
        }
    }

    /// Build from `(name, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.set(name, value);
        }
        map
    }

    /// Set an attribute value, returning the previous one.
    pub fn set(&mut self, name: &str, value: &str) -> Option<String> {
        self.attrs
            .insert(Arc::from(name.to_ascii_lowercase()), value.to_string())
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name.to_ascii_lowercase().as_str())
            .map(|s| s.as_str())
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.attrs.shift_remove(name.to_ascii_lowercase().as_str())
    }

    /// Check if attribute exists.
    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name.to_ascii_lowercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterate over attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}
