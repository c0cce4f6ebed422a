//! The page-wide variable store.

use indexmap::IndexMap;
use pf_types::normalize_variable_name;

/// Normalized variable name → current value, shared by every step on a page.
///
/// Keys are normalized on every access so `Name `, `{NAME}` and `name` address the same entry.
/// Writes overwrite: whichever input was edited last determines the value used everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    values: IndexMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&normalize_variable_name(name)).map(String::as_str)
    }

    /// Stores `value` under the normalized `name`. Names that normalize to nothing are ignored
    /// and `false` is returned.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        let key = normalize_variable_name(name);
        if key.is_empty() {
            return false;
        }
        self.values.insert(key, value.into());
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.shift_remove(&normalize_variable_name(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for VariableStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut store = Self::new();
        for (name, value) in iter {
            store.set(name.as_ref(), value);
        }
        store
    }
}
