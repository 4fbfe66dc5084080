//! Key qualification for namespace-scoped lookups.
//!
//! Several services usually share one key/value store. A namespace is the
//! prefix (plus delimiter) that carves out the keys belonging to one of them:
//! the refresh loop lists everything under the namespace name, and lookups
//! qualify the caller's short key before consulting the snapshot.

use std::fmt;

/// Delimiter used when no explicit one is configured.
pub const DEFAULT_DELIMITER: &str = "/";

/// Prefix and delimiter pair used to scope keys in a shared store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    name: String,
    delimiter: String,
}

impl Namespace {
    /// Builds a namespace from its name and the delimiter placed between the name and keys.
    pub fn new(name: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: delimiter.into(),
        }
    }

    /// Returns the namespace name, which doubles as the store listing prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the delimiter inserted between the name and a key.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Returns true when the namespace has no name and keys are used verbatim.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Returns the fully qualified store key for `key`.
    pub fn qualify(&self, key: &str) -> String {
        if self.name.is_empty() {
            return key.to_owned();
        }
        let mut qualified =
            String::with_capacity(self.name.len() + self.delimiter.len() + key.len());
        qualified.push_str(&self.name);
        qualified.push_str(&self.delimiter);
        qualified.push_str(key);
        qualified
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new("", DEFAULT_DELIMITER)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str("<root>")
        } else {
            write!(f, "{}{}", self.name, self.delimiter)
        }
    }
}
