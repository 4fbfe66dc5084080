//! Immutable point-in-time view of the remote key/value pairs.

use std::collections::HashMap;

use crate::store::KvListing;

/// Map of fully qualified keys to raw (untrimmed) values, tagged with the
/// store version it was built from.
///
/// Snapshots are never edited in place: every applied refresh builds a new
/// one and swaps it in, and old snapshots are dropped once the last reader
/// releases them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: HashMap<String, String>,
    version: u64,
}

impl Snapshot {
    /// Builds a snapshot from already collected pairs.
    pub fn new(values: HashMap<String, String>, version: u64) -> Self {
        Self { values, version }
    }

    /// Builds a snapshot from a store listing. Later duplicates win.
    pub fn from_listing(listing: KvListing) -> Self {
        let KvListing { pairs, version } = listing;
        let values = pairs
            .into_iter()
            .map(|pair| (pair.key, pair.value))
            .collect();
        Self { values, version }
    }

    /// Returns the store version this snapshot was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the raw value stored under the fully qualified `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns true when the fully qualified `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of pairs held by the snapshot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over every `(key, raw value)` pair in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
