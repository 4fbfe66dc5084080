//! Configuration source abstraction and the simple in-process sources.
//!
//! A [`Source`] only has to answer one question: "what raw text is stored
//! under this key, if any?". Typed access is layered on top by
//! [`SourceExt`], which trims the raw text, parses it through
//! [`ConfigValue`], and falls back to the source's defaults when the key is
//! absent. A key that is present but unparseable is reported as `None`
//! without consulting the defaults.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::value::ConfigValue;

/// Raw key/value provider consulted by the typed accessors.
pub trait Source: Send + Sync {
    /// Returns the untrimmed value stored under `key`, or `None` when absent.
    fn raw(&self, key: &str) -> Option<String>;

    /// Returns the source consulted when `key` is absent from this one.
    fn defaults(&self) -> Option<&dyn Source> {
        None
    }
}

/// Typed accessors available on every [`Source`], including `dyn Source`.
///
/// Each accessor returns `Some(value)` when the key resolved and parsed, and
/// `None` otherwise.
pub trait SourceExt: Source {
    /// Resolves `key` and parses it as `T`.
    fn get<T: ConfigValue>(&self, key: &str) -> Option<T> {
        match self.raw(key) {
            Some(raw) => T::from_raw(raw.trim()),
            None => self.defaults().and_then(|defaults| defaults.get::<T>(key)),
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    /// Comma separated list with items trimmed and empty items dropped.
    fn string_slice(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
    }

    fn int(&self, key: &str) -> Option<isize> {
        self.get(key)
    }

    fn int8(&self, key: &str) -> Option<i8> {
        self.get(key)
    }

    fn int16(&self, key: &str) -> Option<i16> {
        self.get(key)
    }

    fn int32(&self, key: &str) -> Option<i32> {
        self.get(key)
    }

    fn int64(&self, key: &str) -> Option<i64> {
        self.get(key)
    }

    fn uint(&self, key: &str) -> Option<usize> {
        self.get(key)
    }

    fn uint8(&self, key: &str) -> Option<u8> {
        self.get(key)
    }

    fn uint16(&self, key: &str) -> Option<u16> {
        self.get(key)
    }

    fn uint32(&self, key: &str) -> Option<u32> {
        self.get(key)
    }

    fn uint64(&self, key: &str) -> Option<u64> {
        self.get(key)
    }

    fn float32(&self, key: &str) -> Option<f32> {
        self.get(key)
    }

    fn float64(&self, key: &str) -> Option<f64> {
        self.get(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.get(key)
    }

    fn duration(&self, key: &str) -> Option<Duration> {
        self.get(key)
    }

    fn time(&self, key: &str) -> Option<OffsetDateTime> {
        self.get(key)
    }
}

impl<S: Source + ?Sized> SourceExt for S {}

/// Source that never holds any value. Used when no defaults are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl Source for EmptySource {
    fn raw(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Fixed in-memory source, typically used as the defaults of a remote source.
#[derive(Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
    defaults: Option<Arc<dyn Source>>,
}

impl MapSource {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            defaults: None,
        }
    }

    /// Builds a source from `(key, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Chains another source behind this one for keys it does not hold.
    pub fn with_defaults(mut self, defaults: Arc<dyn Source>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Adds or replaces a single pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl fmt::Debug for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapSource")
            .field("keys", &self.values.len())
            .field("has_defaults", &self.defaults.is_some())
            .finish()
    }
}

impl Source for MapSource {
    fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn defaults(&self) -> Option<&dyn Source> {
        self.defaults.as_deref()
    }
}
