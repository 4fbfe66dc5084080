//! Shared fixtures and utilities for source tests.
//!
//! Consolidating these helpers keeps the test module focused on its
//! assertions: an in-memory store whose contents, index, and availability
//! can be scripted, plus builders for sources wired to it.

#![cfg(test)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{KvConfigSource, Options};
use crate::namespace::Namespace;
use crate::source::Source;
use crate::store::{KvListing, KvPair, StoreClient, StoreError};

/// Refresh interval used by timing-sensitive tests (paused clock).
pub(crate) const TEST_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Pairs seeded into every fixture store, mirroring a store shared by several services.
pub(crate) const SEED_PAIRS: &[(&str, &str)] = &[
    ("NO_NAMESPACE_STRING", "hello"),
    ("NO_NAMESPACE_INT", "42"),
    ("FOO/EMPTY", ""),
    ("FOO/HTTP_HOST", "foo.example.com"),
    ("FOO/HTTP_PORT", "1234"),
    ("FOO/FLOAT", "12.345"),
    ("FOO/BOOL_TRUE", "true"),
    ("FOO/BOOL_TRUE_UPPER", "TRUE"),
    ("FOO/BOOL_FALSE", "false"),
    ("FOO/LABELS", "a, b,   c ,d "),
    ("FOO/DURATION_1", "5m3s"),
    ("FOO/DURATION_2", "12h"),
    ("FOO/DATE", "2019-12-25"),
    ("FOO/DATE_TIME", "2019-12-25T12:00:05.0Z"),
    ("BAR/HTTP_HOST", "bar.example.com"),
];

#[derive(Debug, Default)]
struct FakeState {
    pairs: BTreeMap<String, String>,
    index: u64,
    failing: bool,
}

/// Scripted in-memory store. Every write bumps the index like Consul does.
#[derive(Debug, Default)]
pub(crate) struct FakeStore {
    state: Mutex<FakeState>,
    calls: AtomicUsize,
}

impl FakeStore {
    /// Creates a store holding [`SEED_PAIRS`] at index 1.
    pub(crate) fn seeded() -> Arc<Self> {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for (key, value) in SEED_PAIRS {
                state.pairs.insert((*key).to_owned(), (*value).to_owned());
            }
            state.index = 1;
        }
        Arc::new(store)
    }

    /// Writes a pair and bumps the index.
    pub(crate) fn set(&self, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.pairs.insert(key.to_owned(), value.to_owned());
        state.index += 1;
    }

    /// Overrides the index reported by listings (to simulate stale replicas).
    pub(crate) fn set_index(&self, index: u64) {
        self.state.lock().unwrap().index = index;
    }

    /// Makes every listing fail until reset.
    pub(crate) fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Number of listings served (including failed ones).
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn list(&self, prefix: &str) -> Result<KvListing, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(StoreError::Status(503));
        }
        Ok(KvListing {
            pairs: state
                .pairs
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, value)| KvPair::new(key.clone(), value.clone()))
                .collect(),
            version: state.index,
        })
    }
}

/// Store whose listings never complete.
#[derive(Debug, Default)]
pub(crate) struct HangingStore;

#[async_trait]
impl StoreClient for HangingStore {
    async fn list(&self, _prefix: &str) -> Result<KvListing, StoreError> {
        std::future::pending().await
    }
}

/// Options for namespace `FOO/` with the test cadence and a fresh token.
pub(crate) fn test_options(cancel: &CancellationToken) -> Options {
    Options {
        namespace: Namespace::new("FOO", "/"),
        refresh_interval: TEST_REFRESH_INTERVAL,
        cancel: Some(cancel.clone()),
        ..Default::default()
    }
}

/// Builds a source over `store` with [`test_options`] and `defaults`.
pub(crate) async fn build_source(
    store: Arc<FakeStore>,
    defaults: Option<Arc<dyn Source>>,
) -> (KvConfigSource, CancellationToken) {
    let cancel = CancellationToken::new();
    let mut options = test_options(&cancel);
    if let Some(defaults) = defaults {
        options.defaults = defaults;
    }
    let source = KvConfigSource::with_client(options, store)
        .await
        .expect("source construction");
    (source, cancel)
}

/// Advances the paused clock by one refresh interval plus a margin, letting the loop run.
pub(crate) async fn advance_one_interval() {
    tokio::time::sleep(TEST_REFRESH_INTERVAL + Duration::from_millis(500)).await;
}
