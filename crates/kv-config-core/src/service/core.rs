//! Remote key/value source facade.
//!
//! This module wires the store client, the shared snapshot, and the refresh
//! loop into the public [`KvConfigSource`] handle. Construction performs one
//! synchronous load, then spawns the background refresh task; afterwards the
//! handle only serves reads, watch registrations, and diagnostics.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::config::Options;
use super::refresh::{run_refresh_loop, SourceShared};
use super::watch::{SnapshotChange, WatchNotifier};
use crate::http::ConsulClient;
use crate::snapshot::Snapshot;
use crate::source::Source;
use crate::status::RefreshStatus;
use crate::store::{StoreClient, StoreError};

/// Error type surfaced when a source cannot be constructed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No cancellation token was supplied, so the refresh task could never stop.
    #[error("remote kv source: cancellation token is missing")]
    MissingCancellation,
    /// No store address was supplied.
    #[error("remote kv source: store address is missing")]
    MissingAddress,
    /// The store client could not be built (malformed address, TLS setup, ...).
    #[error("remote kv source: {0}")]
    Store(#[from] StoreError),
}

/// Result of a single refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A newer snapshot was swapped in.
    Applied {
        /// Version of the snapshot now being served.
        version: u64,
    },
    /// The store answered with a version that is not newer; nothing changed.
    Unchanged,
    /// The store could not be listed; the previous snapshot was kept.
    Failed,
    /// The source was cancelled; no call was made and nothing changed.
    Cancelled,
}

/// Namespace-scoped configuration source backed by a remote key/value store.
///
/// Cloning is cheap and every clone observes the same snapshot. Typed
/// lookups come from [`crate::source::SourceExt`], which is implemented for
/// every [`Source`].
#[derive(Debug, Clone)]
pub struct KvConfigSource {
    /// Shared source internals wrapped in an atomically reference-counted pointer.
    shared: Arc<SourceShared>,
}

impl KvConfigSource {
    /// Builds a Consul-backed source from `options.address` and `options.credentials`.
    ///
    /// Fails when the cancellation token or the address is missing, or when
    /// the address is malformed. An unreachable store is not an error: the
    /// source starts empty and serves defaults until a refresh succeeds.
    pub async fn connect(options: Options) -> Result<Self, SourceError> {
        if options.cancel.is_none() {
            return Err(SourceError::MissingCancellation);
        }
        let address = options
            .address
            .as_deref()
            .ok_or(SourceError::MissingAddress)?;
        let client = ConsulClient::new(address, options.credentials.clone())?;
        Self::with_client(options, Arc::new(client)).await
    }

    /// Builds a source around an already constructed store client.
    ///
    /// Runs the first refresh before returning, then starts the background
    /// refresh loop on the current tokio runtime.
    pub async fn with_client(
        options: Options,
        client: Arc<dyn StoreClient>,
    ) -> Result<Self, SourceError> {
        let cancel = options
            .cancel
            .clone()
            .ok_or(SourceError::MissingCancellation)?;
        let options = options.sanitise();
        let shared = Arc::new(SourceShared {
            client,
            options,
            snapshot: ArcSwapOption::empty(),
            notifier: WatchNotifier::new(),
            status: RefreshStatus::new(),
            cancel: cancel.clone(),
            refresh_lock: Mutex::new(()),
        });

        // Start with a full set of values, then let the loop take over.
        let initial = shared.initial_load().await;
        debug!(
            "remote-kv: initial load of namespace {} finished: {initial:?}",
            shared.options.namespace
        );
        tokio::spawn(run_refresh_loop(Arc::downgrade(&shared), cancel));

        Ok(Self { shared })
    }

    /// Returns the immutable configuration this source was built with.
    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    /// Registers the change callback, replacing any earlier one.
    ///
    /// The callback runs on the refresh task right after a refresh swaps in
    /// a newer snapshot (never for the construction-time load) and receives
    /// a view of the source already serving that snapshot. A slow callback
    /// delays the next refresh.
    pub fn watch<F>(&self, callback: F)
    where
        F: Fn(&dyn Source) + Send + Sync + 'static,
    {
        self.shared.notifier.set_callback(Arc::new(callback));
    }

    /// Subscribes to snapshot changes; each receiver sees every later change.
    ///
    /// Follows the same firing rule as [`KvConfigSource::watch`]. A receiver
    /// that falls more than a few events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotChange> {
        self.shared.notifier.subscribe()
    }

    /// Returns the snapshot currently served, for consistent multi-key reads.
    ///
    /// Before the first successful load this is an empty snapshot at version 0.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.snapshot.load_full().unwrap_or_default()
    }

    /// Returns the version of the snapshot currently served (0 before the first load).
    pub fn version(&self) -> u64 {
        self.shared.version()
    }

    /// Returns a handle exposing refresh health (failure streak, last error, last success).
    pub fn status(&self) -> Arc<RefreshStatus> {
        self.shared.status.clone()
    }

    /// Returns true once the cancellation token fired; the snapshot is frozen from then on.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Performs a refresh immediately, outside the regular schedule.
    ///
    /// Follows the same rules as a scheduled refresh, including notifying
    /// watchers, and is serialised with the background loop.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }
}

impl Source for KvConfigSource {
    fn raw(&self, key: &str) -> Option<String> {
        self.shared.raw(key)
    }

    fn defaults(&self) -> Option<&dyn Source> {
        self.shared.defaults()
    }
}
