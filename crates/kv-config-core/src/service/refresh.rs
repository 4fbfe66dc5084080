//! Refresh loop orchestration.
//!
//! This module hosts the shared source internals: the current snapshot, the
//! store client, and the notifier. It implements the single refresh step
//! (list, compare versions, swap, notify) and the background loop that
//! repeats it until cancellation. The public facade in `core.rs` delegates
//! to these helpers.

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::Options;
use super::watch::{SnapshotChange, WatchNotifier};
use super::RefreshOutcome;
use crate::snapshot::Snapshot;
use crate::source::Source;
use crate::status::RefreshStatus;
use crate::store::StoreClient;

/// Shared source internals used by the background task and the public API.
pub(crate) struct SourceShared {
    /// Store client used to list the namespace.
    pub(crate) client: Arc<dyn StoreClient>,
    /// Sanitised, immutable configuration.
    pub(crate) options: Options,
    /// Current snapshot; `None` until the first successful listing.
    pub(crate) snapshot: ArcSwapOption<Snapshot>,
    /// Callback slot and change broadcaster.
    pub(crate) notifier: WatchNotifier,
    /// Health of recent refreshes.
    pub(crate) status: Arc<RefreshStatus>,
    /// Cancellation token copied out of the options.
    pub(crate) cancel: CancellationToken,
    /// Serialises refreshes so the version check and the swap act as one step.
    pub(crate) refresh_lock: Mutex<()>,
}

impl fmt::Debug for SourceShared {
    /// Keeps debug output concise by only printing static config details.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceShared")
            .field("options", &self.options)
            .field("version", &self.version())
            .finish()
    }
}

impl SourceShared {
    /// Returns the version of the snapshot currently served (0 before the first load).
    pub(crate) fn version(&self) -> u64 {
        self.snapshot.load().as_deref().map_or(0, Snapshot::version)
    }

    /// Performs one refresh: list the namespace and swap in a newer snapshot.
    ///
    /// Store failures are logged and recorded in the status, never returned;
    /// the previous snapshot stays in place until the next scheduled attempt.
    /// An applied swap notifies watchers, including the first one after a
    /// failed construction-time load.
    pub(crate) async fn refresh(&self) -> RefreshOutcome {
        self.refresh_step(true).await
    }

    /// Performs the construction-time load, which never notifies watchers.
    pub(crate) async fn initial_load(&self) -> RefreshOutcome {
        self.refresh_step(false).await
    }

    async fn refresh_step(&self, notify: bool) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;
        if self.cancel.is_cancelled() {
            return RefreshOutcome::Cancelled;
        }

        let prefix = self.options.namespace.name();
        let listing = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("remote-kv: refresh of {prefix:?} abandoned after cancellation");
                return RefreshOutcome::Cancelled;
            }
            result = self.client.list(prefix) => result,
        };
        let listing = match listing {
            Ok(listing) => listing,
            Err(err) => {
                warn!("remote-kv: failed to list {prefix:?}, keeping previous snapshot: {err}");
                self.status.record_failure(err.to_string());
                return RefreshOutcome::Failed;
            }
        };

        let previous = self.snapshot.load_full();
        let current_version = previous.as_deref().map_or(0, Snapshot::version);
        if listing.version <= current_version {
            debug!(
                "remote-kv: listing of {prefix:?} at index {} is not newer than {current_version}",
                listing.version
            );
            self.status.record_success(false);
            return RefreshOutcome::Unchanged;
        }

        let next = Arc::new(Snapshot::from_listing(listing));
        let version = next.version();
        if self.cancel.is_cancelled() {
            return RefreshOutcome::Cancelled;
        }
        self.snapshot.store(Some(next));
        self.status.record_success(true);
        debug!("remote-kv: applied snapshot of {prefix:?} at index {version}");

        if notify {
            self.notifier.notify(
                self,
                SnapshotChange {
                    previous_version: current_version,
                    version,
                },
            );
        }
        RefreshOutcome::Applied { version }
    }
}

impl Source for SourceShared {
    fn raw(&self, key: &str) -> Option<String> {
        let qualified = self.options.namespace.qualify(key);
        self.snapshot
            .load()
            .as_deref()
            .and_then(|snapshot| snapshot.get(&qualified).map(str::to_owned))
    }

    fn defaults(&self) -> Option<&dyn Source> {
        Some(self.options.defaults.as_ref())
    }
}

/// Runs the periodic refresh loop until `cancel` fires or the source is dropped.
///
/// The timer is re-armed after every refresh, so the first scheduled refresh
/// happens a full interval after the construction-time load.
pub(crate) async fn run_refresh_loop(shared: Weak<SourceShared>, cancel: CancellationToken) {
    let Some(interval) = shared.upgrade().map(|s| s.options.refresh_interval) else {
        return;
    };
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("remote-kv: refresh loop shutting down");
                break;
            }
            _ = sleep(interval) => {}
        }
        let Some(shared) = shared.upgrade() else {
            debug!("remote-kv: source dropped, stopping refresh loop");
            break;
        };
        shared.refresh().await;
    }
}
