//! Change notification for applied snapshot swaps.
//!
//! Two mechanisms share the same firing rule (never for the construction-time
//! load, once per refresh that strictly increased the version):
//! a single overwritable callback slot, invoked inline on the refresh task,
//! and a broadcast stream of [`SnapshotChange`] events with one receiver per
//! subscriber.

use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::source::Source;

/// Buffered change events per subscriber before older ones are reported as lagged.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Callback registered through [`crate::KvConfigSource::watch`].
pub type WatchCallback = Arc<dyn Fn(&dyn Source) + Send + Sync>;

/// Event published after an applied, non-initial snapshot swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotChange {
    /// Version of the snapshot that was replaced.
    pub previous_version: u64,
    /// Version of the snapshot now being served.
    pub version: u64,
}

/// Single callback slot plus the broadcast sender for change subscribers.
pub(crate) struct WatchNotifier {
    callback: RwLock<Option<WatchCallback>>,
    changes: broadcast::Sender<SnapshotChange>,
}

impl fmt::Debug for WatchNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchNotifier")
            .field("has_callback", &self.callback().is_some())
            .field("subscribers", &self.changes.receiver_count())
            .finish()
    }
}

impl WatchNotifier {
    pub(crate) fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            callback: RwLock::new(None),
            changes,
        }
    }

    /// Stores `callback`, silently replacing any earlier registration.
    pub(crate) fn set_callback(&self, callback: WatchCallback) {
        if let Ok(mut guard) = self.callback.write() {
            *guard = Some(callback);
        }
    }

    /// Returns a new receiver for change events published from now on.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SnapshotChange> {
        self.changes.subscribe()
    }

    fn callback(&self) -> Option<WatchCallback> {
        self.callback.read().ok().and_then(|guard| guard.clone())
    }

    /// Publishes `change` to subscribers, then runs the callback inline with `source`.
    ///
    /// The slot lock is released before the callback runs, so the callback may
    /// register a replacement.
    pub(crate) fn notify(&self, source: &dyn Source, change: SnapshotChange) {
        // No subscribers is not an error.
        let _ = self.changes.send(change);
        if let Some(callback) = self.callback() {
            callback(source);
        }
    }
}
