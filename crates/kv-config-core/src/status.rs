//! Refresh health tracking for embedders.
//!
//! Refresh failures are never surfaced through lookups; the source keeps
//! serving the last good snapshot. This status handle lets a host notice
//! that the snapshot is going stale (consecutive failures, last error, time
//! of the last successful load) without changing that contract.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use time::OffsetDateTime;

/// Tracks the outcome of recent refreshes.
#[derive(Debug, Default)]
pub struct RefreshStatus {
    consecutive_failures: AtomicU64,
    total_failures: AtomicU64,
    applied_refreshes: AtomicU64,
    last_error: RwLock<Option<String>>,
    last_success: RwLock<Option<OffsetDateTime>>,
}

impl RefreshStatus {
    /// Creates a reference-counted status handle with no recorded refreshes.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of failed refreshes since the last successful one.
    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Number of failed refreshes over the source's lifetime.
    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    /// Number of refreshes that swapped in a new snapshot.
    pub fn applied_refreshes(&self) -> u64 {
        self.applied_refreshes.load(Ordering::Relaxed)
    }

    /// Returns the last refresh error message (if any).
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().ok().and_then(|guard| guard.clone())
    }

    /// Returns when the store last answered successfully.
    pub fn last_success(&self) -> Option<OffsetDateTime> {
        self.last_success.read().ok().and_then(|guard| *guard)
    }

    /// Records a failed listing.
    pub(crate) fn record_failure(&self, error: String) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_error.write() {
            *guard = Some(error);
        }
    }

    /// Records a successful listing; `applied` is true when the snapshot changed.
    pub(crate) fn record_success(&self, applied: bool) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if applied {
            self.applied_refreshes.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut guard) = self.last_success.write() {
            *guard = Some(OffsetDateTime::now_utc());
        }
    }

    /// Returns a point-in-time copy suitable for logging or exporting.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            consecutive_failures: self.consecutive_failures(),
            total_failures: self.total_failures(),
            applied_refreshes: self.applied_refreshes(),
            last_error: self.last_error(),
            last_success: self.last_success(),
        }
    }
}

/// Plain data representation of [`RefreshStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub consecutive_failures: u64,
    pub total_failures: u64,
    pub applied_refreshes: u64,
    pub last_error: Option<String>,
    pub last_success: Option<OffsetDateTime>,
}

impl StatusSnapshot {
    /// True once the store has answered at least once and the latest attempt did not fail.
    pub fn is_healthy(&self) -> bool {
        self.last_success.is_some() && self.consecutive_failures == 0
    }
}
