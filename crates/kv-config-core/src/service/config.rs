//! Static configuration for a remote key/value source.
//!
//! Options are set once by the host, sanitised at construction, and never
//! mutated afterwards. [`Options::sanitise`] applies the refresh cadence
//! clamp so every source honours the same lower bound.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::namespace::Namespace;
use crate::source::{EmptySource, Source};

/// Minimum refresh interval accepted by the source.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
/// Refresh cadence used when none (or one below the minimum) is configured.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Basic-auth credentials presented to the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    /// Keeps the password out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration values that control a remote key/value source.
#[derive(Clone)]
pub struct Options {
    /// Store address, e.g. `127.0.0.1:8500`. Required unless a client is injected.
    pub address: Option<String>,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// Namespace used to list the store and qualify lookups.
    pub namespace: Namespace,
    /// Delay between the end of one refresh and the start of the next.
    pub refresh_interval: Duration,
    /// Cancelling this token stops refreshing for good. Required.
    pub cancel: Option<CancellationToken>,
    /// Source consulted for keys absent from the remote snapshot.
    pub defaults: Arc<dyn Source>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            address: None,
            credentials: None,
            namespace: Namespace::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cancel: None,
            defaults: Arc::new(EmptySource),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("address", &self.address)
            .field("credentials", &self.credentials)
            .field("namespace", &self.namespace)
            .field("refresh_interval", &self.refresh_interval)
            .field("cancel", &self.cancel.as_ref().map(|_| "<token>"))
            .finish_non_exhaustive()
    }
}

impl Options {
    /// Replaces a refresh interval below [`MIN_REFRESH_INTERVAL`] with the default.
    pub(crate) fn sanitise(mut self) -> Self {
        if self.refresh_interval < MIN_REFRESH_INTERVAL {
            warn!(
                "remote-kv: refresh interval {:?} is below the minimum {:?}; using {:?} instead",
                self.refresh_interval, MIN_REFRESH_INTERVAL, DEFAULT_REFRESH_INTERVAL
            );
            self.refresh_interval = DEFAULT_REFRESH_INTERVAL;
        }
        self
    }

    /// Returns the cancellation token (always present once a source is built).
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }
}
