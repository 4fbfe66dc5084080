//! Remote key/value source module facade.
//!
//! This module re-exports the public source API while wiring the
//! submodules that implement configuration, the refresh loop, and change
//! notification.

pub(crate) mod config;
mod core;
pub(crate) mod refresh;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod watch;

pub use config::{Credentials, Options, DEFAULT_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL};
pub use self::core::*;
pub use watch::{SnapshotChange, WatchCallback};
