//! Public entry points for the kv-config core crate.
//!
//! The crate exposes a namespace-scoped configuration source that keeps an
//! immutable snapshot of a Consul key/value prefix in memory, refreshes it on
//! a fixed cadence, and serves typed lookups with a defaults fallback. The
//! re-exports below let host applications embed the source without digging
//! into the internal module layout.

pub mod coerce;
pub mod http;
pub mod namespace;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod status;
pub mod store;
pub mod value;

pub use http::ConsulClient;
pub use namespace::Namespace;
pub use service::{
    Credentials, KvConfigSource, Options, RefreshOutcome, SnapshotChange, SourceError,
    WatchCallback, DEFAULT_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL,
};
pub use snapshot::Snapshot;
pub use source::{EmptySource, MapSource, Source, SourceExt};
pub use status::{RefreshStatus, StatusSnapshot};
pub use store::{KvListing, KvPair, StoreClient, StoreError};
pub use value::ConfigValue;
