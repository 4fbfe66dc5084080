//! Store client seam used by the refresh loop.
//!
//! The refresh loop only needs one capability from the remote store: list
//! every pair under a prefix together with the store's modification index.
//! [`StoreClient`] captures that contract so the Consul HTTP client in
//! [`crate::http`] and in-memory fakes used by tests are interchangeable.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by store clients.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configured address cannot be turned into a usable endpoint.
    #[error("invalid store address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    /// The HTTP client could not be constructed.
    #[error("failed to build store client: {0}")]
    Client(#[source] reqwest::Error),
    /// Transport-level issue (DNS, TLS, connection refused, etc.).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The store answered with an unexpected HTTP status.
    #[error("unexpected store response status: {0}")]
    Status(u16),
    /// The listing payload could not be decoded.
    #[error("failed to decode store listing: {0}")]
    Decode(#[from] serde_json::Error),
    /// The modification index header was missing or not a number.
    #[error("invalid store index: {0}")]
    InvalidIndex(String),
}

/// Single key/value pair as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    /// Fully qualified key.
    pub key: String,
    /// Raw value; no trimming is applied at this layer.
    pub value: String,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of listing a prefix: the pairs plus the store version they reflect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvListing {
    /// Pairs found under the prefix.
    pub pairs: Vec<KvPair>,
    /// Monotonic store index the listing was read at.
    pub version: u64,
}

/// Remote key/value store capable of listing a prefix.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Lists every pair whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<KvListing, StoreError>;
}
