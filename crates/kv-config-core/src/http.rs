//! Consul KV HTTP client.
//!
//! Implements [`StoreClient`] on top of the Consul HTTP API: a recursive
//! `GET /v1/kv/<prefix>` returns every pair under the prefix as JSON with
//! base64 encoded values, and the `X-Consul-Index` response header carries
//! the store's modification index used as the snapshot version.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::service::Credentials;
use crate::store::{KvListing, KvPair, StoreClient, StoreError};

/// Path prefix of the key/value endpoint.
const KV_ENDPOINT: &str = "/v1/kv/";
/// Response header carrying the store modification index.
const INDEX_HEADER: &str = "X-Consul-Index";
/// Scheme assumed when the address has none (matches the Consul CLI).
const DEFAULT_SCHEME: &str = "http";

/// Base64 decoding for Consul's nullable `Value` field.
mod serde_base64_option {
    use base64::Engine;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        opt.map(|s| {
            base64::engine::general_purpose::STANDARD
                .decode(s.as_bytes())
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

/// Wire representation of one entry in a Consul KV listing.
#[derive(Debug, Deserialize)]
struct KvEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value", default, with = "serde_base64_option")]
    value: Option<Vec<u8>>,
}

impl From<KvEntry> for KvPair {
    fn from(entry: KvEntry) -> Self {
        let value = match entry.value.map(String::from_utf8) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                debug!(
                    "remote-kv: value of {:?} is not valid UTF-8, replacing invalid bytes: {err}",
                    entry.key
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
            None => String::new(),
        };
        KvPair {
            key: entry.key,
            value,
        }
    }
}

/// HTTP client for a single Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulClient {
    /// Underlying HTTP client (shared across requests).
    client: Client,
    /// Normalised agent URL (scheme + authority).
    base_url: Url,
    /// Optional basic-auth credentials.
    credentials: Option<Credentials>,
}

impl ConsulClient {
    /// Builds a client for `address`, e.g. `127.0.0.1:8500` or `https://consul.internal`.
    ///
    /// No connection is attempted: an unreachable agent only shows up as a
    /// transport error on the first listing.
    pub fn new(address: &str, credentials: Option<Credentials>) -> Result<Self, StoreError> {
        let base_url = parse_address(address)?;
        let client = Client::builder().build().map_err(StoreError::Client)?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Returns the normalised agent URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the recursive listing URL for `prefix`.
    fn listing_url(&self, prefix: &str) -> Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(&format!("{}{}", KV_ENDPOINT, prefix.trim_start_matches('/')))
            .map_err(|err| StoreError::InvalidAddress {
                address: self.base_url.to_string(),
                reason: err.to_string(),
            })?;
        url.query_pairs_mut().append_pair("recurse", "true");
        Ok(url)
    }
}

#[async_trait]
impl StoreClient for ConsulClient {
    async fn list(&self, prefix: &str) -> Result<KvListing, StoreError> {
        let url = self.listing_url(prefix)?;
        let mut request = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(StoreError::Status(status.as_u16()));
        }
        let version = parse_index(response.headers())?;

        // Consul answers 404 when nothing lives under the prefix yet.
        if status == StatusCode::NOT_FOUND {
            debug!("remote-kv: prefix {prefix:?} is empty at index {version}");
            return Ok(KvListing {
                pairs: Vec::new(),
                version,
            });
        }

        let bytes = response.bytes().await?;
        let entries: Vec<KvEntry> = serde_json::from_slice(&bytes)?;
        Ok(KvListing {
            pairs: entries.into_iter().map(KvPair::from).collect(),
            version,
        })
    }
}

/// Normalises a Consul address into a base URL.
///
/// Addresses without a scheme get `http://`; anything other than `http` or
/// `https` is rejected.
fn parse_address(address: &str) -> Result<Url, StoreError> {
    let invalid = |reason: String| StoreError::InvalidAddress {
        address: address.to_owned(),
        reason,
    };
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(invalid("address is empty".into()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("{DEFAULT_SCHEME}://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other:?}"))),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("address has no host".into()));
    }
    Ok(url)
}

/// Extracts the modification index from the response headers.
fn parse_index(headers: &HeaderMap) -> Result<u64, StoreError> {
    let raw = headers
        .get(INDEX_HEADER)
        .ok_or_else(|| StoreError::InvalidIndex(format!("missing {INDEX_HEADER} header")))?;
    raw.to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .ok_or_else(|| StoreError::InvalidIndex(format!("{raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tracing_test::traced_test;

    #[test]
    fn parse_address_adds_default_scheme() {
        let url = parse_address("127.0.0.1:8500").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8500/");
        let url = parse_address("https://consul.internal").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn parse_address_accepts_bare_hostnames() {
        // Unresolvable hosts are a runtime concern, not a construction error.
        assert!(parse_address("asldjfaslkdjf").is_ok());
    }

    #[test]
    fn parse_address_rejects_malformed_input() {
        for address in [
            "",
            "   ",
            "ftp://moo.:random-junk-host:12938129381",
            "unix:///var/run/consul.sock",
            "http://",
            "127.0.0.1:99999999",
        ] {
            let err = parse_address(address).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidAddress { .. }),
                "{address:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn listing_url_targets_recursive_kv_endpoint() {
        let client = ConsulClient::new("127.0.0.1:8500", None).unwrap();
        assert_eq!(
            client.listing_url("FOO").unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/FOO?recurse=true"
        );
        assert_eq!(
            client.listing_url("").unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/?recurse=true"
        );
    }

    #[tokio::test]
    /// Decodes base64 values, null values, and the index header from a listing.
    async fn list_decodes_consul_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/kv/FOO")
            .match_query(Matcher::UrlEncoded("recurse".into(), "true".into()))
            .with_status(200)
            .with_header("X-Consul-Index", "17")
            .with_header("Content-Type", "application/json")
            .with_body(
                r#"[
                    {"Key":"FOO/HTTP_HOST","Value":"Zm9vLmV4YW1wbGUuY29t","ModifyIndex":17,"Flags":0},
                    {"Key":"FOO/EMPTY","Value":null,"ModifyIndex":3,"Flags":0}
                ]"#,
            )
            .create_async()
            .await;

        let client = ConsulClient::new(&server.url(), None).unwrap();
        let listing = client.list("FOO").await.unwrap();
        mock.assert_async().await;

        assert_eq!(listing.version, 17);
        assert_eq!(
            listing.pairs,
            vec![
                KvPair::new("FOO/HTTP_HOST", "foo.example.com"),
                KvPair::new("FOO/EMPTY", ""),
            ]
        );
    }

    #[tokio::test]
    /// A 404 means the prefix is empty, not that the request failed.
    async fn list_treats_not_found_as_empty_prefix() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/kv/FOO")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("X-Consul-Index", "9")
            .create_async()
            .await;

        let client = ConsulClient::new(&server.url(), None).unwrap();
        let listing = client.list("FOO").await.unwrap();
        assert!(listing.pairs.is_empty());
        assert_eq!(listing.version, 9);
    }

    #[tokio::test]
    /// Basic-auth credentials are attached to every listing request.
    async fn list_sends_basic_auth_credentials() {
        let mut server = Server::new_async().await;
        // base64("hello:world")
        let mock = server
            .mock("GET", "/v1/kv/FOO")
            .match_query(Matcher::Any)
            .match_header("authorization", "Basic aGVsbG86d29ybGQ=")
            .with_status(200)
            .with_header("X-Consul-Index", "1")
            .with_body("[]")
            .create_async()
            .await;

        let credentials = Credentials::new("hello", "world");
        let client = ConsulClient::new(&server.url(), Some(credentials)).unwrap();
        client.list("FOO").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    /// Server errors and malformed index headers surface as typed errors.
    async fn list_reports_status_and_index_errors() {
        let mut server = Server::new_async().await;
        let _unavailable = server
            .mock("GET", "/v1/kv/DOWN")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_header("X-Consul-Index", "4")
            .create_async()
            .await;
        let _no_index = server
            .mock("GET", "/v1/kv/NOINDEX")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _bad_body = server
            .mock("GET", "/v1/kv/GARBLED")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("X-Consul-Index", "5")
            .with_body("not json")
            .create_async()
            .await;

        let client = ConsulClient::new(&server.url(), None).unwrap();
        assert!(matches!(
            client.list("DOWN").await,
            Err(StoreError::Status(503))
        ));
        assert!(matches!(
            client.list("NOINDEX").await,
            Err(StoreError::InvalidIndex(_))
        ));
        assert!(matches!(
            client.list("GARBLED").await,
            Err(StoreError::Decode(_))
        ));
    }

    #[tokio::test]
    /// A failing agent is reported by status even when it omits the index header.
    async fn list_reports_status_before_missing_index() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/kv/FOO")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = ConsulClient::new(&server.url(), None).unwrap();
        let err = client.list("FOO").await.unwrap_err();
        assert!(matches!(err, StoreError::Status(500)), "got {err:?}");
        assert_eq!(err.to_string(), "unexpected store response status: 500");
    }

    #[tokio::test]
    #[traced_test]
    /// Values that are not UTF-8 are decoded lossily and the replacement is logged.
    async fn list_logs_lossy_value_decoding() {
        let mut server = Server::new_async().await;
        // "/w==" is the single byte 0xFF.
        let _mock = server
            .mock("GET", "/v1/kv/FOO")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("X-Consul-Index", "3")
            .with_body(r#"[{"Key":"FOO/BLOB","Value":"/w=="},{"Key":"FOO/HTTP_HOST","Value":"Zm9vLmV4YW1wbGUuY29t"}]"#)
            .create_async()
            .await;

        let client = ConsulClient::new(&server.url(), None).unwrap();
        let listing = client.list("FOO").await.unwrap();
        assert_eq!(
            listing.pairs,
            vec![
                KvPair::new("FOO/BLOB", "\u{fffd}"),
                KvPair::new("FOO/HTTP_HOST", "foo.example.com"),
            ]
        );
        assert!(logs_contain("\"FOO/BLOB\" is not valid UTF-8"));
    }

    #[tokio::test]
    /// Connection failures are reported as transport errors.
    async fn list_reports_transport_errors() {
        // Port 9 (discard) on loopback is closed in test environments.
        let client = ConsulClient::new("127.0.0.1:9", None).unwrap();
        assert!(matches!(
            client.list("FOO").await,
            Err(StoreError::Transport(_))
        ));
    }
}
