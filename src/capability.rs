use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::graph::HttpVerb;

/// The transport could not complete a request: connect failure, timeout,
/// protocol error. Carries a human-readable description for the metric record.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The sole I/O boundary of the harness: perform one HTTP request and hand
/// back the status code, or a [`TransportError`] when no response arrived.
///
/// Workers treat this as an opaque, fallible, latency-bearing capability, so
/// tests can swap in a scripted in-memory implementation.
#[async_trait]
pub trait HttpCapability: Send + Sync {
    async fn invoke(
        &self,
        verb: HttpVerb,
        url: &str,
        body: Option<&Map<String, Value>>,
    ) -> Result<u16, TransportError>;
}

/// Production [`HttpCapability`] backed by a shared [`reqwest::Client`].
///
/// NEVER build one of these per worker. The client holds the connection pool
/// and is meant to be shared behind an `Arc`.
pub struct ReqwestCapability {
    client: reqwest::Client,
}

impl ReqwestCapability {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Build a capability whose requests are capped at `timeout`. Timed-out
    /// requests surface as transport failures.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

impl Default for ReqwestCapability {
    fn default() -> Self {
        Self::new()
    }
}

impl From<reqwest::Client> for ReqwestCapability {
    fn from(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpCapability for ReqwestCapability {
    async fn invoke(
        &self,
        verb: HttpVerb,
        url: &str,
        body: Option<&Map<String, Value>>,
    ) -> Result<u16, TransportError> {
        let mut request = match verb {
            HttpVerb::Get => self.client.get(url),
            HttpVerb::Post => self.client.post(url),
            HttpVerb::Put => self.client.put(url),
            HttpVerb::Patch => self.client.patch(url),
            HttpVerb::Delete => self.client.delete(url),
            HttpVerb::Head => self.client.head(url),
        };
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(response.status().as_u16())
    }
}
