//! Origin / tier HTTP client
//!
//! Talks the cache-simulation protocol to L1 nodes and to the origin
//! simulator directly.

use crate::error::{Error, Result};
use crate::protocol::{CacheRequestDirectives, CacheResultSignal};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use tracing::debug;

// =============================================================================
// Fetch Outcome
// =============================================================================

/// What came back from one object fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// HTTP status of the response
    pub http_status: u16,
    /// Decoded cache headers
    pub signal: CacheResultSignal,
    /// Bytes received in the body
    pub body_bytes: u64,
}

// =============================================================================
// ObjectFetcher Trait (Port)
// =============================================================================

/// Seam between the replay engine and the network
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch one object from the node at `endpoint`
    async fn fetch(
        &self,
        endpoint: &str,
        object_id: &str,
        size_bytes: u64,
        directives: &CacheRequestDirectives,
    ) -> Result<FetchOutcome>;
}

// =============================================================================
// Origin Client
// =============================================================================

/// HTTP client for the origin endpoints
#[derive(Debug, Clone)]
pub struct OriginClient {
    http: Client,
}

impl OriginClient {
    /// Create a client keeping up to `max_idle_per_host` pooled connections
    pub fn new(max_idle_per_host: usize) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(max_idle_per_host)
            .build()?;
        Ok(Self { http })
    }

    /// `GET /origin`
    pub async fn hello(&self, endpoint: &str) -> Result<String> {
        let response = self.http.get(format!("{}/origin", endpoint)).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::Protocol(format!(
                "unexpected status {} from {}",
                response.status(),
                endpoint
            )));
        }
        Ok(response.text().await?)
    }

    /// `GET /origin/objects/{id}?size=N` with cache directives
    pub async fn get_object(
        &self,
        endpoint: &str,
        object_id: &str,
        size_bytes: u64,
        directives: &CacheRequestDirectives,
    ) -> Result<FetchOutcome> {
        let url = object_url(endpoint, "objects", object_id, size_bytes);
        self.send(Method::GET, url, Some(directives)).await
    }

    /// `GET /origin/objects/enforce-l2/{id}?size=N`
    pub async fn enforce_l2(
        &self,
        endpoint: &str,
        object_id: &str,
        size_bytes: u64,
    ) -> Result<FetchOutcome> {
        let url = object_url(endpoint, "objects/enforce-l2", object_id, size_bytes);
        self.send(Method::GET, url, None).await
    }

    /// `PURGE /origin/objects/{id}?size=N`
    ///
    /// Tier nodes may honor purges; the origin simulator has no route for
    /// this method and answers 405.
    pub async fn purge_object(
        &self,
        endpoint: &str,
        object_id: &str,
        size_bytes: u64,
    ) -> Result<FetchOutcome> {
        let method = Method::from_bytes(b"PURGE")
            .map_err(|e| Error::Internal(format!("PURGE method: {}", e)))?;
        let url = object_url(endpoint, "objects", object_id, size_bytes);
        self.send(method, url, None).await
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        directives: Option<&CacheRequestDirectives>,
    ) -> Result<FetchOutcome> {
        let mut request = self.http.request(method, &url);
        if let Some(directives) = directives {
            for (name, value) in directives.to_headers() {
                request = request.header(name, value);
            }
        }

        let response = request.send().await?;
        let http_status = response.status().as_u16();
        let signal =
            CacheResultSignal::from_headers(|name| response.headers().get(name).and_then(|v| v.to_str().ok()));
        let body_bytes = response.bytes().await?.len() as u64;

        debug!(url = %url, http_status, body_bytes, "Received response");

        Ok(FetchOutcome {
            http_status,
            signal,
            body_bytes,
        })
    }
}

#[async_trait]
impl ObjectFetcher for OriginClient {
    async fn fetch(
        &self,
        endpoint: &str,
        object_id: &str,
        size_bytes: u64,
        directives: &CacheRequestDirectives,
    ) -> Result<FetchOutcome> {
        self.get_object(endpoint, object_id, size_bytes, directives)
            .await
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Build an object URL; the id is percent-encoded into one path segment
fn object_url(endpoint: &str, route: &str, object_id: &str, size_bytes: u64) -> String {
    format!(
        "{}/origin/{}/{}?size={}",
        endpoint.trim_end_matches('/'),
        route,
        urlencoding::encode(object_id),
        size_bytes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::{OriginConfig, OriginServer, ENFORCED_L2_BODY, ORIGIN_GREETING};
    use crate::protocol::{CacheNode, CacheStatus};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn_origin() -> (Arc<OriginServer>, String) {
        let server = Arc::new(OriginServer::new(OriginConfig::default()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(listener).await });
        (server, endpoint)
    }

    #[test]
    fn test_object_url_encoding() {
        assert_eq!(
            object_url("http://n1:80/", "objects", "a b/c", 7),
            "http://n1:80/origin/objects/a%20b%2Fc?size=7"
        );
        assert_eq!(
            object_url("http://n1:80", "objects/enforce-l2", "obj", 0),
            "http://n1:80/origin/objects/enforce-l2/obj?size=0"
        );
    }

    #[tokio::test]
    async fn test_hello_and_get_object() {
        let (server, endpoint) = spawn_origin().await;
        let client = OriginClient::new(2).unwrap();

        assert_eq!(client.hello(&endpoint).await.unwrap(), ORIGIN_GREETING);

        let directives = CacheRequestDirectives::store_all(1);
        let outcome = client
            .get_object(&endpoint, "obj-A", 100, &directives)
            .await
            .unwrap();
        assert_eq!(outcome.http_status, 200);
        assert_eq!(outcome.body_bytes, 100);
        assert_eq!(outcome.signal.status, CacheStatus::Miss);
        assert_eq!(outcome.signal.node, CacheNode::Origin);
        assert!(outcome.signal.l1_store);
        assert!(outcome.signal.l2_store);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_enforce_then_get() {
        let (server, endpoint) = spawn_origin().await;
        let client = OriginClient::new(2).unwrap();
        let no_l2 = CacheRequestDirectives {
            l1_store: true,
            l2_store: false,
            l2_target: 0,
        };

        let enforced = client.enforce_l2(&endpoint, "obj-B", 10).await.unwrap();
        assert_eq!(enforced.http_status, 200);
        assert_eq!(enforced.body_bytes, ENFORCED_L2_BODY.len() as u64);
        assert!(enforced.signal.l2_store);

        let first = client.fetch(&endpoint, "obj-B", 10, &no_l2).await.unwrap();
        assert!(first.signal.l2_store);
        let second = client.fetch(&endpoint, "obj-B", 10, &no_l2).await.unwrap();
        assert!(!second.signal.l2_store);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_purge_is_not_routed_by_origin() {
        let (server, endpoint) = spawn_origin().await;
        let client = OriginClient::new(1).unwrap();

        let outcome = client.purge_object(&endpoint, "obj-C", 1).await.unwrap();
        assert_eq!(outcome.http_status, 405);
        assert_eq!(outcome.signal.status, CacheStatus::Unknown);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = OriginClient::new(1).unwrap();
        let result = client
            .get_object(&endpoint, "obj", 1, &CacheRequestDirectives::default())
            .await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
