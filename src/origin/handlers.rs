//! Origin HTTP Handlers
//!
//! Implements the origin endpoints: greeting, object fetch and forced L2
//! placement.

use super::enforcement::L2EnforcementMap;
use crate::error::{Error, Result};
use crate::protocol::{
    CacheRequestDirectives, CacheResultSignal, HEADER_L2_STORE, ORIGIN_CACHE_CONTROL,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use futures::stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

// =============================================================================
// Constants
// =============================================================================

/// Body of `GET /origin`
pub const ORIGIN_GREETING: &str = "Hello, I'm origin.";

/// Body of a successful enforcement
pub const ENFORCED_L2_BODY: &str = "Enforced L2 Object";

const GET_OBJECT_USAGE: &str = "Usage: /origin/objects/:id?size=<integer>";
const ENFORCE_L2_USAGE: &str = "Usage: /origin/objects/enforce-l2/:id?size=<integer>";

/// Filler byte for object bodies; only the length matters
const FILLER: u8 = b'*';

/// Bodies are streamed in chunks of this size
const FILLER_CHUNK_LEN: usize = 64 * 1024;

static FILLER_CHUNK: [u8; FILLER_CHUNK_LEN] = [FILLER; FILLER_CHUNK_LEN];

// =============================================================================
// Request Types
// =============================================================================

/// `?size=` query; kept as text so bad values get the usage message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SizeQuery {
    #[serde(default)]
    pub size: Option<String>,
}

impl SizeQuery {
    /// Object size as a non-negative integer
    pub fn parse(&self) -> Result<u64> {
        let raw = self.size.as_deref().unwrap_or_default();
        raw.trim()
            .parse::<u64>()
            .map_err(|_| Error::InvalidObjectSize(raw.to_string()))
    }
}

// =============================================================================
// Origin Router
// =============================================================================

/// Origin router builder
pub struct OriginRouter {
    enforcement: Arc<L2EnforcementMap>,
}

impl OriginRouter {
    pub fn new(enforcement: Arc<L2EnforcementMap>) -> Self {
        Self { enforcement }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            enforcement: self.enforcement,
        };

        Router::new()
            .route("/origin", get(say_hello))
            .route("/origin/objects/:id", get(get_object))
            .route("/origin/objects/enforce-l2/:id", get(enforce_l2_object))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    enforcement: Arc<L2EnforcementMap>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Greeting
async fn say_hello() -> impl IntoResponse {
    (StatusCode::OK, ORIGIN_GREETING)
}

/// Serve an object of the requested size
///
/// Pending L2 intents force `X-Cache-L2-Store: True`; otherwise the
/// client's L2 request is echoed back.
async fn get_object(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SizeQuery>,
    headers: HeaderMap,
) -> Response {
    let size = match query.parse() {
        Ok(size) => size,
        Err(e) => {
            debug!(path = "/origin/objects/:id", object_id = %id, error = %e, "Invalid size of object");
            return (StatusCode::BAD_REQUEST, GET_OBJECT_USAGE).into_response();
        }
    };

    let directives =
        CacheRequestDirectives::from_headers(|name| headers.get(name).and_then(|v| v.to_str().ok()));
    let forced = state.enforcement.consume(&id);
    let signal = CacheResultSignal::origin_miss(directives.l1_store, forced || directives.l2_store);

    debug!(
        path = "/origin/objects/:id",
        object_id = %id,
        size,
        l1_store = directives.l1_store,
        l2_store = directives.l2_store,
        l2_target = directives.l2_target,
        forced_l2 = forced,
        "Serving object"
    );

    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, ORIGIN_CACHE_CONTROL.to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        signal.to_headers(),
        filler_body(size),
    )
        .into_response()
}

/// Register a forced L2 placement for the object's next fetch
async fn enforce_l2_object(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SizeQuery>,
) -> Response {
    let size = match query.parse() {
        Ok(size) => size,
        Err(e) => {
            debug!(path = "/origin/objects/enforce-l2/:id", object_id = %id, error = %e, "Invalid size of object");
            return (StatusCode::BAD_REQUEST, ENFORCE_L2_USAGE).into_response();
        }
    };

    let pending = state.enforcement.enforce(&id);
    debug!(
        path = "/origin/objects/enforce-l2/:id",
        object_id = %id,
        size,
        pending,
        "Enforced L2 object"
    );

    (
        StatusCode::OK,
        [(HEADER_L2_STORE, "True")],
        ENFORCED_L2_BODY,
    )
        .into_response()
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Stream `size` filler bytes without holding the object in memory
fn filler_body(size: u64) -> Body {
    let chunk_len = FILLER_CHUNK_LEN as u64;
    let full_chunks = size / chunk_len;
    let tail = (size % chunk_len) as usize;

    let chunks = (0..full_chunks)
        .map(|_| Bytes::from_static(&FILLER_CHUNK))
        .chain((tail > 0).then(|| Bytes::from_static(&FILLER_CHUNK[..tail])))
        .map(Ok::<_, Infallible>);

    Body::from_stream(stream::iter(chunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HEADER_L1_STORE, HEADER_NODE, HEADER_STATUS};
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> (Router, Arc<L2EnforcementMap>) {
        let enforcement = Arc::new(L2EnforcementMap::new());
        (OriginRouter::new(enforcement.clone()).build(), enforcement)
    }

    fn get(uri: &str, l2_store: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(HEADER_L1_STORE, "True")
            .header(HEADER_L2_STORE, l2_store)
            .header("X-Cache-L2-Server", "1")
            .body(Body::empty())
            .unwrap()
    }

    fn header_value<'a>(response: &'a Response, name: &str) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_say_hello() {
        let (router, _) = router();
        let response = router.oneshot(get("/origin", "False")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], ORIGIN_GREETING.as_bytes());
    }

    #[tokio::test]
    async fn test_get_object_filler_and_headers() {
        let (router, _) = router();
        let response = router
            .oneshot(get("/origin/objects/obj-A?size=100", "False"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, "cache-control"), ORIGIN_CACHE_CONTROL);
        assert_eq!(header_value(&response, HEADER_STATUS), "MISS");
        assert_eq!(header_value(&response, HEADER_NODE), "ORIGIN");
        assert_eq!(header_value(&response, HEADER_L1_STORE), "True");
        assert_eq!(header_value(&response, HEADER_L2_STORE), "False");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 100);
        assert!(body.iter().all(|b| *b == FILLER));
    }

    #[tokio::test]
    async fn test_get_object_spans_chunks() {
        let (router, _) = router();
        let size = FILLER_CHUNK_LEN * 2 + 17;
        let response = router
            .oneshot(get(&format!("/origin/objects/obj-F?size={}", size), "False"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, "content-length"), size.to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), size);
        assert!(body.iter().all(|b| *b == FILLER));
    }

    #[tokio::test]
    async fn test_get_object_max_size_is_not_buffered() {
        let (router, enforcement) = router();
        enforcement.enforce("obj-G");

        let response = router
            .oneshot(get("/origin/objects/obj-G?size=18446744073709551615", "False"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, "content-length"), "18446744073709551615");
        assert_eq!(header_value(&response, HEADER_L2_STORE), "True");
        assert!(enforcement.is_empty());
    }

    #[tokio::test]
    async fn test_get_object_bad_size() {
        let (router, enforcement) = router();
        enforcement.enforce("obj-A");

        for uri in [
            "/origin/objects/obj-A",
            "/origin/objects/obj-A?size=abc",
            "/origin/objects/obj-A?size=-5",
        ] {
            let response = router.clone().oneshot(get(uri, "False")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], GET_OBJECT_USAGE.as_bytes());
        }

        // Rejected requests do not consume intents
        assert_eq!(enforcement.pending("obj-A"), 1);
    }

    #[tokio::test]
    async fn test_enforce_then_fetch_reverts() {
        let (router, enforcement) = router();

        let response = router
            .clone()
            .oneshot(get("/origin/objects/enforce-l2/obj-B?size=10", "False"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, HEADER_L2_STORE), "True");
        assert_eq!(enforcement.pending("obj-B"), 1);

        let forced = router
            .clone()
            .oneshot(get("/origin/objects/obj-B?size=10", "False"))
            .await
            .unwrap();
        assert_eq!(header_value(&forced, HEADER_L2_STORE), "True");

        let reverted = router
            .clone()
            .oneshot(get("/origin/objects/obj-B?size=10", "False"))
            .await
            .unwrap();
        assert_eq!(header_value(&reverted, HEADER_L2_STORE), "False");
        assert!(enforcement.is_empty());
    }

    #[tokio::test]
    async fn test_enforcement_cycle_counts() {
        let (router, _) = router();
        let n = 3;

        for _ in 0..n {
            let r = router
                .clone()
                .oneshot(get("/origin/objects/enforce-l2/obj-C?size=1", "False"))
                .await
                .unwrap();
            assert_eq!(r.status(), StatusCode::OK);
        }

        let mut forced = 0;
        for _ in 0..=n {
            let r = router
                .clone()
                .oneshot(get("/origin/objects/obj-C?size=1", "False"))
                .await
                .unwrap();
            if header_value(&r, HEADER_L2_STORE) == "True" {
                forced += 1;
            }
        }
        assert_eq!(forced, n);
    }

    #[tokio::test]
    async fn test_enforce_bad_size_no_state_change() {
        let (router, enforcement) = router();
        let response = router
            .oneshot(get("/origin/objects/enforce-l2/obj-D?size=x", "False"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(enforcement.is_empty());
    }

    #[tokio::test]
    async fn test_pass_through_l2_request() {
        let (router, _) = router();
        let response = router
            .oneshot(get("/origin/objects/obj-E?size=0", "True"))
            .await
            .unwrap();
        assert_eq!(header_value(&response, HEADER_L2_STORE), "True");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_size_query_parse() {
        let q = |s: Option<&str>| SizeQuery {
            size: s.map(str::to_string),
        };
        assert_eq!(q(Some("42")).parse().unwrap(), 42);
        assert!(q(None).parse().is_err());
        assert!(q(Some("")).parse().is_err());
        assert!(q(Some("1.5")).parse().is_err());
    }
}
