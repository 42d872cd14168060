use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use hoard_cache::{CacheKey, CachePolicy, CacheStore, CachedResponse};
use hoard_config::HoardConfig;
use hoard_http::HttpResponse;
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use tokio::time::Duration;
use tracing::{error, info};
use url::Url;

use crate::error::{BoxError, ProxyError};

mod director;
mod headers;
mod intercept;
pub(crate) mod origin;
mod pipeline;
pub(crate) mod status;

use director::Director;
use intercept::Interceptor;
use origin::{HttpOrigin, Origin};
use pipeline::Pipeline;
use status::CacheStatus;

/// =======================================================
/// CACHING PROXY
/// =======================================================
///
/// Shared by every connection task (`Arc<CachingProxy>`).
///
/// - GET: lookup by normalized key → HIT from the store, or MISS through the
///   forwarding pipeline which stores 2xx responses
/// - anything else: BYPASS, forwarded and never stored
///
/// Concurrent identical MISSes are not coalesced: each one goes to the origin
/// and the last response to arrive is the one kept.
pub struct CachingProxy<O = HttpOrigin> {
    store: Arc<CacheStore>,
    pipeline: Pipeline<O>,
}

impl CachingProxy<HttpOrigin> {
    /// Proxy for the configured origin, using the real HTTP client.
    pub fn from_config(cfg: &HoardConfig, store: Arc<CacheStore>) -> Result<Self, ProxyError> {
        let origin_url = cfg.proxy.origin_url()?;
        let origin = HttpOrigin::new(Duration::from_secs(cfg.proxy.connect_timeout_secs()))?;
        Self::new(&origin_url, origin, store, cfg.proxy.max_response_body_bytes())
    }
}

impl<O: Origin> CachingProxy<O> {
    pub fn new(
        origin_url: &Url,
        origin: O,
        store: Arc<CacheStore>,
        max_body: Option<usize>,
    ) -> Result<Self, ProxyError> {
        let director = Director::new(origin_url)?;
        let interceptor = Interceptor::new(Arc::clone(&store), max_body);

        Ok(Self {
            store,
            pipeline: Pipeline::new(director, interceptor, origin),
        })
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Answers one client request. Always produces a response carrying `X-Cache`.
    pub async fn handle<B>(&self, req: Request<B>, client_addr: Option<SocketAddr>) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        if !CachePolicy::is_cacheable(req.method()) {
            info!(
                target: "hoard::proxy",
                method = %req.method(),
                uri = %req.uri(),
                "Non-GET request, bypassing cache"
            );
            return self.forward(req, None, client_addr, CacheStatus::Bypass).await;
        }

        let key = CacheKey::for_request(&req);

        if let Some(entry) = self.store.get(&key) {
            return serve_hit(&key, entry);
        }

        info!(
            target: "hoard::proxy",
            cache_key = %key,
            "Cache MISS, forwarding to origin"
        );
        self.forward(req, Some(&key), client_addr, CacheStatus::Miss).await
    }

    async fn forward<B>(
        &self,
        req: Request<B>,
        key: Option<&CacheKey>,
        client_addr: Option<SocketAddr>,
        status: CacheStatus,
    ) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let is_head = req.method() == Method::HEAD;
        let req = req.map(|body| body.map_err(Into::<BoxError>::into).boxed_unsync());
        let client_ip = client_addr.map(|addr| addr.ip());

        let mut resp = match self.pipeline.forward(req, key, client_ip).await {
            Ok(resp) => into_client_response(resp, is_head),
            Err(e) => {
                error!(
                    target: "hoard::proxy",
                    cache_key = key.map(CacheKey::as_str),
                    cache_status = %status,
                    error = %e,
                    "Forwarding to origin failed"
                );
                e.to_response()
            }
        };

        status.mark(resp.headers_mut());
        resp
    }
}

/// Rebuilds a response from a stored entry without touching the origin.
fn serve_hit(key: &CacheKey, entry: CachedResponse) -> HttpResponse {
    let mut resp = Response::new(Full::new(entry.body.clone()));
    *resp.status_mut() = entry.status;

    let out = resp.headers_mut();
    headers::copy_replayable(&entry.headers, out);
    headers::set_content_length(out, entry.status, entry.body_len());
    CacheStatus::Hit.mark(out);

    info!(
        target: "hoard::proxy",
        cache_key = %key,
        status = entry.status.as_u16(),
        bytes = entry.body_len(),
        stored_at = %httpdate::fmt_http_date(entry.timestamp),
        "Cache HIT"
    );
    resp
}

/// Buffered origin response → client response with an exact length.
fn into_client_response(resp: Response<Bytes>, is_head: bool) -> HttpResponse {
    let (mut parts, body) = resp.into_parts();
    // A HEAD reply has no body but must keep the origin's length.
    if !is_head {
        headers::set_content_length(&mut parts.headers, parts.status, body.len());
    }
    Response::from_parts(parts, Full::new(body))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use bytes::Bytes;
    use hoard_cache::{CacheKey, CacheStore, CachedResponse};
    use http::header::{self, HeaderMap, HeaderValue};
    use http::{Method, Request, Response, StatusCode};
    use http_body_util::{BodyExt, Empty, Full};
    use hyper::body::{Body, Frame};
    use url::Url;

    use super::origin::{Origin, ProxyBody};
    use super::CachingProxy;
    use crate::error::{BoxError, ProxyError};

    #[derive(Clone, Copy)]
    enum Mode {
        Reply,
        TransportError,
        BrokenBody,
    }

    /// In-memory origin: answers every request with the same canned response.
    struct FakeOrigin {
        status: StatusCode,
        body: &'static str,
        headers: Vec<(&'static str, &'static str)>,
        mode: Mode,
        calls: AtomicUsize,
        last_request: Mutex<Option<http::request::Parts>>,
    }

    impl FakeOrigin {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                headers: vec![("content-type", "application/json")],
                mode: Mode::Reply,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn with_mode(mut self, mode: Mode) -> Self {
            self.mode = mode;
            self
        }

        fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }
    }

    struct BrokenBody;

    impl Body for BrokenBody {
        type Data = Bytes;
        type Error = BoxError;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
            Poll::Ready(Some(Err("connection reset mid-body".into())))
        }
    }

    impl Origin for Arc<FakeOrigin> {
        async fn send(&self, req: Request<ProxyBody>) -> Result<Response<ProxyBody>, ProxyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (parts, _body) = req.into_parts();
            *self.last_request.lock().expect("lock") = Some(parts);

            let body = match self.mode {
                Mode::TransportError => {
                    return Err(ProxyError::Upstream("connection refused".into()));
                }
                Mode::BrokenBody => BrokenBody.boxed_unsync(),
                Mode::Reply => Full::new(Bytes::from_static(self.body.as_bytes()))
                    .map_err(|never| -> BoxError { match never {} })
                    .boxed_unsync(),
            };

            let mut resp = Response::new(body);
            *resp.status_mut() = self.status;
            for (name, value) in &self.headers {
                resp.headers_mut()
                    .append(*name, HeaderValue::from_static(*value));
            }
            Ok(resp)
        }
    }

    fn proxy(origin: FakeOrigin) -> (CachingProxy<Arc<FakeOrigin>>, Arc<FakeOrigin>) {
        proxy_with_limit(origin, None)
    }

    fn proxy_with_limit(
        origin: FakeOrigin,
        max_body: Option<usize>,
    ) -> (CachingProxy<Arc<FakeOrigin>>, Arc<FakeOrigin>) {
        let origin = Arc::new(origin);
        let url = Url::parse("http://origin.test:3000").expect("origin url");
        let proxy = CachingProxy::new(
            &url,
            Arc::clone(&origin),
            Arc::new(CacheStore::new()),
            max_body,
        )
        .expect("proxy");
        (proxy, origin)
    }

    fn request(method: Method, uri: &str) -> Request<Empty<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Empty::new())
            .expect("request")
    }

    fn client() -> Option<SocketAddr> {
        Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), 51000))
    }

    async fn body_of(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.expect("body").to_bytes()
    }

    #[tokio::test]
    async fn miss_then_hit_serves_the_same_body() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::OK, r#"{"id":1}"#));

        let first = proxy.handle(request(Method::GET, "/users/1"), client()).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-cache"], "MISS");
        assert_eq!(body_of(first).await, Bytes::from_static(br#"{"id":1}"#));

        let second = proxy.handle(request(Method::GET, "/users/1"), client()).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(second.headers()[header::CONTENT_LENGTH], "8");
        assert_eq!(second.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_of(second).await, Bytes::from_static(br#"{"id":1}"#));

        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn query_order_shares_one_entry() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::OK, "[]"));

        let first = proxy.handle(request(Method::GET, "/items?b=2&a=1"), client()).await;
        assert_eq!(first.headers()["x-cache"], "MISS");

        let second = proxy.handle(request(Method::GET, "/items?a=1&b=2"), client()).await;
        assert_eq!(second.headers()["x-cache"], "HIT");
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_responses_are_never_stored() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::NOT_FOUND, "missing"));

        for _ in 0..2 {
            let resp = proxy.handle(request(Method::GET, "/nope"), client()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            assert_eq!(resp.headers()["x-cache"], "MISS");
            assert_eq!(body_of(resp).await, Bytes::from_static(b"missing"));
        }

        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
        assert!(proxy.store().is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_never_stored() {
        let (proxy, _origin) = proxy(FakeOrigin::new(StatusCode::SERVICE_UNAVAILABLE, "busy"));

        let resp = proxy.handle(request(Method::GET, "/busy"), client()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(proxy.store().is_empty());
    }

    #[tokio::test]
    async fn non_get_requests_bypass_the_cache() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::CREATED, "ok"));

        for _ in 0..2 {
            let resp = proxy.handle(request(Method::POST, "/users"), client()).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            assert_eq!(resp.headers()["x-cache"], "BYPASS");
        }
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
        assert!(proxy.store().is_empty());

        let get = proxy.handle(request(Method::GET, "/users"), client()).await;
        assert_eq!(get.headers()["x-cache"], "MISS");
    }

    #[tokio::test]
    async fn clear_turns_a_hit_back_into_a_miss() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::OK, "v1"));

        proxy.handle(request(Method::GET, "/a"), client()).await;
        let hit = proxy.handle(request(Method::GET, "/a"), client()).await;
        assert_eq!(hit.headers()["x-cache"], "HIT");

        proxy.store().clear();

        let after = proxy.handle(request(Method::GET, "/a"), client()).await;
        assert_eq!(after.headers()["x-cache"], "MISS");
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hit_filters_connection_headers_and_recomputes_length() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::OK, "unused"));

        let mut stored = HeaderMap::new();
        stored.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        stored.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        stored.insert(header::CONTENT_LENGTH, HeaderValue::from_static("999"));
        stored.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        stored.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let req = request(Method::GET, "/cached?x=1");
        proxy.store().put(
            CacheKey::for_request(&req),
            CachedResponse::new(StatusCode::ACCEPTED, stored, Bytes::from_static(b"hello")),
        );

        let resp = proxy.handle(req, client()).await;

        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.headers()["x-cache"], "HIT");
        assert!(resp.headers().get(header::CONNECTION).is_none());
        assert!(resp.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "5");
        let cookies: Vec<_> = resp.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(origin.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn origin_marker_header_is_replaced() {
        let origin = FakeOrigin::new(StatusCode::OK, "x").with_header("x-cache", "HIT from upstream");
        let (proxy, _origin) = proxy(origin);

        let resp = proxy.handle(request(Method::GET, "/m"), client()).await;
        let markers: Vec<_> = resp.headers().get_all("x-cache").iter().collect();
        assert_eq!(markers, vec!["MISS"]);
    }

    #[tokio::test]
    async fn director_rewrites_the_outbound_request() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::OK, "{}"));

        let req = Request::builder()
            .uri("/users/1?b=2&a=1")
            .header(header::HOST, "localhost:8080")
            .header("x-cache", "HIT")
            .body(Empty::<Bytes>::new())
            .expect("request");
        proxy.handle(req, client()).await;

        let seen = origin.last_request.lock().expect("lock").take().expect("origin called");
        assert_eq!(seen.uri.to_string(), "http://origin.test:3000/users/1?b=2&a=1");
        assert_eq!(seen.headers[header::HOST], "origin.test:3000");
        assert!(seen.headers.get("x-cache").is_none());
        assert_eq!(seen.headers["x-forwarded-for"], "192.168.1.20");
    }

    #[tokio::test]
    async fn transport_failure_is_a_bad_gateway() {
        let origin = FakeOrigin::new(StatusCode::OK, "x").with_mode(Mode::TransportError);
        let (proxy, _origin) = proxy(origin);

        let resp = proxy.handle(request(Method::GET, "/down"), client()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resp.headers()["x-cache"], "MISS");
        assert!(proxy.store().is_empty());

        let post = proxy.handle(request(Method::POST, "/down"), client()).await;
        assert_eq!(post.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(post.headers()["x-cache"], "BYPASS");
    }

    #[tokio::test]
    async fn body_read_failure_is_a_bad_gateway_and_stores_nothing() {
        let origin = FakeOrigin::new(StatusCode::OK, "x").with_mode(Mode::BrokenBody);
        let (proxy, origin) = proxy(origin);

        let resp = proxy.handle(request(Method::GET, "/broken"), client()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resp.headers()["x-cache"], "MISS");
        assert!(proxy.store().is_empty());

        // The proxy keeps serving; the next attempt goes to the origin again.
        proxy.handle(request(Method::GET, "/broken"), client()).await;
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_and_not_stored() {
        let origin = FakeOrigin::new(StatusCode::OK, "0123456789");
        let (proxy, _origin) = proxy_with_limit(origin, Some(4));

        let resp = proxy.handle(request(Method::GET, "/big"), client()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(proxy.store().is_empty());
    }

    #[tokio::test]
    async fn body_at_the_limit_is_stored() {
        let origin = FakeOrigin::new(StatusCode::OK, "0123");
        let (proxy, _origin) = proxy_with_limit(origin, Some(4));

        let resp = proxy.handle(request(Method::GET, "/fits"), client()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, Bytes::from_static(b"0123"));
        assert_eq!(proxy.store().len(), 1);
    }

    #[tokio::test]
    async fn limited_proxy_can_run_on_spawned_tasks() {
        let origin = FakeOrigin::new(StatusCode::OK, "0123456789");
        let (proxy, _origin) = proxy_with_limit(origin, Some(4));
        let proxy = Arc::new(proxy);

        let task = tokio::spawn(async move {
            proxy.handle(request(Method::GET, "/big"), client()).await.status()
        });
        assert_eq!(task.await.expect("task"), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn concurrent_misses_all_reach_the_origin() {
        let (proxy, origin) = proxy(FakeOrigin::new(StatusCode::OK, "same"));
        let proxy = Arc::new(proxy);

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let proxy = Arc::clone(&proxy);
            tasks.push(tokio::spawn(async move {
                proxy.handle(request(Method::GET, "/race"), client()).await.status()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.expect("task"), StatusCode::OK);
        }

        let calls = origin.calls.load(Ordering::SeqCst);
        assert!((1..=4).contains(&calls));
        assert_eq!(proxy.store().len(), 1);
    }
}
