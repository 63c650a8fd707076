//! The caching strategies.
//!
//! One entry point, [`StrategyEngine::handle`], dispatches on the
//! classifier's verdict. Store failures never fail a request: the engine
//! logs them and falls through to network-only behavior. Network failures
//! are routed through each strategy's documented fallback, and anything
//! that still escapes is converted into the offline page (navigations) or
//! a generic error response at the single recovery point.

use std::sync::Arc;

use http::Method;
use lumen_common::with_timeout;
use lumen_net::{Fetch, NetError, Request, Response};
use lumen_store::{CacheKey, CacheStore, Namespace, StoreRegistry, StoredResponse};
use tracing::{debug, trace, warn};
use url::Url;

use crate::classify::{classify, Classification};
use crate::config::WorkerConfig;
use crate::fallback;
use crate::WorkerError;

/// Executes the caching strategies over the store registry and the
/// network boundary. Cheap to clone; background revalidation tasks clone
/// the whole engine.
#[derive(Clone)]
pub struct StrategyEngine {
    config: Arc<WorkerConfig>,
    registry: StoreRegistry,
    fetcher: Arc<dyn Fetch>,
}

impl StrategyEngine {
    pub fn new(config: Arc<WorkerConfig>, registry: StoreRegistry, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            registry,
            fetcher,
        }
    }

    /// Handle one intercepted request.
    ///
    /// Non-GET requests, cross-origin non-media requests, and never-cache
    /// paths go straight to the network and their failures propagate
    /// unchanged. Every other verdict runs a caching strategy, and a
    /// failure that escapes the strategy is recovered into a fallback
    /// response here.
    pub async fn handle(&self, request: &Request) -> Result<Response, WorkerError> {
        if request.method != Method::GET {
            return self.passthrough(request).await;
        }

        let same_origin = self.config.is_same_origin(&request.url);
        if !same_origin && !self.config.is_cacheable_cross_origin(&request.url) {
            return self.passthrough(request).await;
        }

        let verdict = classify(&self.config, &request.method, &request.url);
        trace!(url = %request.url, ?verdict, "Classified request");

        if verdict == Classification::NeverCache {
            return self.passthrough(request).await;
        }

        match self.run(verdict, request).await {
            Ok(response) => Ok(response),
            Err(err) => Ok(self.recover(request, err).await),
        }
    }

    async fn run(
        &self,
        verdict: Classification,
        request: &Request,
    ) -> Result<Response, WorkerError> {
        match verdict {
            Classification::NetworkFirst => self.network_first(request).await,
            Classification::CacheFirst => self.cache_first(request, Namespace::Static, None).await,
            Classification::ImageLike => self.image_first(request).await,
            Classification::Default => {
                if request.is_navigation() {
                    self.stale_while_revalidate(request).await
                } else {
                    self.cache_first(request, Namespace::Static, None).await
                }
            }
            // Filtered out by handle().
            Classification::NeverCache => self.passthrough(request).await,
        }
    }

    /// Fetch bypassing every store, with the configured timeout. Used by
    /// the lifecycle pre-warm and the shell refresh.
    pub async fn fetch_direct(&self, request: &Request) -> Result<Response, WorkerError> {
        self.fetch_with_timeout(request).await
    }

    /// Forward to the network untouched. No store is read or written.
    async fn passthrough(&self, request: &Request) -> Result<Response, WorkerError> {
        trace!(url = %request.url, "Passthrough");
        self.fetcher.fetch(request).await.map_err(WorkerError::from)
    }

    /// Network first, dynamic store as the offline fallback.
    async fn network_first(&self, request: &Request) -> Result<Response, WorkerError> {
        let store = self.open_store(Namespace::Dynamic).await;
        let key = CacheKey::for_request(request);

        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                if let Some(ref store) = store {
                    if self.is_cacheable_dynamic(&response) {
                        self.store_response(
                            store,
                            &key,
                            &response,
                            Some(self.config.dynamic_max_entries),
                        )
                        .await;
                    }
                }
                Ok(response)
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "Network-first fetch failed; trying store");
                if let Some(ref store) = store {
                    if let Some(cached) = self.lookup(store, &key, &request.url).await {
                        return Ok(cached);
                    }
                }
                Err(err)
            }
        }
    }

    /// Store first; network fills the store on a miss.
    async fn cache_first(
        &self,
        request: &Request,
        namespace: Namespace,
        max_entries: Option<usize>,
    ) -> Result<Response, WorkerError> {
        let store = self.open_store(namespace).await;
        let key = CacheKey::for_request(request);

        if let Some(ref store) = store {
            if let Some(cached) = self.lookup(store, &key, &request.url).await {
                trace!(url = %request.url, store = store.name(), "Cache hit");
                return Ok(cached);
            }
        }

        let response = self.fetch_with_timeout(request).await?;
        if response.is_success() {
            if let Some(ref store) = store {
                self.store_response(store, &key, &response, max_entries).await;
            }
        }
        Ok(response)
    }

    /// Cache-first for images, degrading to an inline placeholder rather
    /// than a broken-image icon when both store and network fail.
    async fn image_first(&self, request: &Request) -> Result<Response, WorkerError> {
        match self
            .cache_first(request, Namespace::Images, Some(self.config.image_max_entries))
            .await
        {
            Ok(response) => Ok(response),
            Err(err) => {
                debug!(url = %request.url, error = %err, "Image unavailable; serving placeholder");
                Ok(fallback::placeholder_image(&request.url))
            }
        }
    }

    /// Serve the cached shell entry immediately and refresh it in the
    /// background; fall back to a live fetch when the store has nothing.
    async fn stale_while_revalidate(&self, request: &Request) -> Result<Response, WorkerError> {
        let store = self.open_store(Namespace::Shell).await;
        let key = CacheKey::for_request(request);

        if let Some(ref store) = store {
            if let Some(cached) = self.lookup(store, &key, &request.url).await {
                trace!(url = %request.url, "Serving stale shell entry; revalidating");
                self.spawn_revalidation(request.clone());
                return Ok(cached);
            }
        }

        let response = self.fetch_with_timeout(request).await?;
        if response.is_success() {
            if let Some(ref store) = store {
                self.store_response(store, &key, &response, None).await;
            }
        }
        Ok(response)
    }

    /// Detached background refresh of one shell entry. Deliberately not
    /// awaited by the response path; the host may tear the task down
    /// mid-flight and the already-returned response is unaffected.
    fn spawn_revalidation(&self, request: Request) {
        let engine = self.clone();
        tokio::spawn(async move {
            match engine.fetch_with_timeout(&request).await {
                Ok(response) if response.is_success() => {
                    if let Some(store) = engine.open_store(Namespace::Shell).await {
                        let key = CacheKey::for_request(&request);
                        engine.store_response(&store, &key, &response, None).await;
                        trace!(url = %request.url, "Revalidated shell entry");
                    }
                }
                Ok(response) => {
                    debug!(url = %request.url, status = %response.status, "Revalidation got error status");
                }
                Err(err) => {
                    debug!(url = %request.url, error = %err, "Revalidation failed");
                }
            }
        });
    }

    /// The single recovery point for failures that escape a caching
    /// strategy. Always produces a response.
    async fn recover(&self, request: &Request, err: WorkerError) -> Response {
        warn!(url = %request.url, error = %err, "Request pipeline failed; serving fallback");

        if request.is_navigation() {
            if let Some(root) = self.config.shell_root_url() {
                if let Some(store) = self.open_store(Namespace::Shell).await {
                    let key = CacheKey::new("GET", &root);
                    if let Some(shell) = self.lookup(&store, &key, &root).await {
                        return shell;
                    }
                }
            }
            fallback::offline_page(&request.url)
        } else {
            fallback::service_error(&request.url)
        }
    }

    /// Whether a network-first response may enter the dynamic store.
    ///
    /// HTML is excluded even here, so HTML fragment responses never gain
    /// an offline fallback.
    fn is_cacheable_dynamic(&self, response: &Response) -> bool {
        response.is_success() && !response.forbids_caching() && !response.is_html()
    }

    async fn fetch_with_timeout(&self, request: &Request) -> Result<Response, WorkerError> {
        let timeout = self.config.fetch_timeout();
        match with_timeout(timeout, || self.fetcher.fetch(request)).await {
            Ok(result) => result.map_err(WorkerError::from),
            Err(_) => Err(WorkerError::Net(NetError::Timeout(timeout))),
        }
    }

    /// Open a store, degrading to network-only behavior on failure.
    async fn open_store(&self, namespace: Namespace) -> Option<CacheStore> {
        match self.registry.open_store(namespace).await {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(namespace = namespace.as_str(), error = %err, "Store open failed; network-only");
                None
            }
        }
    }

    /// Read a store entry, treating store errors as a miss.
    async fn lookup(&self, store: &CacheStore, key: &CacheKey, url: &Url) -> Option<Response> {
        match store.match_key(key).await {
            Ok(Some(stored)) => match stored.to_response(url) {
                Ok(response) => Some(response),
                Err(err) => {
                    warn!(store = store.name(), error = %err, "Discarding unreadable entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(store = store.name(), error = %err, "Store read failed");
                None
            }
        }
    }

    /// Write a store entry and enforce its bound; failures are logged,
    /// never propagated.
    async fn store_response(
        &self,
        store: &CacheStore,
        key: &CacheKey,
        response: &Response,
        max_entries: Option<usize>,
    ) {
        if let Err(err) = store.put(key, &StoredResponse::from_response(response)).await {
            warn!(store = store.name(), error = %err, "Store write failed");
            return;
        }
        if let Some(max) = max_entries {
            if let Err(err) = store.trim(max).await {
                warn!(store = store.name(), error = %err, "Store trim failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::{header, HeaderValue, StatusCode};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Serves one fixed body for every URL; can be switched offline.
    struct StubFetcher {
        body: &'static str,
        content_type: &'static str,
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(body: &'static str, content_type: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body,
                content_type,
                offline: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(NetError::Unreachable);
            }
            Ok(Response::new(request.url.clone(), StatusCode::OK)
                .with_header(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(self.content_type),
                )
                .with_body(self.body))
        }
    }

    fn engine(fetcher: Arc<dyn Fetch>) -> (StrategyEngine, StoreRegistry) {
        let config = Arc::new(WorkerConfig::default());
        let registry = StoreRegistry::in_memory(&config.cache_prefix, &config.version).unwrap();
        (
            StrategyEngine::new(config, registry.clone(), fetcher),
            registry,
        )
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://lumenstudio.example{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_html_never_enters_dynamic_store() {
        let fetcher = StubFetcher::new("<p>fragment</p>", "text/html");
        let (engine, registry) = engine(fetcher.clone());

        let request = Request::get(url("/api/fragment"));
        let response = engine.handle(&request).await.unwrap();
        assert!(response.is_success());

        let dynamic = registry.open_store(Namespace::Dynamic).await.unwrap();
        assert!(dynamic.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_json_enters_dynamic_store() {
        let fetcher = StubFetcher::new("[]", "application/json");
        let (engine, registry) = engine(fetcher.clone());

        engine.handle(&Request::get(url("/api/posts"))).await.unwrap();

        let dynamic = registry.open_store(Namespace::Dynamic).await.unwrap();
        assert_eq!(dynamic.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_skips_network_on_hit() {
        let fetcher = StubFetcher::new("a{}", "text/css");
        let (engine, _registry) = engine(fetcher.clone());

        let request = Request::get(url("/assets/site.css"));
        engine.handle(&request).await.unwrap();
        engine.handle(&request).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_navigation_without_shell_gets_offline_page() {
        let fetcher = StubFetcher::new("", "text/html");
        fetcher.set_offline(true);
        let (engine, _registry) = engine(fetcher.clone());

        let response = engine
            .handle(&Request::navigate(url("/work")))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.text().unwrap(), "Offline");
    }

    #[tokio::test]
    async fn test_passthrough_propagates_errors() {
        let fetcher = StubFetcher::new("", "text/html");
        fetcher.set_offline(true);
        let (engine, _registry) = engine(fetcher.clone());

        // POSTs bypass the caching pipeline entirely.
        let request = Request::post(url("/api/contact"), "{}".into());
        assert!(engine.handle(&request).await.is_err());
    }
}
