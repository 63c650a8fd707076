//! # Lumen Net
//!
//! HTTP request/response model and the network boundary for the Lumen
//! offline worker.
//!
//! ## Design Goals
//!
//! 1. **One request shape**: every request the worker intercepts is a
//!    [`Request`], whether it came from a navigation or a subresource load
//! 2. **Pluggable network**: the engine talks to the live network only
//!    through the [`Fetch`] trait, so tests can substitute counting fakes
//! 3. **Cacheability in one place**: [`Response`] owns the header
//!    inspection the caching strategies key on

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use thiserror::Error;
use url::Url;

pub mod client;

pub use client::{FetcherConfig, HttpFetcher};

/// Errors that can occur at the network boundary.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network unreachable")]
    Unreachable,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Unique identifier for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// How the request was issued by the page.
///
/// The worker only branches on `Navigate`; the other modes are carried
/// through for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    /// Same-origin subresource load.
    #[default]
    SameOrigin,
    /// Cross-origin subresource load.
    Cors,
    /// Cross-origin load without CORS (images, media).
    NoCors,
}

/// An intercepted HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: RequestId,
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub mode: RequestMode,
}

impl Request {
    /// Create a GET request for a subresource.
    pub fn get(url: Url) -> Self {
        Self {
            id: RequestId::new(),
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            mode: RequestMode::SameOrigin,
        }
    }

    /// Create a navigation request.
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    /// Create a POST request.
    pub fn post(url: Url, body: Bytes) -> Self {
        Self {
            id: RequestId::new(),
            url,
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body),
            mode: RequestMode::SameOrigin,
        }
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the request mode.
    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether this is a top-level navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// An HTTP response, fully buffered.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Create a response with the given status and empty body.
    pub fn new(url: Url, status: StatusCode) -> Self {
        Self {
            url,
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Get a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get content-type from headers.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get cache-control from headers.
    pub fn cache_control(&self) -> Option<&str> {
        self.header("cache-control")
    }

    /// Check if response is success (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response body is HTML.
    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains(mime::TEXT_HTML.as_ref()))
            .unwrap_or(false)
    }

    /// Check if cache-control forbids storing this response.
    pub fn forbids_caching(&self) -> bool {
        self.cache_control()
            .map(|cc| {
                let cc = cc.to_ascii_lowercase();
                cc.contains("no-store") || cc.contains("no-cache")
            })
            .unwrap_or(false)
    }

    /// Get body as text.
    pub fn text(&self) -> std::result::Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

/// The network boundary.
///
/// The production implementation is [`HttpFetcher`]; tests substitute
/// fakes that count calls or simulate a dead network.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform the request against the live network.
    async fn fetch(&self, request: &Request) -> Result<Response, NetError>;
}
