//! # Lumen Store
//!
//! The persistent Cache Store Registry for the Lumen offline worker.
//!
//! ## Features
//!
//! - **Named stores**: lazily-created, insertion-ordered key→response maps
//! - **Durable**: one SQLite database survives worker restarts
//! - **Generations**: store names carry a deployment tag; activation drops
//!   every store from a stale generation in one transaction-shaped sweep
//! - **Bounded**: FIFO eviction trims a store to its maximum entry count
//!
//! ## Architecture
//!
//! ```text
//! StoreRegistry ("lumen", "v3")
//!     │
//!     ├── CacheStore "lumen-shell-v3"
//!     ├── CacheStore "lumen-static-v3"
//!     ├── CacheStore "lumen-dynamic-v3"   (bounded)
//!     └── CacheStore "lumen-images-v3"    (bounded)
//!             └── CacheKey → StoredResponse
//! ```
//!
//! All worker state that must outlive an event lives here; the worker
//! itself keeps nothing in memory between events.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use lumen_net::{Request, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub mod evict;
pub mod registry;
pub mod schema;
pub mod store;

pub use evict::trim_store;
pub use registry::{Namespace, StoreRegistry};
pub use store::CacheStore;

/// Errors that can occur in store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store database: {0}")]
    Open(String),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Request identity: method plus normalized URL, headers ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: String,
}

impl CacheKey {
    /// Build the key for a request. The URL fragment is stripped; the
    /// query string is part of the identity.
    pub fn for_request(request: &Request) -> Self {
        Self::new(request.method.as_str(), &request.url)
    }

    /// Build a key from raw parts.
    pub fn new(method: &str, url: &Url) -> Self {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        Self {
            method: method.to_ascii_uppercase(),
            url: normalized.to_string(),
        }
    }

    /// The stored form, `"METHOD url"`.
    pub fn as_storage_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    /// The normalized URL this key addresses.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A response at rest: what a [`CacheStore`] persists per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (name → value).
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Insertion timestamp (ms since epoch).
    pub inserted_at: i64,
}

impl StoredResponse {
    /// Capture a live response for storage.
    pub fn from_response(response: &Response) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            status: response.status.as_u16(),
            headers,
            body: response.body.to_vec(),
            inserted_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Rehydrate into a live response for the given URL.
    pub fn to_response(&self, url: &Url) -> Result<Response, StoreError> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| StoreError::InvalidData(format!("bad status {}", self.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(n, v);
            }
        }

        Ok(Response {
            url: url.clone(),
            status,
            headers,
            body: self.body.clone().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn test_cache_key_strips_fragment() {
        let with_fragment = Url::parse("https://lumenstudio.example/work#reel").unwrap();
        let without = Url::parse("https://lumenstudio.example/work").unwrap();
        assert_eq!(
            CacheKey::new("GET", &with_fragment),
            CacheKey::new("GET", &without)
        );
    }

    #[test]
    fn test_cache_key_keeps_query() {
        let a = Url::parse("https://lumenstudio.example/api/posts?page=1").unwrap();
        let b = Url::parse("https://lumenstudio.example/api/posts?page=2").unwrap();
        assert_ne!(CacheKey::new("GET", &a), CacheKey::new("GET", &b));
    }

    #[test]
    fn test_cache_key_storage_form() {
        let url = Url::parse("https://lumenstudio.example/").unwrap();
        let key = CacheKey::new("get", &url);
        assert_eq!(key.as_storage_key(), "GET https://lumenstudio.example/");
    }

    #[test]
    fn test_stored_response_round_trip() {
        let url = Url::parse("https://lumenstudio.example/assets/site.css").unwrap();
        let live = Response::new(url.clone(), StatusCode::OK)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/css"))
            .with_body("body{}");

        let stored = StoredResponse::from_response(&live);
        let back = stored.to_response(&url).unwrap();

        assert_eq!(back.status, StatusCode::OK);
        assert_eq!(back.content_type(), Some("text/css"));
        assert_eq!(back.body.as_ref(), b"body{}");
    }
}
