//! Request classification.
//!
//! A pure function over the configured rule tables; first match wins.
//! Non-GET and cross-origin non-media requests are rejected by the
//! strategy engine before classification is consulted.

use http::Method;
use url::Url;

use crate::config::WorkerConfig;

/// The classifier's verdict for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Sensitive path: always network, never any store.
    NeverCache,
    /// Dynamic/API path: network first, dynamic store as fallback.
    NetworkFirst,
    /// Static asset or media: store first, network on miss.
    CacheFirst,
    /// Image resource: store first, placeholder on total failure.
    ImageLike,
    /// No rule matched; the engine applies the navigation or
    /// conservative cache-first default.
    Default,
}

/// Classify a request by method and URL.
///
/// The method is part of the contract but no current rule branches on it;
/// sensitive paths are sensitive for every method.
pub fn classify(config: &WorkerConfig, _method: &Method, url: &Url) -> Classification {
    let path = url.path();

    if starts_with_any(path, &config.never_cache_prefixes) {
        return Classification::NeverCache;
    }

    if starts_with_any(path, &config.network_first_prefixes) {
        return Classification::NetworkFirst;
    }

    if starts_with_any(path, &config.image_prefixes) || config.has_image_extension(url) {
        return Classification::ImageLike;
    }

    if starts_with_any(path, &config.static_prefixes) || config.has_media_extension(url) {
        return Classification::CacheFirst;
    }

    Classification::Default
}

fn starts_with_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://lumenstudio.example{}", path)).unwrap()
    }

    fn verdict(path: &str) -> Classification {
        classify(&WorkerConfig::default(), &Method::GET, &url(path))
    }

    #[test]
    fn test_sensitive_paths_never_cache() {
        assert_eq!(verdict("/admin"), Classification::NeverCache);
        assert_eq!(verdict("/admin/inbox"), Classification::NeverCache);
        assert_eq!(verdict("/api/auth/session"), Classification::NeverCache);
        assert_eq!(verdict("/api/csrf"), Classification::NeverCache);
        assert_eq!(verdict("/account"), Classification::NeverCache);
    }

    #[test]
    fn test_sensitive_beats_api_prefix() {
        // /api/auth is under /api/ too; the sensitive rule must win.
        assert_eq!(verdict("/api/auth/login"), Classification::NeverCache);
    }

    #[test]
    fn test_api_paths_network_first() {
        assert_eq!(verdict("/api/posts"), Classification::NetworkFirst);
        assert_eq!(verdict("/api/contact"), Classification::NetworkFirst);
    }

    #[test]
    fn test_static_paths_cache_first() {
        assert_eq!(verdict("/assets/site.css"), Classification::CacheFirst);
        assert_eq!(verdict("/fonts/inter.woff2"), Classification::CacheFirst);
    }

    #[test]
    fn test_images_by_prefix_and_extension() {
        assert_eq!(verdict("/images/dish.jpg"), Classification::ImageLike);
        // Extension rule catches images outside the image directories.
        assert_eq!(verdict("/uploads/team.webp"), Classification::ImageLike);
    }

    #[test]
    fn test_media_extensions_cache_first() {
        assert_eq!(verdict("/media/reel.mp4"), Classification::CacheFirst);
    }

    #[test]
    fn test_unmatched_paths_default() {
        assert_eq!(verdict("/work"), Classification::Default);
        assert_eq!(verdict("/blog/lighting-a-kitchen-set"), Classification::Default);
    }

    #[test]
    fn test_classification_ignores_method() {
        let config = WorkerConfig::default();
        // Sensitive paths stay sensitive for every method.
        assert_eq!(
            classify(&config, &Method::POST, &url("/admin/inbox")),
            Classification::NeverCache
        );
    }
}
