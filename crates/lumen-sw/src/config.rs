//! Worker configuration.
//!
//! The classification tables mirror the server's route and asset layout;
//! keep them in sync when routes move.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Host capabilities negotiated at construction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether the host delivers periodic sync events.
    pub periodic_sync: bool,
}

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// The site origin this worker serves.
    pub origin: Url,

    /// Site name used in notifications.
    pub site_name: String,

    /// Store name prefix; store names are `"{prefix}-{namespace}-{version}"`.
    pub cache_prefix: String,

    /// Deployment generation tag (e.g. "v3").
    pub version: String,

    /// The route served when an offline navigation has no exact match.
    pub shell_root: String,

    /// Routes and assets pre-warmed into the shell store on install.
    pub shell_manifest: Vec<String>,

    /// Path prefixes that must never touch any store.
    pub never_cache_prefixes: Vec<String>,

    /// Path prefixes served network-first into the dynamic store.
    pub network_first_prefixes: Vec<String>,

    /// Path prefixes of fingerprinted static assets.
    pub static_prefixes: Vec<String>,

    /// Path prefixes of image directories.
    pub image_prefixes: Vec<String>,

    /// Recognized image file extensions.
    pub image_extensions: Vec<String>,

    /// Recognized audio/video file extensions.
    pub media_extensions: Vec<String>,

    /// Maximum entry count of the dynamic store.
    pub dynamic_max_entries: usize,

    /// Maximum entry count of the image store.
    pub image_max_entries: usize,

    /// Timeout applied to network fetches in the caching strategies.
    pub fetch_timeout_secs: u64,

    /// Host capabilities.
    pub capabilities: Capabilities,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("https://lumenstudio.example")
                .expect("default origin is a valid URL"),
            site_name: "Lumen Studio".to_string(),
            cache_prefix: "lumen".to_string(),
            version: "v3".to_string(),
            shell_root: "/".to_string(),
            shell_manifest: vec![
                "/".to_string(),
                "/work".to_string(),
                "/services".to_string(),
                "/studio".to_string(),
                "/blog".to_string(),
                "/contact".to_string(),
                "/offline".to_string(),
                "/site.webmanifest".to_string(),
            ],
            never_cache_prefixes: vec![
                "/api/auth".to_string(),
                "/api/csrf".to_string(),
                "/api/token".to_string(),
                "/admin".to_string(),
                "/account".to_string(),
            ],
            network_first_prefixes: vec!["/api/".to_string()],
            static_prefixes: vec![
                "/assets/".to_string(),
                "/static/".to_string(),
                "/fonts/".to_string(),
            ],
            image_prefixes: vec!["/images/".to_string()],
            image_extensions: vec![
                ".png".to_string(),
                ".jpg".to_string(),
                ".jpeg".to_string(),
                ".gif".to_string(),
                ".webp".to_string(),
                ".avif".to_string(),
                ".svg".to_string(),
                ".ico".to_string(),
            ],
            media_extensions: vec![
                ".mp4".to_string(),
                ".webm".to_string(),
                ".mp3".to_string(),
                ".ogg".to_string(),
                ".wav".to_string(),
            ],
            dynamic_max_entries: 50,
            image_max_entries: 60,
            fetch_timeout_secs: 30,
            capabilities: Capabilities::default(),
        }
    }
}

impl WorkerConfig {
    /// Timeout applied to strategy network fetches.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Whether a URL belongs to the site origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Whether the URL path carries a recognized image extension.
    pub fn has_image_extension(&self, url: &Url) -> bool {
        let path = url.path().to_ascii_lowercase();
        self.image_extensions.iter().any(|ext| path.ends_with(ext))
    }

    /// Whether the URL path carries a recognized media extension.
    pub fn has_media_extension(&self, url: &Url) -> bool {
        let path = url.path().to_ascii_lowercase();
        self.media_extensions.iter().any(|ext| path.ends_with(ext))
    }

    /// Whether a cross-origin URL may still enter the cache (declared
    /// image/media resources only).
    pub fn is_cacheable_cross_origin(&self, url: &Url) -> bool {
        self.has_image_extension(url) || self.has_media_extension(url)
    }

    /// Absolute URL of the shell root route.
    pub fn shell_root_url(&self) -> Option<Url> {
        self.origin.join(&self.shell_root).ok()
    }

    /// Absolute URL for a site-relative path.
    pub fn site_url(&self, path: &str) -> Option<Url> {
        self.origin.join(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_origin() {
        let config = WorkerConfig::default();
        let ours = Url::parse("https://lumenstudio.example/work").unwrap();
        let theirs = Url::parse("https://cdn.example/work").unwrap();

        assert!(config.is_same_origin(&ours));
        assert!(!config.is_same_origin(&theirs));
    }

    #[test]
    fn test_image_extension_is_case_insensitive() {
        let config = WorkerConfig::default();
        let url = Url::parse("https://cdn.example/photos/DISH.JPG").unwrap();
        assert!(config.has_image_extension(&url));
    }

    #[test]
    fn test_cross_origin_cacheability() {
        let config = WorkerConfig::default();
        let image = Url::parse("https://cdn.example/photos/dish.webp").unwrap();
        let script = Url::parse("https://cdn.example/lib.js").unwrap();

        assert!(config.is_cacheable_cross_origin(&image));
        assert!(!config.is_cacheable_cross_origin(&script));
    }

    #[test]
    fn test_shell_root_url() {
        let config = WorkerConfig::default();
        assert_eq!(
            config.shell_root_url().unwrap().as_str(),
            "https://lumenstudio.example/"
        );
    }
}
