//! Synthesized fallback responses.
//!
//! These are the only responses the worker fabricates: the offline page
//! for navigations, a placeholder graphic for images, and the generic
//! error body for everything else.

use http::{header, HeaderValue, StatusCode};
use lumen_net::Response;
use url::Url;

/// Placeholder shown when an image has no cache entry and no network.
pub const PLACEHOLDER_IMAGE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300"><rect width="400" height="300" fill="#18181b"/><text x="200" y="150" fill="#a1a1aa" font-family="sans-serif" font-size="16" text-anchor="middle">Image not available</text></svg>"##;

/// A deterministic inline image served in place of a broken-image icon.
pub fn placeholder_image(url: &Url) -> Response {
    Response::new(url.clone(), StatusCode::OK)
        .with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("image/svg+xml"),
        )
        .with_header(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        )
        .with_body(PLACEHOLDER_IMAGE_SVG)
}

/// Minimal page served when a navigation has no network and no cached shell.
pub fn offline_page(url: &Url) -> Response {
    Response::new(url.clone(), StatusCode::SERVICE_UNAVAILABLE)
        .with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )
        .with_body("Offline")
}

/// Generic failure response for non-navigation requests.
pub fn service_error(url: &Url) -> Response {
    Response::new(url.clone(), StatusCode::SERVICE_UNAVAILABLE)
        .with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )
        .with_body("Service unavailable")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://lumenstudio.example/images/dish.jpg").unwrap()
    }

    #[test]
    fn test_placeholder_image_shape() {
        let response = placeholder_image(&url());
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert!(response.text().unwrap().contains("Image not available"));
    }

    #[test]
    fn test_offline_page_shape() {
        let response = offline_page(&url());
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.is_html());
        assert_eq!(response.text().unwrap(), "Offline");
    }

    #[test]
    fn test_service_error_shape() {
        let response = service_error(&url());
        assert!(!response.is_success());
        assert_eq!(response.text().unwrap(), "Service unavailable");
    }
}
