//! URL utilities for consistent URL handling
//!
//! This module provides utilities for normalizing URLs to prevent issues
//! with trailing slashes when constructing endpoint URLs.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use trickle::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://127.0.0.1:3000"), "http://127.0.0.1:3000");
/// assert_eq!(normalize_base_url("http://127.0.0.1:3000/"), "http://127.0.0.1:3000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use trickle::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://127.0.0.1:3000", "api/chat"),
///     "http://127.0.0.1:3000/api/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://127.0.0.1:3000/", "/api/chat"),
///     "http://127.0.0.1:3000/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
