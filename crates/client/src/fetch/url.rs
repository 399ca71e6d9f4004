//! Origin canonicalization and request path resolution.

/// Error type for origin and path resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("cross-origin request: {0}")]
    CrossOrigin(String),
}

/// Canonicalize an origin string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Drop path, query and fragment
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a request URL against the origin.
///
/// Relative paths are joined onto the origin. Absolute URLs are accepted only
/// when they point at the same origin. The fragment is always removed.
pub fn resolve(origin: &url::Url, request_url: &str) -> Result<url::Url, UrlError> {
    let trimmed = request_url.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if resolved.origin() != origin.origin() {
        return Err(UrlError::CrossOrigin(resolved.to_string()));
    }

    resolved.set_fragment(None);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        canonicalize("http://localhost:3000").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_drops_path_and_query() {
        let url = canonicalize("  http://localhost:3000/app?x=1#top ").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&origin(), "/static/css/main.css?v=2").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/static/css/main.css?v=2");
    }

    #[test]
    fn test_resolve_strips_fragment() {
        let url = resolve(&origin(), "/index.html#hero").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_resolve_same_origin_absolute() {
        let url = resolve(&origin(), "http://localhost:3000/api/sales").unwrap();
        assert_eq!(url.path(), "/api/sales");
    }

    #[test]
    fn test_resolve_rejects_cross_origin() {
        let result = resolve(&origin(), "https://evil.example/steal");
        assert!(matches!(result, Err(UrlError::CrossOrigin(_))));
    }

    #[test]
    fn test_resolve_rejects_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
    }
}
