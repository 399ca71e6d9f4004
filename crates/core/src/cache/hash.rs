//! Request identity key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request from its method and URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let a = compute_request_key("GET", "/static/css/main.css");
        let b = compute_request_key("GET", "/static/css/main.css");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_query_is_significant() {
        let a = compute_request_key("GET", "/api/sales?page=1");
        let b = compute_request_key("GET", "/api/sales?page=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
