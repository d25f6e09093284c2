//! Request-scoped authentication plug-point.
//!
//! Two built-in implementations: [`NoAuth`] (accept everything) and
//! [`ApiKeyAuth`] (a single shared secret, checked in constant time
//! against either a bearer token or an `api_key` query parameter). The
//! `/v1/health` route never calls through this trait — health is always
//! unauthenticated.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// The authenticated caller. Opaque beyond its label; nothing downstream
/// keys behavior off the identity today, but the type exists so a richer
/// identity can be threaded through later without changing the trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    pub fn anonymous() -> Self {
        Identity("anonymous".to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or invalid credentials")]
    Unauthorized,
}

/// A request-scoped authenticator. Implementations must not block and
/// must not perform I/O — the decision is made purely from headers and
/// query parameters already in hand.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap, query: &str) -> Result<Identity, AuthError>;
}

/// Accepts every request as anonymous. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn authenticate(&self, _headers: &HeaderMap, _query: &str) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }
}

/// Accepts a request iff a shared key is presented via `Authorization:
/// Bearer <key>` or `?api_key=<key>`, compared in constant time to avoid
/// leaking key material through response-timing side channels (mirrors
/// `hmac.compare_digest` in the Python original's `APIKeyAuthProvider`).
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    key: String,
}

impl ApiKeyAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn matches(&self, candidate: &str) -> bool {
        let expected = self.key.as_bytes();
        let got = candidate.as_bytes();
        expected.len() == got.len() && bool::from(expected.ct_eq(got))
    }
}

impl Authenticator for ApiKeyAuth {
    fn authenticate(&self, headers: &HeaderMap, query: &str) -> Result<Identity, AuthError> {
        if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
            if let Ok(value) = value.to_str() {
                if let Some(token) = value.strip_prefix("Bearer ") {
                    if self.matches(token) {
                        return Ok(Identity("api-key".to_string()));
                    }
                }
            }
        }

        if let Some(candidate) = query_param(query, "api_key") {
            if self.matches(&candidate) {
                return Ok(Identity("api-key".to_string()));
            }
        }

        Err(AuthError::Unauthorized)
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    #[test]
    fn no_auth_always_succeeds() {
        let headers = HeaderMap::new();
        assert!(NoAuth.authenticate(&headers, "").is_ok());
    }

    #[test]
    fn api_key_auth_accepts_matching_bearer_token() {
        let auth = ApiKeyAuth::new("secret123");
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer secret123"),
        );
        assert!(auth.authenticate(&headers, "").is_ok());
    }

    #[test]
    fn api_key_auth_rejects_mismatched_bearer_token() {
        let auth = ApiKeyAuth::new("secret123");
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer wrong"),
        );
        assert!(auth.authenticate(&headers, "").is_err());
    }

    #[test]
    fn api_key_auth_accepts_matching_query_param() {
        let auth = ApiKeyAuth::new("secret123");
        let headers = HeaderMap::new();
        assert!(auth.authenticate(&headers, "api_key=secret123").is_ok());
    }

    #[test]
    fn api_key_auth_rejects_missing_credentials() {
        let auth = ApiKeyAuth::new("secret123");
        let headers = HeaderMap::new();
        assert!(auth.authenticate(&headers, "").is_err());
    }
}
