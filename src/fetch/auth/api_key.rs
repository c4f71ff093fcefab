use crate::error::{Error, Result};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once, at construction, so every
/// request carries the same pre-built header.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredential`] if `header_name` is not a valid
    /// header name or `key` contains bytes not allowed in a header value.
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidCredential {
            header: header_name.to_string(),
            reason,
        };
        let name =
            HeaderName::from_bytes(header_name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let mut value = HeaderValue::from_str(key).map_err(|e| invalid(e.to_string()))?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name: name,
            key: value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unused;

    #[async_trait]
    impl HttpClient for Unused {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            unreachable!("construction-only test")
        }
    }

    #[test]
    fn test_rejects_key_with_newline() {
        let err = ApiKey::new(Unused, "apiKey", "abc\ndef").err().unwrap();
        assert!(matches!(err, Error::InvalidCredential { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_rejects_bad_header_name() {
        assert!(ApiKey::new(Unused, "api key", "abc").is_err());
    }
}
