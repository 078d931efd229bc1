//! Outgoing request

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use super::into_url::IntoUrl;
use crate::error::{self, Result};

/// An HTTP request. Bodies are held in memory so a request can be replayed
/// on another connection after a recoverable failure.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpRequest {
    /// # Errors
    ///
    /// Returns a builder error if `url` is not a valid `http` or `https` URL.
    pub fn new<U: IntoUrl>(method: Method, url: U) -> Result<Self> {
        Ok(Self {
            method,
            url: url.into_url()?,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    /// # Errors
    ///
    /// Returns a builder error if `url` is not a valid `http` or `https` URL.
    pub fn get<U: IntoUrl>(url: U) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// # Errors
    ///
    /// Returns a builder error if `url` is not a valid `http` or `https` URL.
    pub fn post<U: IntoUrl>(url: U, body: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::new(Method::POST, url)?.with_body(body))
    }

    /// Adds a header, keeping earlier values of the same name.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the name or value is not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(error::builder)?;
        let value = HeaderValue::from_str(value).map_err(error::builder)?;
        self.headers.append(name, value);
        Ok(self)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The host the dispatcher counts this request against.
    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_accumulate() {
        let request = HttpRequest::get("http://example.com/")
            .unwrap()
            .with_header("accept", "text/plain")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap();
        assert_eq!(request.headers().get_all("accept").iter().count(), 2);
        assert_eq!(request.host(), "example.com");
    }

    #[test]
    fn invalid_headers_are_builder_errors() {
        let err = HttpRequest::get("http://example.com/")
            .unwrap()
            .with_header("bad header", "x")
            .unwrap_err();
        assert!(err.is_builder());
    }
}
