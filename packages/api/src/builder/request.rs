//! Per-request builder
//!
//! Header problems are remembered and reported when the request is sent,
//! so the chain never has to be interrupted.

use bytes::Bytes;
use http::{Method, header};
use hopwire_client::{HttpRequest, IntoUrl, Result};

use crate::builder::core::Client;

/// Content type enumeration for the common body encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// application/json content type
    ApplicationJson,
    /// application/x-www-form-urlencoded content type
    ApplicationFormUrlEncoded,
    /// application/octet-stream content type
    ApplicationOctetStream,
    /// text/plain content type
    TextPlain,
    /// text/html content type
    TextHtml,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::ApplicationJson => "application/json",
            ContentType::ApplicationFormUrlEncoded => "application/x-www-form-urlencoded",
            ContentType::ApplicationOctetStream => "application/octet-stream",
            ContentType::TextPlain => "text/plain",
            ContentType::TextHtml => "text/html",
        }
    }
}

/// Assembles one request for a [`Client`].
#[must_use]
pub struct RequestBuilder<'a> {
    pub(crate) client: &'a Client,
    pub(crate) request: Result<HttpRequest>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client, method: Method, url: impl IntoUrl) -> Self {
        Self {
            client,
            request: HttpRequest::new(method, url),
        }
    }

    /// Appends a header. An invalid name or value fails the request when
    /// it is sent.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request = self.request.and_then(|request| request.with_header(name, value));
        self
    }

    pub fn user_agent(self, user_agent: &str) -> Self {
        self.header(header::USER_AGENT.as_str(), user_agent)
    }

    pub fn accept(self, content_type: ContentType) -> Self {
        self.header(header::ACCEPT.as_str(), content_type.as_str())
    }

    pub fn content_type(self, content_type: ContentType) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type.as_str())
    }

    /// Sets an `Authorization: Bearer` header.
    pub fn bearer_auth(self, token: &str) -> Self {
        let value = format!("Bearer {token}");
        self.header(header::AUTHORIZATION.as_str(), &value)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.request = self.request.map(|request| request.with_body(body));
        self
    }

    /// The request as built so far.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building.
    pub fn build(self) -> Result<HttpRequest> {
        self.request
    }
}
