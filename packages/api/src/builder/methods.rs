//! HTTP method entry points and terminal operations

use http::Method;
use hopwire_client::{Call, HttpRequest, HttpResponse, IntoUrl, PendingResponse, Result};

use crate::builder::core::Client;
use crate::builder::request::RequestBuilder;

impl Client {
    /// Starts a request with an arbitrary method.
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url)
    }

    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder<'_> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl IntoUrl) -> RequestBuilder<'_> {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: impl IntoUrl) -> RequestBuilder<'_> {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: impl IntoUrl) -> RequestBuilder<'_> {
        self.request(Method::DELETE, url)
    }

    /// Wraps a built request in a call without running it.
    #[must_use]
    pub fn new_call(&self, request: HttpRequest) -> Call {
        self.inner.new_call(request)
    }

    /// Runs `request` on the current task.
    ///
    /// # Errors
    ///
    /// Returns whatever ended the call.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.new_call(request).execute().await
    }
}

impl RequestBuilder<'_> {
    /// Sends the request and waits for the response.
    ///
    /// # Errors
    ///
    /// Returns the first building error, or whatever ended the call.
    pub async fn send(self) -> Result<HttpResponse> {
        let client = self.client;
        let request = self.build()?;
        client.execute(request).await
    }

    /// Queues the request on the client's dispatcher.
    ///
    /// # Errors
    ///
    /// Returns the first building error.
    pub fn enqueue(self) -> Result<PendingResponse> {
        let client = self.client;
        let request = self.build()?;
        client.new_call(request).enqueue()
    }
}
