use url::Url;

use crate::error::{self, Error};

/// A trait to try to convert some type into a request `Url`.
///
/// This trait is "sealed", such that only types within hopwire can
/// implement it.
pub trait IntoUrl: IntoUrlSealed {}

impl IntoUrl for Url {}
impl IntoUrl for String {}
impl IntoUrl for &str {}
impl IntoUrl for &String {}

pub trait IntoUrlSealed {
    /// Parses and checks that the URL is usable for a request.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the URL is malformed, not `http` or
    /// `https`, or has no host.
    fn into_url(self) -> Result<Url, Error>;
}

impl IntoUrlSealed for Url {
    fn into_url(self) -> Result<Url, Error> {
        if !matches!(self.scheme(), "http" | "https") {
            return Err(error::builder(format!(
                "unsupported URL scheme {:?} in {self}",
                self.scheme()
            )));
        }
        if self.host_str().is_none_or(str::is_empty) {
            return Err(error::builder(format!("URL has no host: {self}")));
        }
        Ok(self)
    }
}

impl IntoUrlSealed for &str {
    fn into_url(self) -> Result<Url, Error> {
        Url::parse(self)
            .map_err(|e| error::builder(format!("invalid URL {self:?}: {e}")))?
            .into_url()
    }
}

impl IntoUrlSealed for &String {
    fn into_url(self) -> Result<Url, Error> {
        self.as_str().into_url()
    }
}

impl IntoUrlSealed for String {
    fn into_url(self) -> Result<Url, Error> {
        self.as_str().into_url()
    }
}
