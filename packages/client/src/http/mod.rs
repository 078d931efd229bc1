//! Request and response values exchanged by calls

pub mod into_url;
pub mod request;
pub mod response;

pub use into_url::IntoUrl;
pub use request::HttpRequest;
pub use response::HttpResponse;
