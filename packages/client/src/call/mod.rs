//! Calls and the dispatcher that schedules them

#[allow(clippy::module_inception)]
pub mod call;
pub mod cancel;
pub mod dispatcher;

pub use call::{Call, PendingResponse};
pub use cancel::CancelSignal;
pub use dispatcher::Dispatcher;
