//! Exchanges: leasing a stream on a pooled or freshly connected connection
//!
//! [`RoutePlanner`] decides whether to reuse a pooled connection or which
//! route to connect next. The finders drive it: [`SequentialExchangeFinder`]
//! one route at a time, [`FastFallbackExchangeFinder`] racing routes with a
//! staggered start.

pub mod codec;
pub mod connect_plan;
pub mod finder;
pub mod lease;
pub mod planner;

pub use codec::{ExchangeCodec, StreamError, UnconfiguredCodec};
pub use connect_plan::{ConnectPlan, ConnectSettings};
pub use finder::{ExchangeFinder, FastFallbackExchangeFinder, SequentialExchangeFinder};
pub use lease::Exchange;
pub use planner::{Plan, RoutePlanner};
