//! Addresses, routes and route selection
//!
//! An [`Address`] is everything needed to reach an origin; a [`Route`] is one
//! concrete way to do it (proxy plus socket target). [`RouteSelector`] expands
//! an address into routes, consulting the shared [`RouteDatabase`] so that
//! recently failed routes are tried last.

pub mod address;
pub mod database;
#[allow(clippy::module_inception)]
pub mod route;
pub mod selector;

pub use address::Address;
pub use database::RouteDatabase;
pub use route::{Route, SocketTarget};
pub use selector::{RouteSelector, Selection};
