//! Established connections and the pool that shares them

pub mod pool;
pub mod real_connection;

pub use pool::ConnectionPool;
pub use real_connection::{ConnectionPhase, RealConnection};
