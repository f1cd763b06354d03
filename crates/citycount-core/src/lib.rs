//! citycount core: error surface and the backing-store contract.
//!
//! This crate defines what the server needs from a counter store and how
//! failures are classified, without pulling in any network or runtime
//! dependencies. The Redis client, the write pipeline and the metrics layer
//! all live in `citycount-server` and speak through these types.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod store;

/// Shared result type.
pub use error::{CityCountError, Result};
pub use store::{CounterStore, PoolStats};
