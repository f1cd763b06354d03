//! citycount server library entry.
//!
//! Serves `/city/:name/temp`, counting every requested city through a
//! bounded, single-consumer write pipeline into Redis, and exposes pipeline
//! and store health on `/metrics`. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod http;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod router;
pub mod store;
pub mod weather;
