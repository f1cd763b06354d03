//! citycount: a city temperature service that counts which cities are asked for.
//!
//! `GET /city/:name/temp` answers from the weather service. Meanwhile the city
//! name is handed to a bounded write pipeline, and one worker turns it into a
//! Redis `INCR`. The pool, the queue and every store call show up on
//! `/metrics`.
//!
//! - [`core`]: error type with client codes, the `CounterStore` seam and pool stats.
//! - [`server`]: config, Redis store, write pipeline, weather client, HTTP surface.

pub mod core {
    pub use citycount_core::*;
}

pub mod server {
    pub use citycount_server::*;
}
