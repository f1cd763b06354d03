//! Request handling: the city endpoint, its error mapping and the
//! instrumentation middleware shared by every route.

pub mod city;
pub mod error;
pub mod instrument;

pub use error::ApiError;
