//! Shared error type across citycount crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input.
    BadRequest,
    /// Invalid or missing configuration.
    Config,
    /// Backing store could not serve the call.
    StoreUnavailable,
    /// Upstream HTTP dependency failed.
    Upstream,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Config => "CONFIG",
            ClientCode::StoreUnavailable => "STORE_UNAVAILABLE",
            ClientCode::Upstream => "UPSTREAM",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CityCountError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum CityCountError {
    #[error("{0}")]
    BadRequest(String),
    #[error("config: {0}")]
    Config(String),
    #[error("store: {0}")]
    Store(String),
    #[error("store operation timed out after {0} ms")]
    StoreTimeout(u64),
    #[error("timed out waiting {0} ms for a pooled connection")]
    PoolTimeout(u64),
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl CityCountError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            CityCountError::BadRequest(_) => ClientCode::BadRequest,
            CityCountError::Config(_) => ClientCode::Config,
            CityCountError::Store(_)
            | CityCountError::StoreTimeout(_)
            | CityCountError::PoolTimeout(_) => ClientCode::StoreUnavailable,
            CityCountError::Upstream(_) => ClientCode::Upstream,
            CityCountError::Internal(_) => ClientCode::Internal,
        }
    }
}
