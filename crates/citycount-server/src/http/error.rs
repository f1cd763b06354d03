use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use citycount_core::error::{CityCountError, ClientCode};

/// HTTP-facing wrapper so handlers can use `?` on `CityCountError`.
#[derive(Debug)]
pub struct ApiError(pub CityCountError);

impl From<CityCountError> for ApiError {
    fn from(e: CityCountError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.0.client_code().as_str(), error = %self.0, "request failed");
        }
        (status, self.0.to_string()).into_response()
    }
}
