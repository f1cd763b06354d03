use axum::extract::{Path, State};
use axum::Json;

use citycount_core::error::CityCountError;

use crate::app_state::AppState;
use crate::http::ApiError;
use crate::weather::CityTemp;

/// `GET /city/:name/temp`
///
/// Counts the request on the write pipeline, then answers from the weather
/// service. The answer does not wait on, or depend on, the counter write.
/// The name is counted exactly as it arrived in the path; surrounding
/// whitespace only matters for rejecting a blank name.
pub async fn city_temp(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CityTemp>, ApiError> {
    if name.trim().is_empty() {
        return Err(CityCountError::BadRequest("Must provide a city name.".into()).into());
    }

    state.pipeline().enqueue(&name).await;

    let temp = state.weather().city_temp(&name).await?;
    Ok(Json(temp))
}
