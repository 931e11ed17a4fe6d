use axum::Json;
use sched_core::grid::generate_grid;
use serde::Deserialize;
use types::{PeriodSpec, TimeSlot};
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Deserialize, ToSchema)]
pub struct GridIn {
    /// Day indices, 1 = Monday.
    pub days: Vec<u8>,
    pub periods: Vec<PeriodSpec>,
}

#[utoipa::path(
    post,
    path = "/v1/grid",
    request_body = GridIn,
    responses(
    (status = 200, description = "Generated slot grid", body = [TimeSlot]),
    (status = 422, description = "Invalid days or periods")
    )
)]
pub async fn grid(Json(body): Json<GridIn>) -> Result<Json<Vec<TimeSlot>>, ApiError> {
    generate_grid(&body.days, &body.periods).map(Json).map_err(|issues| {
        let issues: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        ApiError::Invalid {
            message: "invalid slot grid".into(),
            issues,
        }
    })
}
