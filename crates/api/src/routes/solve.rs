use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use types::SolveRequest;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    pub job_id: String,
    pub status: &'static str,
}

/// Queues a scheduling run. Configuration problems surface on the job as
/// `invalid`; use `/v1/validate` to check a request synchronously.
#[utoipa::path(
        post,
        path = "/v1/solve",
        request_body = SolveRequest,
        responses((status = 202, description = "Job enqueued", body = JobCreated))
    )]
pub async fn solve(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> (StatusCode, Json<JobCreated>) {
    let id = state.jobs.enqueue(request);
    tracing::info!(job = %id, "job enqueued");
    (
        StatusCode::ACCEPTED,
        Json(JobCreated {
            job_id: id.0,
            status: "queued",
        }),
    )
}
