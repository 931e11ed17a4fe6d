use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use jobs::JobStatus;
use serde::Serialize;
use types::{Progress, SchedulingResult, TerminationCause};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

/// Job status without the (possibly large) result payload.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl JobView {
    fn new(id: String, status: JobStatus) -> Self {
        let mut view = JobView {
            job_id: id,
            status: status.label(),
            progress: None,
            termination: None,
            message: None,
            issues: vec![],
        };
        match status {
            JobStatus::Queued => {}
            JobStatus::Running { progress } => view.progress = progress,
            JobStatus::Solved { result } => view.termination = Some(result.termination),
            JobStatus::Invalid { message, issues } => {
                view.message = Some(message);
                view.issues = issues;
            }
            JobStatus::Failed { message } => view.message = Some(message),
        }
        view
    }
}

fn lookup(state: &AppState, id: &str) -> Result<JobStatus, ApiError> {
    state
        .jobs
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("job {id} not found")))
}

#[utoipa::path(
        get,
        path = "/v1/jobs/{id}",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Job status", body = JobView),
            (status = 404, description = "Unknown job")
        )
    )]
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    let st = lookup(&state, &id)?;
    Ok(Json(JobView::new(id, st)))
}

#[utoipa::path(
        get,
        path = "/v1/jobs/{id}/result",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 200, description = "Ranked candidate schedules", body = SchedulingResult),
            (status = 404, description = "Unknown job"),
            (status = 409, description = "Job has no result")
        )
    )]
pub async fn result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SchedulingResult>, ApiError> {
    match lookup(&state, &id)? {
        JobStatus::Solved { result } => Ok(Json(*result)),
        other => Err(ApiError::Conflict(format!("job {id} is {}", other.label()))),
    }
}

#[utoipa::path(
        post,
        path = "/v1/jobs/{id}/cancel",
        params(("id" = String, Path, description = "Job ID")),
        responses(
            (status = 202, description = "Cancellation requested", body = JobView),
            (status = 404, description = "Unknown job")
        )
    )]
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobView>), ApiError> {
    if !state.jobs.cancel(&id) {
        return Err(ApiError::NotFound(format!("job {id} not found")));
    }
    let st = lookup(&state, &id)?;
    Ok((StatusCode::ACCEPTED, Json(JobView::new(id, st))))
}
