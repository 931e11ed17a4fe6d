use axum::Json;
use sched_core::{conflicts::analyze, validate_input, Checker};
use serde::{Deserialize, Serialize};
use types::{Conflict, Evaluation, OptimizationConstraints, Schedule, SchedulingInput};
use utoipa::ToSchema;

use crate::error::ApiError;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExplainIn {
    pub input: SchedulingInput,
    #[serde(default)]
    pub constraints: OptimizationConstraints,
    pub schedule: Schedule,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExplainOut {
    pub fitness: f64,
    pub evaluation: Evaluation,
    pub conflicts: Vec<Conflict>,
}

/// Scores a caller-supplied schedule and lists its conflicts.
#[utoipa::path(
    post,
    path = "/v1/explain",
    request_body = ExplainIn,
    responses(
    (status = 200, description = "Evaluation and conflicts for the schedule", body = ExplainOut),
    (status = 400, description = "Schedule references unknown records"),
    (status = 422, description = "Invalid input records or constraint settings")
    )
)]
pub async fn explain(Json(body): Json<ExplainIn>) -> Result<Json<ExplainOut>, ApiError> {
    let problem = validate_input(&body.input, &body.constraints)?;
    let checker = Checker::new(&problem, &body.constraints);
    let evaluation = checker.evaluate(&body.schedule)?;
    let conflicts = analyze(&checker, &body.schedule)?;
    let placed = body
        .schedule
        .entries
        .iter()
        .map(|e| problem.resolve(e))
        .collect::<Result<Vec<_>, _>>()?;
    let fitness = checker.fitness(&checker.score(&checker.state_from(&placed)));
    Ok(Json(ExplainOut {
        fitness,
        evaluation,
        conflicts,
    }))
}
