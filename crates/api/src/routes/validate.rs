use axum::Json;
use serde::Serialize;
use types::SolveRequest;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/v1/validate",
    request_body = SolveRequest,
    responses(
    (status = 200, description = "Validation result", body = ValidationReport)
    )
)]
pub async fn validate_handler(Json(request): Json<SolveRequest>) -> Json<ValidationReport> {
    match sched_core::validate(&request) {
        Ok(_) => Json(ValidationReport { ok: true, errors: vec![] }),
        Err(e) => Json(ValidationReport {
            ok: false,
            errors: e.issues().iter().map(|i| i.to_string()).collect(),
        }),
    }
}
