use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sched_core::{CheckError, ConfigurationError};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Invalid { message: String, issues: Vec<String> },
}

#[derive(Serialize)]
struct Body<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "no_issues")]
    issues: &'a [String],
}

fn no_issues(issues: &&[String]) -> bool {
    issues.is_empty()
}

impl From<ConfigurationError> for ApiError {
    fn from(e: ConfigurationError) -> Self {
        ApiError::Invalid {
            message: e.to_string(),
            issues: e.issues().iter().map(|i| i.to_string()).collect(),
        }
    }
}

impl From<CheckError> for ApiError {
    fn from(e: CheckError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, issues) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.as_str(), &[][..]),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.as_str(), &[][..]),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.as_str(), &[][..]),
            ApiError::Invalid { message, issues } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message.as_str(), issues.as_slice())
            }
        };
        (status, Json(Body { error: message, issues })).into_response()
    }
}
