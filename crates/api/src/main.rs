mod error;
mod state;
mod telemetry;
pub mod routes {
    pub mod explain;
    pub mod grid;
    pub mod health;
    pub mod jobs;
    pub mod solve;
    pub mod validate;
}

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            routes::health::health,
            routes::validate::validate_handler,
            routes::solve::solve,
            routes::jobs::status,
            routes::jobs::result,
            routes::jobs::cancel,
            routes::explain::explain,
            routes::grid::grid,
        ),
        components(schemas(
            types::SolveRequest, types::SchedulingInput, types::Course, types::Faculty,
            types::Classroom, types::TimeSlot, types::PeriodSpec, types::StudentGroup,
            types::Entry, types::Schedule, types::OptimizationConstraints, types::FacultyWorkload,
            types::ClassroomUtilization, types::StudentGaps, types::DepartmentPreference,
            types::SoftWeights, types::ConflictThresholds, types::InfeasiblePenalty,
            types::SearchConfig, types::SchedulingResult, types::CandidateSchedule,
            types::CandidateStatus, types::TerminationCause, types::Violation, types::ViolationKind,
            types::Severity, types::Metrics, types::Evaluation, types::UnplacedSession,
            types::InfeasibleCourse, types::Progress, types::CourseKind, types::RoomType,
            types::Priority, types::Semester, types::Shift, types::CourseId, types::FacultyId,
            types::ClassroomId, types::GroupId, types::SlotId, types::EntryId,
            jobs::JobId, jobs::JobStatus,
            routes::validate::ValidationReport,
            routes::solve::JobCreated,
            routes::jobs::JobView,
            routes::explain::ExplainIn,
            routes::explain::ExplainOut,
            routes::grid::GridIn,
        )),
        tags(
            (name = "timetable", description = "Timetable scheduling API")
        )
    )]
struct ApiDoc;

fn app(app_state: state::AppState) -> Router {
    Router::new()
        .route("/v1/health", get(routes::health::health))
        .route("/v1/validate", post(routes::validate::validate_handler))
        .route("/v1/solve", post(routes::solve::solve))
        .route("/v1/jobs/:id", get(routes::jobs::status))
        .route("/v1/jobs/:id/result", get(routes::jobs::result))
        .route("/v1/jobs/:id/cancel", post(routes::jobs::cancel))
        .route("/v1/explain", post(routes::explain::explain))
        .route("/v1/grid", post(routes::grid::grid))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(telemetry::stack())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app = app(state::AppState::new_default());

    let port = std::env::var("TIMETABLE__SERVER__PORT").unwrap_or_else(|_| "8080".into());
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", port)
        .parse()
        .with_context(|| format!("invalid listen port {port}"))?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app(state::AppState::new_default()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn input() -> Value {
        json!({
            "courses": [{
                "id": "C1", "sessionsPerWeek": 2, "duration": 60, "roomType": "theory",
                "department": "CS", "subject": "cs", "studentGroupId": "G1"
            }],
            "faculty": [{
                "id": "F1", "department": "CS", "maxLoadPerDay": 2, "maxLoadPerWeek": 10,
                "qualifications": ["cs"]
            }],
            "classrooms": [{ "id": "R1", "roomType": "theory", "capacity": 30 }],
            "groups": [{ "id": "G1", "department": "CS", "year": 1, "size": 25 }],
            "timeSlots": [
                { "id": "mon.1", "day": 1, "period": 0, "startTime": "09:00", "endTime": "10:00" },
                { "id": "mon.2", "day": 1, "period": 1, "startTime": "10:00", "endTime": "11:00" }
            ]
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app(state::AppState::new_default())
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validate_reports_issues() {
        let (status, body) = call("POST", "/v1/validate", Some(json!({ "input": input() }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let mut bad = input();
        bad["classrooms"][0]["roomType"] = json!("lab");
        let (_, body) = call("POST", "/v1/validate", Some(json!({ "input": bad }))).await;
        assert_eq!(body["ok"], false);
        assert!(body["errors"][0].as_str().unwrap().contains("no eligible classroom"));
    }

    #[tokio::test]
    async fn explain_flags_double_booking() {
        let entry = |id: &str| {
            json!({
                "id": id, "courseId": "C1", "facultyId": "F1", "classroomId": "R1",
                "studentGroupId": "G1", "timeSlotId": "mon.1", "day": 1
            })
        };
        let body = json!({
            "input": input(),
            "schedule": { "entries": [entry("C1#1"), entry("C1#2")] }
        });
        let (status, out) = call("POST", "/v1/explain", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["evaluation"]["feasible"], false);
        assert_eq!(out["evaluation"]["hardViolations"].as_array().unwrap().len(), 3);
        assert!(out["fitness"].as_f64().unwrap() < 0.0);
    }

    #[tokio::test]
    async fn explain_rejects_bad_constraints() {
        let body = json!({
            "input": input(),
            "constraints": { "weights": { "workload": -1.0 } },
            "schedule": { "entries": [] }
        });
        let (status, out) = call("POST", "/v1/explain", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(out["issues"][0].as_str().unwrap().contains("weights.workload"));
    }

    #[tokio::test]
    async fn grid_endpoint() {
        let body = json!({
            "days": [1, 2],
            "periods": [
                { "startTime": "09:00", "endTime": "10:00" },
                { "startTime": "10:00", "endTime": "11:00", "isBreak": true }
            ]
        });
        let (status, out) = call("POST", "/v1/grid", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out.as_array().unwrap().len(), 4);
        assert_eq!(out[0]["id"], "mon.1");

        let bad = json!({ "days": [9], "periods": [] });
        let (status, out) = call("POST", "/v1/grid", Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(out["issues"].as_array().is_some_and(|a| !a.is_empty()));
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let (status, _) = call("GET", "/v1/jobs/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call("POST", "/v1/jobs/nope/cancel", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn solve_then_fetch_result() {
        let router = app(state::AppState::new_default());
        let body = json!({
            "input": input(),
            "search": { "maxIterations": 5, "populationSize": 6, "randomSeed": 1 }
        });
        let res = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/solve")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let created: Value = serde_json::from_slice(&bytes).unwrap();
        let id = created["jobId"].as_str().unwrap().to_string();

        for _ in 0..400 {
            let res = router
                .clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/v1/jobs/{id}/result"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            if res.status() == StatusCode::OK {
                let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
                let result: Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(result["candidates"][0]["feasible"], true);
                assert_eq!(result["candidates"][0]["status"], "draft");
                return;
            }
            assert_eq!(res.status(), StatusCode::CONFLICT);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job {id} never finished");
    }
}
