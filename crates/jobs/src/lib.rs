//! In-memory job queue running solver invocations on tokio's blocking pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use sched_core::{CancelToken, RunControl, SolveError, Solver};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use types::{Progress, SchedulingResult, SolveRequest};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
    },
    Solved {
        result: Box<SchedulingResult>,
    },
    /// Rejected before search started.
    Invalid {
        message: String,
        issues: Vec<String>,
    },
    Failed {
        message: String,
    },
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running { .. } => "running",
            JobStatus::Solved { .. } => "solved",
            JobStatus::Invalid { .. } => "invalid",
            JobStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Solved { .. } | JobStatus::Invalid { .. } | JobStatus::Failed { .. }
        )
    }
}

/// Finished jobs kept for result retrieval unless configured otherwise.
pub const DEFAULT_RETAINED: usize = 256;

struct Job {
    seq: u64,
    status: JobStatus,
    cancel: CancelToken,
}

type Table = Arc<RwLock<HashMap<String, Job>>>;

fn set_status(table: &Table, id: &str, status: JobStatus) {
    if let Some(job) = table.write().get_mut(id) {
        job.status = status;
    }
}

pub struct InMemJobs<S: Solver> {
    inner: Table,
    solver: Arc<S>,
    retained: usize,
    next_seq: Arc<AtomicU64>,
}

impl<S: Solver> Clone for InMemJobs<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            solver: self.solver.clone(),
            retained: self.retained,
            next_seq: self.next_seq.clone(),
        }
    }
}

impl<S: Solver> InMemJobs<S> {
    pub fn new(solver: S) -> Self {
        Self::with_retention(solver, DEFAULT_RETAINED)
    }

    /// Keeps at most `retained` finished jobs; the oldest are evicted when a
    /// new job is queued. Queued and running jobs are never evicted.
    pub fn with_retention(solver: S, retained: usize) -> Self {
        Self {
            inner: Default::default(),
            solver: Arc::new(solver),
            retained,
            next_seq: Default::default(),
        }
    }

    fn evict_finished(&self, table: &mut HashMap<String, Job>) {
        let mut finished: Vec<(u64, String)> = table
            .iter()
            .filter(|(_, j)| j.status.is_finished())
            .map(|(id, j)| (j.seq, id.clone()))
            .collect();
        if finished.len() <= self.retained {
            return;
        }
        finished.sort_unstable();
        let excess = finished.len() - self.retained;
        for (_, id) in finished.into_iter().take(excess) {
            debug!(job = %id, "evicting finished job");
            table.remove(&id);
        }
    }

    /// Queues a run and returns immediately. Must be called from within a
    /// tokio runtime.
    pub fn enqueue(&self, request: SolveRequest) -> JobId {
        let id = Uuid::new_v4().to_string();
        let cancel = CancelToken::new();
        {
            let mut table = self.inner.write();
            self.evict_finished(&mut table);
            table.insert(
                id.clone(),
                Job {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    status: JobStatus::Queued,
                    cancel: cancel.clone(),
                },
            );
        }

        let table = self.inner.clone();
        let solver = self.solver.clone();
        let job_id = id.clone();

        tokio::spawn(async move {
            let worker_table = table.clone();
            let worker_id = job_id.clone();
            let handle = tokio::task::spawn_blocking(move || {
                set_status(&worker_table, &worker_id, JobStatus::Running { progress: None });
                let sink_table = worker_table.clone();
                let sink_id = worker_id.clone();
                let control = RunControl::new()
                    .with_cancel(cancel)
                    .with_progress(move |p: &Progress| {
                        set_status(
                            &sink_table,
                            &sink_id,
                            JobStatus::Running {
                                progress: Some(p.clone()),
                            },
                        )
                    });
                solver.solve(&request, &control)
            });

            let status = match handle.await {
                Ok(Ok(result)) => {
                    info!(job = %job_id, termination = ?result.termination, "job solved");
                    JobStatus::Solved {
                        result: Box::new(result),
                    }
                }
                Ok(Err(SolveError::Configuration(e))) => {
                    warn!(job = %job_id, error = %e, "job rejected");
                    JobStatus::Invalid {
                        message: e.to_string(),
                        issues: e.issues().iter().map(|i| i.to_string()).collect(),
                    }
                }
                Ok(Err(e)) => {
                    error!(job = %job_id, error = %e, "job failed");
                    JobStatus::Failed { message: e.to_string() }
                }
                Err(e) => {
                    error!(job = %job_id, error = %e, "solver task aborted");
                    JobStatus::Failed { message: e.to_string() }
                }
            };
            set_status(&table, &job_id, status);
        });

        JobId(id)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.inner.read().get(id).map(|j| j.status.clone())
    }

    /// Requests cooperative cancellation. The run stops at its next
    /// generation boundary and is reported as solved with the best plan so
    /// far. Returns `false` for unknown jobs.
    pub fn cancel(&self, id: &str) -> bool {
        match self.inner.read().get(id) {
            Some(job) => {
                if !job.status.is_finished() {
                    info!(job = %id, "cancellation requested");
                    job.cancel.cancel();
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use sched_core::{ConfigIssue, ConfigurationError};
    use types::TerminationCause;

    /// Spins through generations until cancelled.
    struct Spinner;

    impl Solver for Spinner {
        fn solve(
            &self,
            _: &SolveRequest,
            control: &RunControl,
        ) -> Result<SchedulingResult, SolveError> {
            let mut generation = 0;
            while !control.cancel.is_cancelled() {
                control.report(&Progress {
                    generation,
                    best_fitness: 0.0,
                    best_soft_score: 0.0,
                    best_feasible: false,
                    elapsed_ms: 0,
                });
                generation += 1;
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(SchedulingResult {
                candidates: vec![],
                termination: TerminationCause::Cancelled,
                generations: generation,
                evaluations: 0,
                best_fitness_history: vec![],
                infeasible_courses: vec![],
                seed: 0,
                elapsed_ms: 0,
            })
        }
    }

    fn empty_request() -> SolveRequest {
        SolveRequest {
            input: Default::default(),
            constraints: Default::default(),
            search: Default::default(),
        }
    }

    async fn wait_until<S: Solver>(
        jobs: &InMemJobs<S>,
        id: &JobId,
        done: impl Fn(&JobStatus) -> bool,
    ) -> JobStatus {
        for _ in 0..500 {
            if let Some(s) = jobs.get(&id.0) {
                if done(&s) {
                    return s;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} did not reach the expected state");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn progress_then_cancel() {
        let jobs = InMemJobs::new(Spinner);
        let id = jobs.enqueue(empty_request());

        let running = wait_until(&jobs, &id, |s| {
            matches!(s, JobStatus::Running { progress: Some(p) } if p.generation >= 2)
        })
        .await;
        assert_eq!(running.label(), "running");

        assert!(jobs.cancel(&id.0));
        let done = wait_until(&jobs, &id, JobStatus::is_finished).await;
        match done {
            JobStatus::Solved { result } => {
                assert_eq!(result.termination, TerminationCause::Cancelled)
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    struct Rejecting;

    impl Solver for Rejecting {
        fn solve(&self, _: &SolveRequest, _: &RunControl) -> Result<SchedulingResult, SolveError> {
            Err(ConfigurationError(vec![ConfigIssue::EmptyGrid]).into())
        }
    }

    #[tokio::test]
    async fn configuration_errors_mark_the_job_invalid() {
        let jobs = InMemJobs::new(Rejecting);
        let id = jobs.enqueue(empty_request());
        match wait_until(&jobs, &id, JobStatus::is_finished).await {
            JobStatus::Invalid { issues, .. } => {
                assert_eq!(issues, vec!["time slot grid is empty"])
            }
            other => panic!("unexpected status {other:?}"),
        }
        // finished jobs ignore cancellation but are still known
        assert!(jobs.cancel(&id.0));
    }

    #[tokio::test]
    async fn oldest_finished_jobs_are_evicted() {
        let jobs = InMemJobs::with_retention(Rejecting, 1);
        let first = jobs.enqueue(empty_request());
        wait_until(&jobs, &first, JobStatus::is_finished).await;
        let second = jobs.enqueue(empty_request());
        wait_until(&jobs, &second, JobStatus::is_finished).await;

        let third = jobs.enqueue(empty_request());
        assert!(jobs.get(&first.0).is_none());
        assert!(jobs.get(&second.0).is_some());
        assert!(jobs.get(&third.0).is_some());
    }

    #[tokio::test]
    async fn unknown_jobs() {
        let jobs = InMemJobs::new(Spinner);
        assert!(jobs.get("nope").is_none());
        assert!(!jobs.cancel("nope"));
    }

    #[tokio::test]
    async fn status_serializes_with_tag() {
        let v = serde_json::to_value(JobStatus::Queued).unwrap();
        assert_eq!(v, serde_json::json!({ "status": "queued" }));
        let v = serde_json::to_value(JobStatus::Failed { message: "x".into() }).unwrap();
        assert_eq!(v["status"], "failed");
    }
}
