pub mod checker;
pub mod conflicts;
pub mod control;
pub mod grid;
pub mod problem;
pub mod scoring;
pub mod validate;

use thiserror::Error;

pub use checker::{CheckError, Checker, Delta, ScoreState, Scored};
pub use control::{CancelToken, ChannelSink, ProgressSink, RunControl};
pub use problem::{Placed, Problem, Session};
pub use types::{
    Conflict, Course, Entry, Evaluation, Faculty, OptimizationConstraints, Schedule,
    SchedulingInput, SchedulingResult, SearchConfig, SolveRequest, StudentGroup, TimeSlot,
};
pub use validate::{ConfigIssue, ConfigurationError};

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// Validates everything a run needs before search starts: input records,
/// constraint bounds and search parameters. All issues are reported together.
pub fn validate(request: &SolveRequest) -> Result<Problem<'_>, ConfigurationError> {
    let issues = validate::validate_search(&request.search);
    build_checked(&request.input, &request.constraints, issues)
}

/// Validates input records and constraint bounds, for callers that score a
/// schedule without searching.
pub fn validate_input<'a>(
    input: &'a SchedulingInput,
    constraints: &OptimizationConstraints,
) -> Result<Problem<'a>, ConfigurationError> {
    build_checked(input, constraints, Vec::new())
}

fn build_checked<'a>(
    input: &'a SchedulingInput,
    constraints: &OptimizationConstraints,
    mut issues: Vec<ConfigIssue>,
) -> Result<Problem<'a>, ConfigurationError> {
    let mut all = validate::validate_constraints(constraints);
    all.append(&mut issues);
    match Problem::build(input) {
        Ok(problem) if all.is_empty() => Ok(problem),
        Ok(_) => Err(ConfigurationError(all)),
        Err(ConfigurationError(mut more)) => {
            all.append(&mut more);
            Err(ConfigurationError(all))
        }
    }
}

/// A scheduling backend. Runs are blocking and CPU-bound; callers decide
/// which thread they run on.
pub trait Solver: Send + Sync + 'static {
    fn solve(
        &self,
        request: &SolveRequest,
        control: &RunControl,
    ) -> Result<SchedulingResult, SolveError>;
}
