use std::sync::Arc;

use jobs::InMemJobs;
use solver_heur::HeurSolver;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<InMemJobs<HeurSolver>>,
}

impl AppState {
    pub fn new_default() -> Self {
        Self {
            jobs: Arc::new(InMemJobs::new(HeurSolver::new())),
        }
    }
}
