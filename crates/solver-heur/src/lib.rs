//! Genetic-algorithm timetable solver and the run facade around it.

mod engine;
mod occupancy;
mod operators;

use std::time::Instant;

use sched_core::conflicts::analyze_resolved;
use sched_core::{Checker, Placed, Problem, RunControl, SolveError, Solver};
use tracing::{info, warn};
use types::{
    CandidateSchedule, CandidateStatus, EntryId, InfeasibleCourse, Metrics, Schedule,
    SchedulingResult, SolveRequest, UnplacedSession,
};

use crate::engine::{Candidate, Engine};

#[derive(Clone, Copy, Debug, Default)]
pub struct HeurSolver;

impl HeurSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for HeurSolver {
    fn solve(
        &self,
        request: &SolveRequest,
        control: &RunControl,
    ) -> Result<SchedulingResult, SolveError> {
        run(request, control)
    }
}

/// Validates the request, searches until a stopping condition holds and
/// returns the ranked candidates.
///
/// Configuration problems are returned before any search work starts. Courses
/// the search could not fully place are listed in
/// [`SchedulingResult::infeasible_courses`] and the missing sessions on each
/// candidate; nothing is dropped silently.
pub fn run(request: &SolveRequest, control: &RunControl) -> Result<SchedulingResult, SolveError> {
    let started = Instant::now();
    let problem = sched_core::validate(request)?;
    let checker = Checker::new(&problem, &request.constraints);
    info!(
        courses = request.input.courses.len(),
        sessions = problem.sessions.len(),
        population = request.search.population_size,
        seed = request.search.random_seed,
        "starting search"
    );

    let outcome = Engine::new(&checker, &request.search).run(control);

    let mut candidates: Vec<CandidateSchedule> = outcome
        .hall_of_fame
        .iter()
        .enumerate()
        .map(|(rank, c)| assemble(&checker, c, rank + 1))
        .collect();
    flag_pareto(&mut candidates);

    let infeasible_courses = outcome
        .hall_of_fame
        .first()
        .map(|best| infeasible_courses(&problem, best))
        .unwrap_or_default();
    for c in &infeasible_courses {
        warn!(
            course = %c.course_id,
            placed = c.placed,
            required = c.required,
            "course not fully placed"
        );
    }

    Ok(SchedulingResult {
        candidates,
        termination: outcome.termination,
        generations: outcome.generations,
        evaluations: outcome.evaluations,
        best_fitness_history: outcome.history,
        infeasible_courses,
        seed: request.search.random_seed,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

fn assemble(checker: &Checker<'_>, c: &Candidate, rank: usize) -> CandidateSchedule {
    let problem = checker.problem();
    let mut entries = Vec::new();
    let mut placed: Vec<Placed> = Vec::new();
    let mut unplaced = Vec::new();
    for (session, slot) in problem.sessions.iter().zip(&c.plan) {
        match slot {
            Some(p) => {
                entries.push(problem.entry(session, p));
                placed.push(*p);
            }
            None => {
                let course = &problem.input.courses[session.course];
                let group = problem.courses[session.course].group;
                unplaced.push(UnplacedSession {
                    entry_id: EntryId::for_session(&course.id, session.number),
                    course_id: course.id.clone(),
                    student_group_id: problem.input.groups[group].id.clone(),
                });
            }
        }
    }
    let ids: Vec<&EntryId> = entries.iter().map(|e| &e.id).collect();
    let conflicts = analyze_resolved(checker, &ids, &placed);

    CandidateSchedule {
        rank,
        fitness: c.fitness,
        soft_score: c.scored.soft_score,
        feasible: c.scored.feasible(),
        generation: c.born,
        pareto_optimal: false,
        metrics: c.scored.metrics.clone(),
        conflicts,
        unplaced,
        status: CandidateStatus::Draft,
        schedule: Schedule { entries },
    }
}

fn objectives(c: &CandidateSchedule) -> [f64; 5] {
    let Metrics {
        teacher_workload_balance,
        classroom_utilization,
        student_gaps,
        department_satisfaction,
        ..
    } = c.metrics;
    [
        if c.feasible { 1.0 } else { 0.0 },
        teacher_workload_balance,
        classroom_utilization,
        student_gaps,
        department_satisfaction,
    ]
}

fn dominates(a: &[f64; 5], b: &[f64; 5]) -> bool {
    a.iter().zip(b).all(|(x, y)| x >= y) && a.iter().zip(b).any(|(x, y)| x > y)
}

/// Marks candidates no other returned candidate dominates on feasibility and
/// the four soft sub-metrics.
fn flag_pareto(candidates: &mut [CandidateSchedule]) {
    let points: Vec<[f64; 5]> = candidates.iter().map(objectives).collect();
    for (i, c) in candidates.iter_mut().enumerate() {
        c.pareto_optimal = !points
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && dominates(other, &points[i]));
    }
}

fn infeasible_courses(problem: &Problem<'_>, best: &Candidate) -> Vec<InfeasibleCourse> {
    let input = problem.input;
    let mut placed = vec![0u32; input.courses.len()];
    for p in best.plan.iter().flatten() {
        placed[p.course] += 1;
    }
    input
        .courses
        .iter()
        .enumerate()
        .filter(|(ci, c)| placed[*ci] < c.sessions_per_week)
        .map(|(ci, c)| {
            let info = &problem.courses[ci];
            let reachable = info
                .slots
                .iter()
                .filter(|&&s| info.faculty.iter().any(|&f| problem.faculty_available(f, s)))
                .count() as u32;
            let reason = if reachable < c.sessions_per_week {
                format!(
                    "only {reachable} slots are open to its eligible faculty for {} sessions",
                    c.sessions_per_week
                )
            } else {
                "no conflict-free faculty, classroom and slot combination remained \
                 for the missing sessions"
                    .to_string()
            };
            InfeasibleCourse {
                course_id: c.id.clone(),
                required: c.sessions_per_week,
                placed: placed[ci],
                reason,
            }
        })
        .collect()
}
