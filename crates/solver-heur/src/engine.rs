//! Generational genetic search.
//!
//! Generation 0 is the constructed population. Each later generation keeps the
//! elite unchanged and fills the rest with offspring bred by tournament
//! selection, crossover with repair, and mutation. Cancellation, the
//! iteration cap, the deadline and stagnation are checked at generation
//! boundaries only.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sched_core::validate::elite_count;
use sched_core::{Checker, RunControl, ScoreState, Scored};
use tracing::{debug, info};
use types::{Progress, SearchConfig, TerminationCause};

use crate::operators::{self, Plan};

#[derive(Clone)]
pub(crate) struct Candidate {
    pub plan: Plan,
    pub state: ScoreState,
    pub scored: Scored,
    pub fitness: f64,
    /// Generation the plan was first produced in.
    pub born: u32,
}

/// An unevaluated child and the population member it was derived from.
struct Offspring {
    plan: Plan,
    base: usize,
    changed: Vec<usize>,
}

pub(crate) struct Outcome {
    /// Best distinct plans seen, best first.
    pub hall_of_fame: Vec<Candidate>,
    pub termination: TerminationCause,
    pub generations: u32,
    pub evaluations: u64,
    pub history: Vec<f64>,
}

fn by_fitness(a: &Candidate, b: &Candidate) -> std::cmp::Ordering {
    b.fitness.total_cmp(&a.fitness)
}

fn full(checker: &Checker<'_>, plan: Plan, born: u32) -> Candidate {
    let state = checker.state_from(plan.iter().flatten());
    finish(checker, plan, state, born)
}

fn finish(checker: &Checker<'_>, plan: Plan, state: ScoreState, born: u32) -> Candidate {
    let scored = checker.score(&state);
    Candidate {
        fitness: checker.fitness(&scored),
        plan,
        state,
        scored,
        born,
    }
}

/// Scores a child from its parent's state when few sessions changed.
fn score_offspring(
    checker: &Checker<'_>,
    population: &[Candidate],
    child: Offspring,
    born: u32,
) -> Candidate {
    if child.changed.len() * 2 >= child.plan.len() {
        return full(checker, child.plan, born);
    }
    let parent = &population[child.base];
    let mut state = parent.state.clone();
    for &i in &child.changed {
        if let Some(old) = &parent.plan[i] {
            checker.apply(&mut state, old, false);
        }
        if let Some(new) = &child.plan[i] {
            checker.apply(&mut state, new, true);
        }
    }
    finish(checker, child.plan, state, born)
}

struct HallOfFame {
    size: usize,
    members: Vec<Candidate>,
}

impl HallOfFame {
    fn offer(&mut self, c: &Candidate) {
        if self.members.iter().any(|m| m.plan == c.plan) {
            return;
        }
        if self.members.len() == self.size {
            match self.members.last() {
                Some(worst) if c.fitness > worst.fitness => {
                    self.members.pop();
                }
                _ => return,
            }
        }
        let at = self.members.partition_point(|m| m.fitness >= c.fitness);
        self.members.insert(at, c.clone());
    }

    fn best(&self) -> Option<&Candidate> {
        self.members.first()
    }
}

pub(crate) struct Engine<'c, 'a> {
    checker: &'c Checker<'a>,
    search: &'c SearchConfig,
    order: Vec<usize>,
    rng: ChaCha8Rng,
}

impl<'c, 'a> Engine<'c, 'a> {
    pub fn new(checker: &'c Checker<'a>, search: &'c SearchConfig) -> Self {
        Self {
            checker,
            search,
            order: operators::placement_order(checker.problem()),
            rng: ChaCha8Rng::seed_from_u64(search.random_seed),
        }
    }

    fn evaluate(
        &self,
        population: &[Candidate],
        children: Vec<Offspring>,
        born: u32,
    ) -> Vec<Candidate> {
        let checker = self.checker;
        if children.len() >= self.search.parallel_threshold {
            children
                .into_par_iter()
                .map(|c| score_offspring(checker, population, c, born))
                .collect()
        } else {
            children
                .into_iter()
                .map(|c| score_offspring(checker, population, c, born))
                .collect()
        }
    }

    fn breed(&mut self, population: &[Candidate], fitness: &[f64]) -> Offspring {
        let problem = self.checker.problem();
        let k = self.search.tournament_size;
        let base = operators::tournament(fitness, k, &mut self.rng);
        let mut plan = if self.rng.gen_bool(self.search.crossover_rate) {
            let other = operators::tournament(fitness, k, &mut self.rng);
            let (a, b) = (&population[base].plan, &population[other].plan);
            operators::crossover(problem, a, b, &mut self.rng)
        } else {
            population[base].plan.clone()
        };
        let mut occ = operators::repair(problem, &self.order, &mut plan, &mut self.rng);
        operators::mutate(problem, &mut plan, &mut occ, self.search.mutation_rate, &mut self.rng);
        operators::fill_unplaced(problem, &self.order, &mut plan, &mut occ, &mut self.rng);

        let parent = &population[base].plan;
        let changed = (0..plan.len()).filter(|&i| plan[i] != parent[i]).collect();
        Offspring { plan, base, changed }
    }

    pub fn run(mut self, control: &RunControl) -> Outcome {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.search.timeout_seconds);
        let size = self.search.population_size;
        let elites = elite_count(self.search).min(size);
        let every = self.search.progress_every.max(1);
        let checker = self.checker;
        let problem = checker.problem();

        let plans: Vec<Plan> = (0..size)
            .map(|_| operators::construct(problem, &self.order, &mut self.rng))
            .collect();
        let mut evaluations = plans.len() as u64;
        let mut population: Vec<Candidate> = if plans.len() >= self.search.parallel_threshold {
            plans.into_par_iter().map(|p| full(checker, p, 0)).collect()
        } else {
            plans.into_iter().map(|p| full(checker, p, 0)).collect()
        };
        population.sort_by(by_fitness);

        let mut hall = HallOfFame {
            size: self.search.result_count.max(1),
            members: Vec::new(),
        };
        population.iter().for_each(|c| hall.offer(c));

        let mut best = population[0].fitness;
        let mut history = vec![best];
        let mut stagnant = 0u32;
        let mut generation = 0u32;
        self.report(control, &hall, generation, started);

        let termination = loop {
            if control.cancel.is_cancelled() {
                break TerminationCause::Cancelled;
            }
            if generation >= self.search.max_iterations {
                break TerminationCause::IterationLimit;
            }
            if started.elapsed() >= deadline {
                break TerminationCause::Timeout;
            }
            let patience = self.search.stagnation_generations;
            if patience > 0 && stagnant >= patience {
                break TerminationCause::Stagnation;
            }
            generation += 1;

            let fitness: Vec<f64> = population.iter().map(|c| c.fitness).collect();
            let children: Vec<Offspring> = (elites..size)
                .map(|_| self.breed(&population, &fitness))
                .collect();
            evaluations += children.len() as u64;
            let offspring = self.evaluate(&population, children, generation);

            population.truncate(elites);
            population.extend(offspring);
            population.sort_by(by_fitness);
            population.iter().for_each(|c| hall.offer(c));

            if population[0].fitness > best {
                best = population[0].fitness;
                stagnant = 0;
            } else {
                stagnant += 1;
            }
            history.push(best);

            if generation % every == 0 {
                self.report(control, &hall, generation, started);
            }
        };

        info!(
            ?termination,
            generations = generation,
            evaluations,
            best_fitness = best,
            "search finished"
        );
        Outcome {
            hall_of_fame: hall.members,
            termination,
            generations: generation,
            evaluations,
            history,
        }
    }

    fn report(&self, control: &RunControl, hall: &HallOfFame, generation: u32, started: Instant) {
        let Some(best) = hall.best() else { return };
        let progress = Progress {
            generation,
            best_fitness: best.fitness,
            best_soft_score: best.scored.soft_score,
            best_feasible: best.scored.feasible(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        debug!(generation, best_fitness = best.fitness, "generation complete");
        control.report(&progress);
    }
}
