//! Variation operators. Every operator works on a plan: one optional
//! placement per session, indexed like `Problem::sessions`.

use rand::seq::SliceRandom;
use rand::Rng;
use sched_core::{Placed, Problem};

use crate::occupancy::{place, Keep, Occupancy};

pub(crate) type Plan = Vec<Option<Placed>>;

/// Session indices in placement order: priority tier first, then the courses
/// with the fewest static options.
pub(crate) fn placement_order(problem: &Problem<'_>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..problem.sessions.len()).collect();
    order.sort_by_key(|&i| {
        let s = problem.sessions[i];
        (
            problem.input.courses[s.course].priority,
            problem.courses[s.course].options(),
            s.course,
            s.number,
        )
    });
    order
}

/// Builds a plan from scratch.
pub(crate) fn construct<R: Rng>(problem: &Problem<'_>, order: &[usize], rng: &mut R) -> Plan {
    let mut plan = vec![None; problem.sessions.len()];
    let mut occ = Occupancy::default();
    for &i in order {
        let course = problem.sessions[i].course;
        if let Some(p) = place(problem, &occ, course, Keep::Nothing, rng) {
            occ.insert(problem, &p);
            plan[i] = Some(p);
        }
    }
    plan
}

/// Drops placements that collide with an earlier session (in placement order)
/// and re-places them. Returns the occupancy of the repaired plan.
pub(crate) fn repair<R: Rng>(
    problem: &Problem<'_>,
    order: &[usize],
    plan: &mut Plan,
    rng: &mut R,
) -> Occupancy {
    let mut occ = Occupancy::default();
    for &i in order {
        if let Some(p) = plan[i] {
            if occ.is_free(problem, &p) {
                occ.insert(problem, &p);
            } else {
                plan[i] = None;
            }
        }
    }
    fill_unplaced(problem, order, plan, &mut occ, rng);
    occ
}

pub(crate) fn fill_unplaced<R: Rng>(
    problem: &Problem<'_>,
    order: &[usize],
    plan: &mut Plan,
    occ: &mut Occupancy,
    rng: &mut R,
) {
    for &i in order {
        if plan[i].is_some() {
            continue;
        }
        if let Some(p) = place(problem, occ, problem.sessions[i].course, Keep::Nothing, rng) {
            occ.insert(problem, &p);
            plan[i] = Some(p);
        }
    }
}

/// Takes one half of the courses from `a` and the other half from `b`.
/// The result may contain collisions and must be repaired.
pub(crate) fn crossover<R: Rng>(problem: &Problem<'_>, a: &Plan, b: &Plan, rng: &mut R) -> Plan {
    let mut courses: Vec<usize> = (0..problem.courses.len()).collect();
    courses.shuffle(rng);
    let mut from_b = vec![false; problem.courses.len()];
    for &c in &courses[courses.len() / 2..] {
        from_b[c] = true;
    }
    problem
        .sessions
        .iter()
        .enumerate()
        .map(|(i, s)| if from_b[s.course] { b[i] } else { a[i] })
        .collect()
}

/// Re-rolls each placed session with probability `rate`: either its room and
/// slot or its faculty, checked against the rest of the plan. A failed
/// re-roll keeps the old placement.
pub(crate) fn mutate<R: Rng>(
    problem: &Problem<'_>,
    plan: &mut Plan,
    occ: &mut Occupancy,
    rate: f64,
    rng: &mut R,
) {
    if rate <= 0.0 {
        return;
    }
    for i in 0..plan.len() {
        let Some(old) = plan[i] else { continue };
        if !rng.gen_bool(rate) {
            continue;
        }
        let keep = if rng.gen_bool(0.5) {
            Keep::Faculty(old.faculty)
        } else {
            Keep::RoomSlot(old.room, old.slot)
        };
        occ.remove(problem, &old);
        let next = place(problem, occ, old.course, keep, rng).unwrap_or(old);
        occ.insert(problem, &next);
        plan[i] = Some(next);
    }
}

/// Tournament of `k` random members; `fitness` is indexed like the population.
pub(crate) fn tournament<R: Rng>(fitness: &[f64], k: usize, rng: &mut R) -> usize {
    let mut best = rng.gen_range(0..fitness.len());
    for _ in 1..k {
        let i = rng.gen_range(0..fitness.len());
        if fitness[i] > fitness[best] {
            best = i;
        }
    }
    best
}
