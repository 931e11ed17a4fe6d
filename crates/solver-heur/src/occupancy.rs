//! Per-candidate resource bookkeeping and constrained random placement.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use sched_core::{Placed, Problem};

/// Sessions are placed in the first week; weekly patterns repeat it.
pub(crate) const WEEK: u32 = 1;

/// What a placement must keep from the previous choice.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Keep {
    Nothing,
    /// Re-roll room and slot.
    Faculty(usize),
    /// Re-roll faculty.
    RoomSlot(usize, usize),
}

#[derive(Default, Clone)]
pub(crate) struct Occupancy {
    faculty: HashSet<(usize, usize)>,
    room: HashSet<(usize, usize)>,
    group: HashSet<(usize, usize)>,
    faculty_day: HashMap<(usize, u8), u32>,
    faculty_week: HashMap<usize, u32>,
}

impl Occupancy {
    pub(crate) fn is_free(&self, problem: &Problem<'_>, p: &Placed) -> bool {
        !self.faculty.contains(&(p.faculty, p.slot))
            && !self.room.contains(&(p.room, p.slot))
            && !self.group.contains(&(p.group, p.slot))
            && problem.faculty_available(p.faculty, p.slot)
    }

    fn within_ceilings(&self, problem: &Problem<'_>, faculty: usize, slot: usize) -> bool {
        let f = &problem.input.faculty[faculty];
        let day = problem.slots[slot].day;
        self.faculty_day.get(&(faculty, day)).copied().unwrap_or(0) < f.max_load_per_day
            && self.faculty_week.get(&faculty).copied().unwrap_or(0) < f.max_load_per_week
    }

    pub(crate) fn insert(&mut self, problem: &Problem<'_>, p: &Placed) {
        self.faculty.insert((p.faculty, p.slot));
        self.room.insert((p.room, p.slot));
        self.group.insert((p.group, p.slot));
        *self
            .faculty_day
            .entry((p.faculty, problem.slots[p.slot].day))
            .or_default() += 1;
        *self.faculty_week.entry(p.faculty).or_default() += 1;
    }

    pub(crate) fn remove(&mut self, problem: &Problem<'_>, p: &Placed) {
        self.faculty.remove(&(p.faculty, p.slot));
        self.room.remove(&(p.room, p.slot));
        self.group.remove(&(p.group, p.slot));
        if let Some(n) = self.faculty_day.get_mut(&(p.faculty, problem.slots[p.slot].day)) {
            *n = n.saturating_sub(1);
        }
        if let Some(n) = self.faculty_week.get_mut(&p.faculty) {
            *n = n.saturating_sub(1);
        }
    }
}

/// Picks a conflict-free `(faculty, room, slot)` for one session of `course`.
///
/// The first pass honours each faculty member's daily and weekly session
/// ceilings; the second ignores them. Returns `None` when no combination is
/// free, in which case the session stays unplaced.
pub(crate) fn place<R: Rng>(
    problem: &Problem<'_>,
    occ: &Occupancy,
    course: usize,
    keep: Keep,
    rng: &mut R,
) -> Option<Placed> {
    let info = &problem.courses[course];
    for respect_ceilings in [true, false] {
        let mut slots = match keep {
            Keep::RoomSlot(_, s) => vec![s],
            _ => info.slots.clone(),
        };
        slots.shuffle(rng);

        for &slot in &slots {
            if occ.group.contains(&(info.group, slot)) {
                continue;
            }
            let faculty: Vec<usize> = match keep {
                Keep::Faculty(f) => vec![f],
                _ => info.faculty.clone(),
            }
            .into_iter()
            .filter(|&f| {
                problem.faculty_available(f, slot)
                    && !occ.faculty.contains(&(f, slot))
                    && (!respect_ceilings || occ.within_ceilings(problem, f, slot))
            })
            .collect();
            let rooms: Vec<usize> = match keep {
                Keep::RoomSlot(r, _) => vec![r],
                _ => info.rooms.clone(),
            }
            .into_iter()
            .filter(|&r| !occ.room.contains(&(r, slot)))
            .collect();

            let (Some(&faculty), Some(&room)) = (faculty.choose(rng), rooms.choose(rng)) else {
                continue;
            };
            return Some(Placed {
                course,
                faculty,
                room,
                group: info.group,
                slot,
                week: WEEK,
            });
        }
    }
    None
}
