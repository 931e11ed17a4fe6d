//! Hard-constraint detection and soft scoring.
//!
//! [`ScoreState`] is a multiset of placements plus the integer aggregates every
//! metric is derived from. Adding or removing one placement touches only the
//! occupancy keys of its faculty, room and group at its slot and the gap
//! profile of its group's day, so [`Checker::evaluate_delta`] runs in time
//! proportional to those neighbours rather than the whole schedule.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use types::{
    Entry, EntryId, Evaluation, Metrics, OptimizationConstraints, Schedule, Severity, Violation,
    ViolationKind,
};

use crate::problem::{Placed, Problem};
use crate::scoring::{self, DeptCounts};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("entry {entry} references unknown {kind} {id}")]
    UnknownReference {
        entry: String,
        kind: &'static str,
        id: String,
    },
    #[error("entry {entry} is not part of the scored schedule")]
    NotScheduled { entry: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Resource {
    Faculty(usize),
    Room(usize),
    Group(usize),
}

impl Resource {
    fn of(p: &Placed) -> [Resource; 3] {
        [
            Resource::Faculty(p.faculty),
            Resource::Room(p.room),
            Resource::Group(p.group),
        ]
    }

    fn kind(self) -> ViolationKind {
        match self {
            Resource::Faculty(_) => ViolationKind::Faculty,
            Resource::Room(_) => ViolationKind::Classroom,
            Resource::Group(_) => ViolationKind::Student,
        }
    }
}

/// Per-entry hard faults that do not depend on other entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    FacultyUnavailable,
    FacultyIneligible,
    RoomClosed,
    RoomType,
    Capacity,
    BreakSlot,
    SlotTooShort,
    /// Attending group differs from the course's resolved group.
    WrongGroup,
}

impl Fault {
    fn kind(self) -> ViolationKind {
        match self {
            Fault::FacultyUnavailable | Fault::FacultyIneligible => ViolationKind::Faculty,
            Fault::WrongGroup => ViolationKind::Student,
            _ => ViolationKind::Resource,
        }
    }
}

#[derive(Clone, Debug)]
struct DeptSlots {
    preferred: Vec<bool>,
    avoided: Vec<bool>,
}

/// Incrementally maintained scoring aggregates.
#[derive(Clone, Debug, Default)]
pub struct ScoreState {
    placements: HashMap<Placed, u32>,
    occupancy: HashMap<(Resource, usize, u32), u32>,
    double_booked: usize,
    rooms_used: usize,
    weeks: BTreeMap<u32, usize>,
    faculty_minutes: Vec<i64>,
    dev_sq_sum: i64,
    group_days: HashMap<(usize, u8, u32), BTreeMap<u32, u32>>,
    total_gaps: u64,
    active_days: u64,
    zero_gap_days: u64,
    departments: Vec<DeptCounts>,
    course_placed: Vec<u32>,
    short_courses: usize,
    over_courses: usize,
    entry_faults: usize,
    entries: usize,
}

impl ScoreState {
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn faculty_minutes(&self, faculty: usize) -> i64 {
        self.faculty_minutes.get(faculty).copied().unwrap_or(0)
    }

    pub fn placed_sessions(&self, course: usize) -> u32 {
        self.course_placed.get(course).copied().unwrap_or(0)
    }

    /// Whether this exact placement is part of the state.
    pub fn holds(&self, p: &Placed) -> bool {
        self.placements.contains_key(p)
    }
}

/// Scores derived from a [`ScoreState`].
#[derive(Clone, Debug, PartialEq)]
pub struct Scored {
    pub soft_score: f64,
    pub hard_count: usize,
    pub metrics: Metrics,
}

impl Scored {
    pub fn feasible(&self) -> bool {
        self.hard_count == 0
    }
}

/// A single-entry change for incremental re-scoring.
#[derive(Clone, Copy, Debug)]
pub enum Delta<'e> {
    Added(&'e Entry),
    Removed(&'e Entry),
}

pub struct Checker<'a> {
    problem: &'a Problem<'a>,
    constraints: &'a OptimizationConstraints,
    departments: Vec<DeptSlots>,
    course_dept: Vec<Option<usize>>,
    in_scope: usize,
    /// Non-break periods per day, ascending.
    day_periods: BTreeMap<u8, Vec<u32>>,
}

impl<'a> Checker<'a> {
    pub fn new(problem: &'a Problem<'a>, constraints: &'a OptimizationConstraints) -> Self {
        let input = problem.input;
        let mut dept_index: HashMap<&str, usize> = HashMap::new();
        let mut departments = Vec::with_capacity(constraints.department_preferences.len());
        for (name, pref) in &constraints.department_preferences {
            let matches = |list: &[String]| -> Vec<bool> {
                input
                    .time_slots
                    .iter()
                    .map(|s| {
                        let label = s.label();
                        list.iter().any(|x| *x == s.id.0 || *x == label)
                    })
                    .collect()
            };
            dept_index.insert(name.as_str(), departments.len());
            departments.push(DeptSlots {
                preferred: matches(&pref.preferred_slots),
                avoided: matches(&pref.avoided_slots),
            });
        }
        let course_dept = input
            .courses
            .iter()
            .map(|c| dept_index.get(c.department.as_str()).copied())
            .collect();

        let mut day_periods: BTreeMap<u8, Vec<u32>> = BTreeMap::new();
        for s in problem.slots.iter().filter(|s| !s.is_break) {
            day_periods.entry(s.day).or_default().push(s.period);
        }
        for v in day_periods.values_mut() {
            v.sort_unstable();
        }

        Self {
            problem,
            constraints,
            departments,
            course_dept,
            in_scope: problem.in_scope_faculty.iter().filter(|x| **x).count(),
            day_periods,
        }
    }

    pub fn problem(&self) -> &'a Problem<'a> {
        self.problem
    }

    pub fn constraints(&self) -> &'a OptimizationConstraints {
        self.constraints
    }

    pub fn empty_state(&self) -> ScoreState {
        let input = self.problem.input;
        ScoreState {
            faculty_minutes: vec![0; input.faculty.len()],
            dev_sq_sum: self.initial_dev_sq(),
            departments: vec![DeptCounts::default(); self.departments.len()],
            course_placed: vec![0; input.courses.len()],
            short_courses: input.courses.len(),
            ..ScoreState::default()
        }
    }

    fn band_minutes(&self) -> (i64, i64) {
        let w = &self.constraints.faculty_workload;
        (
            w.min_hours_per_week as i64 * 60,
            w.max_hours_per_week as i64 * 60,
        )
    }

    fn initial_dev_sq(&self) -> i64 {
        let (min, max) = self.band_minutes();
        let d = scoring::band_deviation(0, min, max);
        self.in_scope as i64 * d * d
    }

    pub fn state_from<'p>(&self, placed: impl IntoIterator<Item = &'p Placed>) -> ScoreState {
        let mut st = self.empty_state();
        for p in placed {
            self.apply(&mut st, p, true);
        }
        st
    }

    pub fn faults(&self, p: &Placed) -> Vec<Fault> {
        let input = self.problem.input;
        let course = &input.courses[p.course];
        let room = &input.classrooms[p.room];
        let slot = &self.problem.slots[p.slot];
        let mut out = Vec::new();
        if !self.problem.faculty_available(p.faculty, p.slot) {
            out.push(Fault::FacultyUnavailable);
        }
        if !self.problem.faculty_is_eligible(p.course, p.faculty) {
            out.push(Fault::FacultyIneligible);
        }
        if !room.is_available {
            out.push(Fault::RoomClosed);
        }
        if room.room_type != course.room_type {
            out.push(Fault::RoomType);
        }
        if room.capacity < input.groups[p.group].size {
            out.push(Fault::Capacity);
        }
        if slot.is_break {
            out.push(Fault::BreakSlot);
        } else if slot.minutes < course.duration {
            out.push(Fault::SlotTooShort);
        }
        if p.group != self.problem.courses[p.course].group {
            out.push(Fault::WrongGroup);
        }
        out
    }

    pub(crate) fn day_gaps(&self, day: u8, periods: &BTreeMap<u32, u32>) -> u64 {
        let (Some((&first, _)), Some((&last, _))) =
            (periods.first_key_value(), periods.last_key_value())
        else {
            return 0;
        };
        self.day_periods
            .get(&day)
            .map(|all| {
                all.iter()
                    .filter(|&&q| q > first && q < last && !periods.contains_key(&q))
                    .count() as u64
            })
            .unwrap_or(0)
    }

    /// Adds (`add = true`) or removes one placement from the aggregates.
    /// Removing a placement the state does not hold leaves it unchanged.
    pub fn apply(&self, st: &mut ScoreState, p: &Placed, add: bool) {
        if add {
            *st.placements.entry(*p).or_insert(0) += 1;
        } else {
            let Some(n) = st.placements.get_mut(p) else {
                return;
            };
            *n -= 1;
            if *n == 0 {
                st.placements.remove(p);
            }
        }

        for res in Resource::of(p) {
            let key = (res, p.slot, p.week);
            if add {
                let n = st.occupancy.entry(key).or_insert(0);
                *n += 1;
                match (*n, res) {
                    (2, _) => st.double_booked += 1,
                    (1, Resource::Room(_)) => st.rooms_used += 1,
                    _ => {}
                }
            } else if let Some(n) = st.occupancy.get_mut(&key) {
                *n -= 1;
                match (*n, res) {
                    (1, _) => st.double_booked -= 1,
                    (0, Resource::Room(_)) => st.rooms_used -= 1,
                    _ => {}
                }
                if *n == 0 {
                    st.occupancy.remove(&key);
                }
            }
        }

        if add {
            *st.weeks.entry(p.week).or_default() += 1;
        } else if let Some(n) = st.weeks.get_mut(&p.week) {
            *n -= 1;
            if *n == 0 {
                st.weeks.remove(&p.week);
            }
        }

        let minutes = self.problem.courses[p.course].minutes as i64;
        let before = st.faculty_minutes[p.faculty];
        let after = if add { before + minutes } else { before - minutes };
        st.faculty_minutes[p.faculty] = after;
        if self.problem.in_scope_faculty[p.faculty] {
            let (min, max) = self.band_minutes();
            let d0 = scoring::band_deviation(before, min, max);
            let d1 = scoring::band_deviation(after, min, max);
            st.dev_sq_sum += d1 * d1 - d0 * d0;
        }

        let slot = self.problem.slots[p.slot];
        let day_key = (p.group, slot.day, p.week);
        let gaps_before = st.group_days.get(&day_key).map(|m| self.day_gaps(slot.day, m));
        {
            let periods = st.group_days.entry(day_key).or_default();
            if add {
                *periods.entry(slot.period).or_default() += 1;
            } else if let Some(n) = periods.get_mut(&slot.period) {
                *n -= 1;
                if *n == 0 {
                    periods.remove(&slot.period);
                }
            }
            if periods.is_empty() {
                st.group_days.remove(&day_key);
            }
        }
        let gaps_after = st.group_days.get(&day_key).map(|m| self.day_gaps(slot.day, m));
        if let Some(g) = gaps_before {
            st.total_gaps -= g;
            st.active_days -= 1;
            if g == 0 {
                st.zero_gap_days -= 1;
            }
        }
        if let Some(g) = gaps_after {
            st.total_gaps += g;
            st.active_days += 1;
            if g == 0 {
                st.zero_gap_days += 1;
            }
        }

        if let Some(d) = self.course_dept[p.course] {
            let sign = if add { 1 } else { -1 };
            let dept = &self.departments[d];
            let c = &mut st.departments[d];
            c.entries += sign;
            if dept.preferred[p.slot] {
                c.preferred += sign;
            }
            if dept.avoided[p.slot] {
                c.avoided += sign;
            }
        }

        let required = self.problem.input.courses[p.course].sessions_per_week;
        let before = st.course_placed[p.course];
        let after = if add { before + 1 } else { before - 1 };
        st.course_placed[p.course] = after;
        match (before < required, after < required) {
            (true, false) => st.short_courses -= 1,
            (false, true) => st.short_courses += 1,
            _ => {}
        }
        match (before > required, after > required) {
            (true, false) => st.over_courses -= 1,
            (false, true) => st.over_courses += 1,
            _ => {}
        }

        let faults = self.faults(p).len();
        if add {
            st.entry_faults += faults;
            st.entries += 1;
        } else {
            st.entry_faults -= faults;
            st.entries -= 1;
        }
    }

    pub fn score(&self, st: &ScoreState) -> Scored {
        let c = self.constraints;
        let (min, max) = self.band_minutes();
        let workload = scoring::workload_score(st.dev_sq_sum, self.in_scope, min, max);

        let capacity = self.problem.room_slot_capacity() * st.weeks.len().max(1);
        let percent = scoring::utilization_percent(st.rooms_used, capacity);
        let utilization = scoring::utilization_score(percent, &c.classroom_utilization, capacity);

        let gaps = scoring::gap_score(
            st.total_gaps,
            st.active_days,
            st.zero_gap_days,
            c.student_gaps.prefer_consecutive_slots,
        );
        let department = scoring::department_score(&st.departments);

        let hard_count = st.double_booked
            + st.entry_faults
            + st.over_courses
            + if c.allow_partial { 0 } else { st.short_courses };

        Scored {
            soft_score: scoring::weighted(workload, utilization, gaps, department, &c.weights),
            hard_count,
            metrics: Metrics {
                teacher_workload_balance: workload,
                classroom_utilization: utilization,
                student_gaps: gaps,
                department_satisfaction: department,
                utilization_percent: percent,
                total_gaps: st.total_gaps,
                conflict_count: hard_count,
            },
        }
    }

    /// Search fitness. Feasible candidates score their soft score in
    /// `[0, 100]`; infeasible ones are shifted below zero by the full soft
    /// range plus the penalty, so any feasible candidate outranks any
    /// infeasible one. `infeasiblePenalty.base` is validated to be at least 1.
    pub fn fitness(&self, scored: &Scored) -> f64 {
        if scored.hard_count == 0 {
            scored.soft_score
        } else {
            let p = &self.constraints.infeasible_penalty;
            scored.soft_score
                - scoring::SOFT_MAX
                - p.base
                - p.per_violation * scored.hard_count as f64
        }
    }

    /// Full evaluation of a schedule.
    pub fn evaluate(&self, schedule: &Schedule) -> Result<Evaluation, CheckError> {
        let placed = schedule
            .entries
            .iter()
            .map(|e| self.problem.resolve(e))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<&EntryId> = schedule.entries.iter().map(|e| &e.id).collect();
        Ok(self.evaluate_resolved(&ids, &placed))
    }

    pub fn evaluate_resolved(&self, ids: &[&EntryId], placed: &[Placed]) -> Evaluation {
        let scored = self.score(&self.state_from(placed));
        let hard_violations = self.hard_violations(ids, placed);
        debug_assert_eq!(hard_violations.len(), scored.hard_count);
        Evaluation {
            feasible: hard_violations.is_empty(),
            hard_violations,
            soft_score: scored.soft_score,
            breakdown: scored.metrics,
        }
    }

    /// Applies one added or removed entry to `state` and returns the new scores.
    ///
    /// Equivalent to a full [`Checker::evaluate`] of the schedule the state now
    /// represents.
    pub fn evaluate_delta(
        &self,
        state: &mut ScoreState,
        delta: Delta<'_>,
    ) -> Result<Scored, CheckError> {
        match delta {
            Delta::Added(e) => {
                let p = self.problem.resolve(e)?;
                self.apply(state, &p, true);
            }
            Delta::Removed(e) => {
                let p = self.problem.resolve(e)?;
                if !state.holds(&p) {
                    return Err(CheckError::NotScheduled { entry: e.id.0.clone() });
                }
                self.apply(state, &p, false);
            }
        }
        Ok(self.score(state))
    }

    pub fn hard_violations(&self, ids: &[&EntryId], placed: &[Placed]) -> Vec<Violation> {
        let input = self.problem.input;
        let mut out = Vec::new();

        let mut groups: BTreeMap<(Resource, usize, u32), Vec<usize>> = BTreeMap::new();
        for (i, p) in placed.iter().enumerate() {
            for res in Resource::of(p) {
                groups.entry((res, p.slot, p.week)).or_default().push(i);
            }
        }
        for ((res, slot, week), members) in groups {
            if members.len() < 2 {
                continue;
            }
            let who = match res {
                Resource::Faculty(f) => format!("faculty {}", input.faculty[f].id),
                Resource::Room(r) => format!("classroom {}", input.classrooms[r].id),
                Resource::Group(g) => format!("student group {}", input.groups[g].id),
            };
            out.push(Violation {
                r#type: res.kind(),
                severity: Severity::High,
                description: format!(
                    "{who} double-booked at {} (week {week})",
                    input.time_slots[slot].id
                ),
                affected_entries: members.iter().map(|&i| ids[i].clone()).collect(),
            });
        }

        for (i, p) in placed.iter().enumerate() {
            for fault in self.faults(p) {
                out.push(Violation {
                    r#type: fault.kind(),
                    severity: Severity::High,
                    description: self.describe_fault(fault, p),
                    affected_entries: vec![ids[i].clone()],
                });
            }
        }

        let mut placed_per_course = vec![0u32; input.courses.len()];
        for p in placed {
            placed_per_course[p.course] += 1;
        }
        for (ci, c) in input.courses.iter().enumerate() {
            let n = placed_per_course[ci];
            let affected: Vec<EntryId> = if n > c.sessions_per_week {
                placed
                    .iter()
                    .zip(ids)
                    .filter(|(p, _)| p.course == ci)
                    .map(|(_, id)| (*id).clone())
                    .collect()
            } else if n < c.sessions_per_week && !self.constraints.allow_partial {
                (1..=c.sessions_per_week)
                    .map(|k| EntryId::for_session(&c.id, k))
                    .filter(|id| !ids.contains(&id))
                    .collect()
            } else {
                continue;
            };
            out.push(Violation {
                r#type: ViolationKind::Unplaced,
                severity: Severity::High,
                description: format!(
                    "course {}: {} of {} sessions placed",
                    c.id, n, c.sessions_per_week
                ),
                affected_entries: affected,
            });
        }
        out
    }

    fn describe_fault(&self, fault: Fault, p: &Placed) -> String {
        let input = self.problem.input;
        let course = &input.courses[p.course].id;
        let faculty = &input.faculty[p.faculty].id;
        let room = &input.classrooms[p.room];
        let slot = &input.time_slots[p.slot].id;
        match fault {
            Fault::FacultyUnavailable => format!("faculty {faculty} is not available at {slot}"),
            Fault::FacultyIneligible => {
                format!("faculty {faculty} is not eligible to teach {course}")
            }
            Fault::RoomClosed => format!("classroom {} is not operational", room.id),
            Fault::RoomType => {
                format!("classroom {} has the wrong room type for {course}", room.id)
            }
            Fault::Capacity => format!(
                "classroom {} (capacity {}) is too small for group {}",
                room.id, room.capacity, input.groups[p.group].id
            ),
            Fault::BreakSlot => format!("{course} is placed in break slot {slot}"),
            Fault::SlotTooShort => format!("slot {slot} is shorter than a session of {course}"),
            Fault::WrongGroup => format!(
                "{course} is attended by group {}, not group {}",
                input.groups[p.group].id,
                input.groups[self.problem.courses[p.course].group].id
            ),
        }
    }
}
