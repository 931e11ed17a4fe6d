//! Indexed view over a run's input records.
//!
//! Everything the checker and the search engine look up repeatedly (id → index
//! maps, per-course eligible faculty/rooms/slots, the session list) is resolved
//! once here. Indices are positions in the corresponding input vectors.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;
use types::{Course, Entry, EntryId, SchedulingInput, TimeSlot};

use crate::checker::CheckError;
use crate::grid::slot_minutes;
use crate::validate::{ConfigIssue, ConfigurationError};

/// An entry resolved to input indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Placed {
    pub course: usize,
    pub faculty: usize,
    pub room: usize,
    pub group: usize,
    pub slot: usize,
    pub week: u32,
}

#[derive(Clone, Debug)]
pub struct CourseInfo {
    pub group: usize,
    /// Sorted.
    pub faculty: Vec<usize>,
    /// Sorted.
    pub rooms: Vec<usize>,
    /// Sorted; non-break slots long enough for one session.
    pub slots: Vec<usize>,
    pub minutes: u32,
}

impl CourseInfo {
    /// Static option count, used to place the most constrained courses first.
    pub fn options(&self) -> usize {
        self.faculty.len() * self.rooms.len() * self.slots.len()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SlotInfo {
    pub day: u8,
    pub period: u32,
    pub minutes: u32,
    pub is_break: bool,
}

/// One weekly session of a course; `number` is 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub course: usize,
    pub number: u32,
}

pub struct Problem<'a> {
    pub input: &'a SchedulingInput,
    pub courses: Vec<CourseInfo>,
    pub slots: Vec<SlotInfo>,
    pub sessions: Vec<Session>,
    /// Faculty eligible for at least one course.
    pub in_scope_faculty: Vec<bool>,
    pub operational_rooms: usize,
    pub assignable_slots: usize,
    course_idx: HashMap<&'a str, usize>,
    faculty_idx: HashMap<&'a str, usize>,
    room_idx: HashMap<&'a str, usize>,
    group_idx: HashMap<&'a str, usize>,
    slot_idx: HashMap<&'a str, usize>,
}

fn chk_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<ConfigIssue>,
) -> HashMap<&'a str, usize> {
    let mut idx = HashMap::new();
    for (i, id) in ids.enumerate() {
        if idx.insert(id, i).is_some() {
            issues.push(ConfigIssue::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    idx
}

fn matches_subject(values: &[String], subject: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(subject))
}

impl<'a> Problem<'a> {
    /// Resolves and statically validates the input. Every course must have at
    /// least one eligible faculty member, classroom and slot.
    pub fn build(input: &'a SchedulingInput) -> Result<Self, ConfigurationError> {
        let mut issues = Vec::new();

        let iss = &mut issues;
        let course_idx = chk_unique("course", input.courses.iter().map(|c| c.id.0.as_str()), iss);
        let faculty_idx = chk_unique("faculty", input.faculty.iter().map(|f| f.id.0.as_str()), iss);
        let room_ids = input.classrooms.iter().map(|r| r.id.0.as_str());
        let room_idx = chk_unique("classroom", room_ids, iss);
        let group_idx = chk_unique("group", input.groups.iter().map(|g| g.id.0.as_str()), iss);
        let slot_ids = input.time_slots.iter().map(|s| s.id.0.as_str());
        let slot_idx = chk_unique("time slot", slot_ids, iss);

        let slots = Self::resolve_slots(&input.time_slots, &mut issues);
        let assignable_slots = slots.iter().filter(|s| !s.is_break && s.minutes > 0).count();

        let mut per_day: BTreeMap<u8, usize> = BTreeMap::new();
        for s in slots.iter().filter(|s| !s.is_break) {
            *per_day.entry(s.day).or_default() += 1;
        }
        let max_per_day = per_day.values().copied().max().unwrap_or(0);
        for f in &input.faculty {
            if f.max_load_per_day as usize > max_per_day {
                issues.push(ConfigIssue::DailyLoadExceedsGrid {
                    faculty: f.id.0.clone(),
                    load: f.max_load_per_day,
                    slots: max_per_day,
                });
            }
        }

        let mut courses = Vec::with_capacity(input.courses.len());
        for c in &input.courses {
            if c.sessions_per_week == 0 {
                issues.push(ConfigIssue::NoSessions { course: c.id.0.clone() });
            }
            if c.duration == 0 {
                issues.push(ConfigIssue::ZeroDuration { course: c.id.0.clone() });
            }
            let Some(group) = Self::resolve_group(input, c, &group_idx, &mut issues) else {
                continue;
            };
            let resolved = Self::resolve_course(input, c, group, &slots, &faculty_idx, &mut issues);
            if let Some(info) = resolved {
                courses.push(info);
            }
        }

        if !issues.is_empty() {
            debug!(count = issues.len(), "input rejected");
            return Err(ConfigurationError(issues));
        }

        let mut in_scope_faculty = vec![false; input.faculty.len()];
        for info in &courses {
            for &f in &info.faculty {
                in_scope_faculty[f] = true;
            }
        }

        let sessions: Vec<Session> = input
            .courses
            .iter()
            .enumerate()
            .flat_map(|(ci, c)| {
                (1..=c.sessions_per_week).map(move |number| Session { course: ci, number })
            })
            .collect();

        debug!(
            courses = courses.len(),
            sessions = sessions.len(),
            slots = assignable_slots,
            "problem resolved"
        );
        Ok(Self {
            input,
            courses,
            slots,
            sessions,
            in_scope_faculty,
            operational_rooms: input.classrooms.iter().filter(|r| r.is_available).count(),
            assignable_slots,
            course_idx,
            faculty_idx,
            room_idx,
            group_idx,
            slot_idx,
        })
    }

    fn resolve_slots(time_slots: &[TimeSlot], issues: &mut Vec<ConfigIssue>) -> Vec<SlotInfo> {
        if time_slots.is_empty() {
            issues.push(ConfigIssue::EmptyGrid);
        }
        let mut seen: HashMap<(u8, u32), &str> = HashMap::new();
        let mut out = Vec::with_capacity(time_slots.len());
        for s in time_slots {
            if !(1..=7).contains(&s.day) {
                issues.push(ConfigIssue::InvalidDay {
                    slot: s.id.0.clone(),
                    day: s.day,
                });
            }
            let minutes = match slot_minutes(s) {
                Some(m) => m,
                None => {
                    issues.push(ConfigIssue::InvalidTimeRange {
                        slot: s.id.0.clone(),
                        start: s.start_time.clone(),
                        end: s.end_time.clone(),
                    });
                    0
                }
            };
            if let Some(first) = seen.insert((s.day, s.period), s.id.0.as_str()) {
                issues.push(ConfigIssue::DuplicatePeriod {
                    first: first.to_string(),
                    second: s.id.0.clone(),
                });
            }
            out.push(SlotInfo {
                day: s.day,
                period: s.period,
                minutes,
                is_break: s.is_break,
            });
        }
        out
    }

    fn resolve_group(
        input: &SchedulingInput,
        c: &Course,
        group_idx: &HashMap<&str, usize>,
        issues: &mut Vec<ConfigIssue>,
    ) -> Option<usize> {
        if let Some(g) = &c.student_group_id {
            return match group_idx.get(g.0.as_str()) {
                Some(&i) => Some(i),
                None => {
                    issues.push(ConfigIssue::MissingReference {
                        course: c.id.0.clone(),
                        kind: "group",
                        id: g.0.clone(),
                    });
                    None
                }
            };
        }

        let mut matches: Vec<usize> = input
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.electives.contains(&c.id))
            .map(|(i, _)| i)
            .collect();
        if matches.is_empty() {
            matches = input
                .groups
                .iter()
                .enumerate()
                .filter(|(_, g)| g.department == c.department && g.year == c.year)
                .map(|(i, _)| i)
                .collect();
        }
        match matches.as_slice() {
            [] => {
                issues.push(ConfigIssue::NoGroup { course: c.id.0.clone() });
                None
            }
            [one] => Some(*one),
            many => {
                issues.push(ConfigIssue::AmbiguousGroup {
                    course: c.id.0.clone(),
                    groups: many
                        .iter()
                        .map(|&i| input.groups[i].id.0.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
                None
            }
        }
    }

    fn resolve_course(
        input: &SchedulingInput,
        c: &Course,
        group: usize,
        slots: &[SlotInfo],
        faculty_idx: &HashMap<&str, usize>,
        issues: &mut Vec<ConfigIssue>,
    ) -> Option<CourseInfo> {
        let faculty: Vec<usize> = match &c.faculty_id {
            Some(fid) => match faculty_idx.get(fid.0.as_str()) {
                Some(&i) => vec![i],
                None => {
                    issues.push(ConfigIssue::MissingReference {
                        course: c.id.0.clone(),
                        kind: "faculty",
                        id: fid.0.clone(),
                    });
                    return None;
                }
            },
            None => input
                .faculty
                .iter()
                .enumerate()
                .filter(|(_, f)| match &c.subject {
                    Some(subject) => {
                        matches_subject(&f.qualifications, subject)
                            || matches_subject(&f.areas, subject)
                    }
                    None => f.department == c.department,
                })
                .map(|(i, _)| i)
                .collect(),
        };

        let group_size = input.groups[group].size;
        let rooms: Vec<usize> = input
            .classrooms
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.is_available
                    && r.room_type == c.room_type
                    && r.capacity >= group_size
                    && c.required_resources.iter().all(|need| r.resources.contains(need))
            })
            .map(|(i, _)| i)
            .collect();

        let eligible_slots: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_break && s.minutes >= c.duration)
            .map(|(i, _)| i)
            .collect();

        let course = || c.id.0.clone();
        if faculty.is_empty() {
            issues.push(ConfigIssue::NoEligibleFaculty { course: course() });
        }
        if rooms.is_empty() {
            issues.push(ConfigIssue::NoEligibleClassroom { course: course() });
        }
        if eligible_slots.is_empty() {
            issues.push(ConfigIssue::NoEligibleSlot { course: course() });
        } else if !faculty.is_empty()
            && !faculty.iter().any(|&f| {
                eligible_slots
                    .iter()
                    .any(|&s| input.faculty[f].is_available(slots[s].day, slots[s].period))
            })
        {
            issues.push(ConfigIssue::NoAvailableSlot { course: course() });
        }

        Some(CourseInfo {
            group,
            faculty,
            rooms,
            slots: eligible_slots,
            minutes: c.duration,
        })
    }

    pub fn course_index(&self, id: &str) -> Option<usize> {
        self.course_idx.get(id).copied()
    }

    pub fn faculty_index(&self, id: &str) -> Option<usize> {
        self.faculty_idx.get(id).copied()
    }

    pub fn room_index(&self, id: &str) -> Option<usize> {
        self.room_idx.get(id).copied()
    }

    pub fn group_index(&self, id: &str) -> Option<usize> {
        self.group_idx.get(id).copied()
    }

    pub fn slot_index(&self, id: &str) -> Option<usize> {
        self.slot_idx.get(id).copied()
    }

    pub fn faculty_available(&self, faculty: usize, slot: usize) -> bool {
        let s = &self.slots[slot];
        self.input.faculty[faculty].is_available(s.day, s.period)
    }

    /// Resolves an entry's references to indices.
    pub fn resolve(&self, e: &Entry) -> Result<Placed, CheckError> {
        let missing = |kind: &'static str, id: &str| CheckError::UnknownReference {
            entry: e.id.0.clone(),
            kind,
            id: id.to_string(),
        };
        Ok(Placed {
            course: self
                .course_index(&e.course_id.0)
                .ok_or_else(|| missing("course", &e.course_id.0))?,
            faculty: self
                .faculty_index(&e.faculty_id.0)
                .ok_or_else(|| missing("faculty", &e.faculty_id.0))?,
            room: self
                .room_index(&e.classroom_id.0)
                .ok_or_else(|| missing("classroom", &e.classroom_id.0))?,
            group: self
                .group_index(&e.student_group_id.0)
                .ok_or_else(|| missing("group", &e.student_group_id.0))?,
            slot: self
                .slot_index(&e.time_slot_id.0)
                .ok_or_else(|| missing("time slot", &e.time_slot_id.0))?,
            week: e.week,
        })
    }

    /// Materializes an entry for the given session placement.
    pub fn entry(&self, session: &Session, p: &Placed) -> Entry {
        let course = &self.input.courses[session.course];
        let room = &self.input.classrooms[p.room];
        Entry {
            id: EntryId::for_session(&course.id, session.number),
            course_id: course.id.clone(),
            faculty_id: self.input.faculty[p.faculty].id.clone(),
            classroom_id: room.id.clone(),
            student_group_id: self.input.groups[p.group].id.clone(),
            time_slot_id: self.input.time_slots[p.slot].id.clone(),
            day: self.slots[p.slot].day,
            week: p.week,
            is_online: course.kind == types::CourseKind::Online
                || room.room_type == types::RoomType::Online,
        }
    }

    /// Distinct `(room, slot)` pairs a schedule could occupy in one week.
    pub fn room_slot_capacity(&self) -> usize {
        self.operational_rooms * self.assignable_slots
    }

    pub fn faculty_is_eligible(&self, course: usize, faculty: usize) -> bool {
        self.courses[course].faculty.binary_search(&faculty).is_ok()
    }

    /// Distinct days present in the grid, ascending.
    pub fn days(&self) -> Vec<u8> {
        let days: HashSet<u8> = self.slots.iter().map(|s| s.day).collect();
        let mut days: Vec<u8> = days.into_iter().collect();
        days.sort_unstable();
        days
    }
}
