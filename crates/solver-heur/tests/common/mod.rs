#![allow(dead_code)]

use sched_core::grid::generate_grid;
use types::*;

pub fn period(start: &str, end: &str) -> PeriodSpec {
    PeriodSpec {
        start_time: start.into(),
        end_time: end.into(),
        is_break: false,
    }
}

/// `days` days of `periods` back-to-back hour periods starting at 09:00.
pub fn grid(days: u8, periods: u32) -> Vec<TimeSlot> {
    let specs: Vec<PeriodSpec> = (0..periods)
        .map(|p| period(&format!("{:02}:00", 9 + p), &format!("{:02}:00", 10 + p)))
        .collect();
    let days: Vec<u8> = (1..=days).collect();
    generate_grid(&days, &specs).expect("valid grid")
}

pub fn course(id: &str, subject: &str, sessions: u32, group: &str) -> Course {
    Course {
        id: id.into(),
        name: id.to_string(),
        code: id.to_string(),
        kind: CourseKind::Theory,
        sessions_per_week: sessions,
        duration: 60,
        room_type: RoomType::Theory,
        credits: 3,
        department: "CS".into(),
        year: 1,
        semester: Semester::Both,
        priority: Priority::Medium,
        subject: Some(subject.into()),
        prerequisites: vec![],
        faculty_id: None,
        student_group_id: Some(group.into()),
        required_resources: vec![],
    }
}

pub fn faculty(id: &str, quals: &[&str], per_day: u32) -> Faculty {
    Faculty {
        id: id.into(),
        name: id.to_string(),
        department: "CS".into(),
        max_load_per_day: per_day,
        max_load_per_week: 20,
        availability: vec![],
        qualifications: quals.iter().map(|q| q.to_string()).collect(),
        areas: vec![],
    }
}

pub fn room(id: &str, capacity: u32) -> Classroom {
    Classroom {
        id: id.into(),
        name: id.to_string(),
        room_type: RoomType::Theory,
        capacity,
        department: None,
        building: None,
        floor: None,
        resources: vec![],
        is_available: true,
    }
}

pub fn group(id: &str, size: u32) -> StudentGroup {
    StudentGroup {
        id: id.into(),
        name: id.to_string(),
        department: "CS".into(),
        year: 1,
        size,
        electives: vec![],
    }
}

pub fn request(input: SchedulingInput, search: SearchConfig) -> SolveRequest {
    SolveRequest {
        input,
        constraints: OptimizationConstraints::default(),
        search,
    }
}

pub fn search(seed: u64, generations: u32, population: usize) -> SearchConfig {
    SearchConfig {
        max_iterations: generations,
        population_size: population,
        random_seed: seed,
        ..SearchConfig::default()
    }
}

/// A small department: five courses over three groups, four lecturers and
/// three rooms on a Mon–Fri grid of four periods.
pub fn department() -> SchedulingInput {
    SchedulingInput {
        courses: vec![
            course("ALG", "cs", 3, "G1"),
            course("DB", "cs", 2, "G1"),
            course("NET", "cs", 2, "G2"),
            course("CALC", "math", 3, "G2"),
            course("STAT", "math", 2, "G3"),
        ],
        faculty: vec![
            faculty("F1", &["cs"], 3),
            faculty("F2", &["cs", "math"], 3),
            faculty("F3", &["math"], 2),
            faculty("F4", &["cs"], 2),
        ],
        classrooms: vec![room("R1", 40), room("R2", 30), room("R3", 25)],
        groups: vec![group("G1", 25), group("G2", 30), group("G3", 20)],
        time_slots: grid(5, 4),
    }
}

/// Pairs of entries sharing a resource in the same slot and week.
pub fn double_bookings(schedule: &Schedule) -> usize {
    let e = &schedule.entries;
    let mut n = 0;
    for i in 0..e.len() {
        for j in i + 1..e.len() {
            let (a, b) = (&e[i], &e[j]);
            if a.time_slot_id != b.time_slot_id || a.week != b.week {
                continue;
            }
            if a.faculty_id == b.faculty_id
                || a.classroom_id == b.classroom_id
                || a.student_group_id == b.student_group_id
            {
                n += 1;
            }
        }
    }
    n
}
