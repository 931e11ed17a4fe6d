#![allow(dead_code)]

use sched_core::grid::generate_grid;
use types::*;

pub fn period(start: &str, end: &str, is_break: bool) -> PeriodSpec {
    PeriodSpec {
        start_time: start.into(),
        end_time: end.into(),
        is_break,
    }
}

/// Mon–Fri, four teaching periods with a lunch break after the second.
pub fn grid() -> Vec<TimeSlot> {
    generate_grid(
        &[1, 2, 3, 4, 5],
        &[
            period("09:00", "10:00", false),
            period("10:00", "11:00", false),
            period("11:00", "12:00", true),
            period("12:00", "13:00", false),
            period("13:00", "14:00", false),
        ],
    )
    .expect("valid grid")
}

pub fn course(id: &str, dept: &str, subject: &str, sessions: u32, group: &str) -> Course {
    Course {
        id: id.into(),
        name: id.to_string(),
        code: id.to_string(),
        kind: CourseKind::Theory,
        sessions_per_week: sessions,
        duration: 60,
        room_type: RoomType::Theory,
        credits: 3,
        department: dept.into(),
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

pub fn faculty(id: &str, dept: &str, quals: &[&str]) -> Faculty {
    Faculty {
        id: id.into(),
        name: id.to_string(),
        department: dept.into(),
        max_load_per_day: 3,
        max_load_per_week: 10,
        availability: vec![],
        qualifications: quals.iter().map(|q| q.to_string()).collect(),
        areas: vec![],
    }
}

pub fn room(id: &str, room_type: RoomType, capacity: u32) -> Classroom {
    Classroom {
        id: id.into(),
        name: id.to_string(),
        room_type,
        capacity,
        department: None,
        building: Some("A".into()),
        floor: Some(1),
        resources: vec!["projector".into()],
        is_available: true,
    }
}

pub fn group(id: &str, dept: &str, size: u32) -> StudentGroup {
    StudentGroup {
        id: id.into(),
        name: id.to_string(),
        department: dept.into(),
        year: 1,
        size,
        electives: vec![],
    }
}

pub fn input() -> SchedulingInput {
    SchedulingInput {
        courses: vec![
            course("CS101", "CS", "cs", 3, "G1"),
            course("CS102", "CS", "cs", 2, "G1"),
            course("MA101", "MATH", "math", 2, "G2"),
            course("MA102", "MATH", "math", 2, "G1"),
        ],
        faculty: vec![
            faculty("F1", "CS", &["cs"]),
            faculty("F2", "CS", &["cs", "math"]),
            faculty("F3", "MATH", &["math"]),
        ],
        classrooms: vec![
            room("R1", RoomType::Theory, 40),
            room("R2", RoomType::Theory, 28),
            room("L1", RoomType::Lab, 30),
        ],
        groups: vec![group("G1", "CS", 25), group("G2", "MATH", 30)],
        time_slots: grid(),
    }
}

pub fn constraints() -> OptimizationConstraints {
    let mut c = OptimizationConstraints::default();
    c.faculty_workload.min_hours_per_week = 2;
    c.faculty_workload.max_hours_per_week = 4;
    c.department_preferences.insert(
        "CS".into(),
        DepartmentPreference {
            preferred_slots: vec!["09:00-10:00".into()],
            avoided_slots: vec!["13:00-14:00".into()],
        },
    );
    c
}

pub fn entry(
    inp: &SchedulingInput,
    id: &str,
    course: usize,
    faculty: usize,
    room: usize,
    group: usize,
    slot: usize,
    week: u32,
) -> Entry {
    let s = &inp.time_slots[slot];
    Entry {
        id: EntryId(id.to_string()),
        course_id: inp.courses[course].id.clone(),
        faculty_id: inp.faculty[faculty].id.clone(),
        classroom_id: inp.classrooms[room].id.clone(),
        student_group_id: inp.groups[group].id.clone(),
        time_slot_id: s.id.clone(),
        day: s.day,
        week,
        is_online: false,
    }
}
