use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone,
            Debug,
            Serialize,
            Deserialize,
            ToSchema,
            JsonSchema,
            Eq,
            PartialEq,
            Hash,
            PartialOrd,
            Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(CourseId);
id_newtype!(FacultyId);
id_newtype!(ClassroomId);
id_newtype!(GroupId);
id_newtype!(SlotId);
id_newtype!(EntryId);

impl EntryId {
    /// Stable id of the `session`-th (1-based) weekly session of a course.
    pub fn for_session(course: &CourseId, session: u32) -> Self {
        Self(format!("{}#{}", course.0, session))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CourseKind {
    #[default]
    Theory,
    Lab,
    Seminar,
    Project,
    Online,
    Hybrid,
}

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default, Eq, PartialEq, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Theory,
    Lab,
    Seminar,
    Projector,
    Online,
    Hybrid,
}

/// Scheduling priority tier. Higher tiers are placed first.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default, Eq, PartialEq, Ord,
    PartialOrd,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    Odd,
    Even,
    #[default]
    Both,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub kind: CourseKind,
    pub sessions_per_week: u32,
    /// Session length in minutes.
    pub duration: u32,
    #[serde(default)]
    pub room_type: RoomType,
    #[serde(default)]
    pub credits: u32,
    pub department: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub semester: Semester,
    #[serde(default)]
    pub priority: Priority,
    /// Subject area matched against faculty qualifications.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<CourseId>,
    #[serde(default)]
    pub faculty_id: Option<FacultyId>,
    #[serde(default)]
    pub student_group_id: Option<GroupId>,
    #[serde(default)]
    pub required_resources: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: FacultyId,
    #[serde(default)]
    pub name: String,
    pub department: String,
    /// Teaching sessions per day.
    pub max_load_per_day: u32,
    /// Teaching sessions per week.
    pub max_load_per_week: u32,
    /// `availability[day - 1][period]`; empty means always available.
    #[serde(default)]
    pub availability: Vec<Vec<bool>>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub areas: Vec<String>,
}

impl Faculty {
    pub fn is_available(&self, day: u8, period: u32) -> bool {
        if self.availability.is_empty() {
            return true;
        }
        let Some(row) = (day as usize)
            .checked_sub(1)
            .and_then(|d| self.availability.get(d))
        else {
            return false;
        };
        row.get(period as usize).copied().unwrap_or(false)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: ClassroomId,
    #[serde(default)]
    pub name: String,
    pub room_type: RoomType,
    pub capacity: u32,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,
    Afternoon,
    Evening,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: SlotId,
    /// 1 = Monday .. 7 = Sunday.
    pub day: u8,
    /// Zero-based position within the day.
    pub period: u32,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    #[serde(default)]
    pub is_break: bool,
    #[serde(default)]
    pub shift: Option<Shift>,
}

impl TimeSlot {
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSpec {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_break: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentGroup {
    pub id: GroupId,
    #[serde(default)]
    pub name: String,
    pub department: String,
    #[serde(default)]
    pub year: u32,
    pub size: u32,
    #[serde(default)]
    pub electives: Vec<CourseId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub course_id: CourseId,
    pub faculty_id: FacultyId,
    pub classroom_id: ClassroomId,
    pub student_group_id: GroupId,
    pub time_slot_id: SlotId,
    pub day: u8,
    #[serde(default = "default_week")]
    pub week: u32,
    #[serde(default)]
    pub is_online: bool,
}

fn default_week() -> u32 {
    1
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
pub struct Schedule {
    pub entries: Vec<Entry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacultyWorkload {
    pub min_hours_per_week: u32,
    pub max_hours_per_week: u32,
    pub max_hours_per_day: u32,
}

impl Default for FacultyWorkload {
    fn default() -> Self {
        Self {
            min_hours_per_week: 8,
            max_hours_per_week: 40,
            max_hours_per_day: 8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomUtilization {
    /// Percent.
    pub min_utilization: f64,
    /// Percent.
    pub max_utilization: f64,
}

impl Default for ClassroomUtilization {
    fn default() -> Self {
        Self {
            min_utilization: 60.0,
            max_utilization: 95.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentGaps {
    pub max_gaps_per_day: u32,
    pub prefer_consecutive_slots: bool,
}

impl Default for StudentGaps {
    fn default() -> Self {
        Self {
            max_gaps_per_day: 2,
            prefer_consecutive_slots: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPreference {
    /// Slot ids or `HH:MM-HH:MM` labels.
    #[serde(default)]
    pub preferred_slots: Vec<String>,
    #[serde(default)]
    pub avoided_slots: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SoftWeights {
    #[serde(default = "one")]
    pub workload: f64,
    #[serde(default = "one")]
    pub utilization: f64,
    #[serde(default = "one")]
    pub gaps: f64,
    #[serde(default = "one")]
    pub department: f64,
}

fn one() -> f64 {
    1.0
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            workload: 1.0,
            utilization: 1.0,
            gaps: 1.0,
            department: 1.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictThresholds {
    /// Faculty load this many percent above the weekly maximum raises a `medium` conflict.
    pub overload_percent: f64,
    /// Gaps per day above `maxGapsPerDay` by more than this raise a `medium` conflict.
    pub gap_excess: u32,
    /// Percentage points outside the utilization band tolerated before a `low` conflict.
    pub utilization_slack: f64,
}

impl Default for ConflictThresholds {
    fn default() -> Self {
        Self {
            overload_percent: 10.0,
            gap_excess: 1,
            utilization_slack: 5.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfeasiblePenalty {
    pub base: f64,
    pub per_violation: f64,
}

impl Default for InfeasiblePenalty {
    fn default() -> Self {
        Self {
            base: 1000.0,
            per_violation: 100.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationConstraints {
    #[serde(default)]
    pub faculty_workload: FacultyWorkload,
    #[serde(default)]
    pub classroom_utilization: ClassroomUtilization,
    #[serde(default)]
    pub student_gaps: StudentGaps,
    #[serde(default)]
    pub department_preferences: BTreeMap<String, DepartmentPreference>,
    #[serde(default)]
    pub weights: SoftWeights,
    #[serde(default)]
    pub thresholds: ConflictThresholds,
    #[serde(default)]
    pub infeasible_penalty: InfeasiblePenalty,
    #[serde(default)]
    pub allow_partial: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub max_iterations: u32,
    pub population_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub elitism_rate: f64,
    pub timeout_seconds: u64,
    pub random_seed: u64,
    /// Generations without improvement before stopping; 0 disables.
    pub stagnation_generations: u32,
    pub tournament_size: usize,
    /// Report progress every N generations.
    pub progress_every: u32,
    pub result_count: usize,
    /// Population size from which evaluation is spread over worker threads.
    pub parallel_threshold: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            population_size: 50,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elitism_rate: 0.1,
            timeout_seconds: 300,
            random_seed: 0,
            stagnation_generations: 100,
            tournament_size: 3,
            progress_every: 1,
            result_count: 3,
            parallel_threshold: 32,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingInput {
    pub courses: Vec<Course>,
    pub faculty: Vec<Faculty>,
    pub classrooms: Vec<Classroom>,
    pub groups: Vec<StudentGroup>,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub input: SchedulingInput,
    #[serde(default)]
    pub constraints: OptimizationConstraints,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Serialize,
    Deserialize,
    ToSchema,
    JsonSchema,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Faculty,
    Classroom,
    Student,
    Resource,
    Unplaced,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Serialize,
    Deserialize,
    ToSchema,
    JsonSchema,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub r#type: ViolationKind,
    pub severity: Severity,
    pub description: String,
    pub affected_entries: Vec<EntryId>,
}

/// Diagnostic attached to a result for human review.
pub type Conflict = Violation;

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub teacher_workload_balance: f64,
    pub classroom_utilization: f64,
    pub student_gaps: f64,
    pub department_satisfaction: f64,
    /// Raw utilization percentage.
    pub utilization_percent: f64,
    pub total_gaps: u64,
    pub conflict_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub feasible: bool,
    pub hard_violations: Vec<Violation>,
    pub soft_score: f64,
    pub breakdown: Metrics,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    IterationLimit,
    Timeout,
    Stagnation,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Default, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    Draft,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedSession {
    pub entry_id: EntryId,
    pub course_id: CourseId,
    pub student_group_id: GroupId,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InfeasibleCourse {
    pub course_id: CourseId,
    pub required: u32,
    pub placed: u32,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSchedule {
    pub rank: usize,
    pub schedule: Schedule,
    pub fitness: f64,
    pub soft_score: f64,
    pub feasible: bool,
    /// Generation in which this schedule was first produced (0 = initial population).
    pub generation: u32,
    pub pareto_optimal: bool,
    pub metrics: Metrics,
    pub conflicts: Vec<Conflict>,
    pub unplaced: Vec<UnplacedSession>,
    pub status: CandidateStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingResult {
    pub candidates: Vec<CandidateSchedule>,
    pub termination: TerminationCause,
    pub generations: u32,
    pub evaluations: u64,
    pub best_fitness_history: Vec<f64>,
    pub infeasible_courses: Vec<InfeasibleCourse>,
    pub seed: u64,
    pub elapsed_ms: u64,
}

impl SchedulingResult {
    pub fn best(&self) -> Option<&CandidateSchedule> {
        self.candidates.first()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub generation: u32,
    pub best_fitness: f64,
    pub best_soft_score: f64,
    pub best_feasible: bool,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_fill_in() {
        let req: SolveRequest = serde_json::from_value(json!({
            "input": {
                "courses": [{
                    "id": "C1", "sessionsPerWeek": 2, "duration": 90, "department": "CS"
                }]
            },
            "search": { "randomSeed": 9 }
        }))
        .unwrap();
        let c = &req.input.courses[0];
        assert_eq!(c.room_type, RoomType::default());
        assert_eq!(c.priority, Priority::Medium);
        assert!(c.student_group_id.is_none());
        assert_eq!(req.search.random_seed, 9);
        assert_eq!(req.search.population_size, 50);
        assert_eq!(req.constraints.faculty_workload.max_hours_per_week, 40);
        assert!(!req.constraints.allow_partial);
    }

    #[test]
    fn wire_names() {
        let v = serde_json::to_value(Violation {
            r#type: ViolationKind::Classroom,
            severity: Severity::High,
            description: "x".into(),
            affected_entries: vec![EntryId::for_session(&"C1".into(), 2)],
        })
        .unwrap();
        assert_eq!(v["type"], "classroom");
        assert_eq!(v["severity"], "high");
        assert_eq!(v["affectedEntries"][0], "C1#2");
        assert_eq!(
            serde_json::to_value(TerminationCause::IterationLimit).unwrap(),
            "iteration_limit"
        );
        assert!(Severity::High > Severity::Medium && Priority::High < Priority::Low);
    }

    #[test]
    fn availability_matrix() {
        let mut f: Faculty = serde_json::from_value(json!({
            "id": "F1", "department": "CS", "maxLoadPerDay": 2, "maxLoadPerWeek": 8
        }))
        .unwrap();
        assert!(f.is_available(3, 4));
        f.availability = vec![vec![false, true]];
        assert!(f.is_available(1, 1));
        assert!(!f.is_available(1, 0));
        assert!(!f.is_available(1, 2));
        assert!(!f.is_available(2, 1));
    }
}
