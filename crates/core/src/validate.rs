use thiserror::Error;
use types::{OptimizationConstraints, SearchConfig};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigIssue {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("time slot grid is empty")]
    EmptyGrid,
    #[error("time slot {slot} has invalid day {day}")]
    InvalidDay { slot: String, day: u8 },
    #[error("time slot {slot} has invalid time range {start}-{end}")]
    InvalidTimeRange {
        slot: String,
        start: String,
        end: String,
    },
    #[error("time slots {first} and {second} share day and period")]
    DuplicatePeriod { first: String, second: String },
    #[error("course {course} has sessionsPerWeek=0")]
    NoSessions { course: String },
    #[error("course {course} has zero duration")]
    ZeroDuration { course: String },
    #[error("course {course} references missing {kind} {id}")]
    MissingReference {
        course: String,
        kind: &'static str,
        id: String,
    },
    #[error("course {course} has no attending student group")]
    NoGroup { course: String },
    #[error("course {course} matches several student groups: {groups}")]
    AmbiguousGroup { course: String, groups: String },
    #[error("course {course} has no eligible faculty")]
    NoEligibleFaculty { course: String },
    #[error("course {course} has no eligible classroom")]
    NoEligibleClassroom { course: String },
    #[error("course {course} has no assignable time slot")]
    NoEligibleSlot { course: String },
    #[error("course {course}: no eligible faculty is available in any assignable slot")]
    NoAvailableSlot { course: String },
    #[error("faculty {faculty} has maxLoadPerDay={load} but a day has only {slots} slots")]
    DailyLoadExceedsGrid {
        faculty: String,
        load: u32,
        slots: usize,
    },
    #[error("{name}: min {min} > max {max}")]
    ContradictoryBounds {
        name: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{name} must be within [{lo}, {hi}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        lo: f64,
        hi: f64,
    },
}

/// Rejected run configuration. Raised before any search work begins.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "invalid configuration: {}",
    .0.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
)]
pub struct ConfigurationError(pub Vec<ConfigIssue>);

impl ConfigurationError {
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.0
    }
}

fn check_range(name: &'static str, value: f64, lo: f64, hi: f64, issues: &mut Vec<ConfigIssue>) {
    if !(lo..=hi).contains(&value) {
        issues.push(ConfigIssue::OutOfRange {
            name,
            value,
            lo,
            hi,
        });
    }
}

pub fn validate_constraints(c: &OptimizationConstraints) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    let w = &c.faculty_workload;
    if w.min_hours_per_week > w.max_hours_per_week {
        issues.push(ConfigIssue::ContradictoryBounds {
            name: "facultyWorkload.hoursPerWeek",
            min: w.min_hours_per_week as f64,
            max: w.max_hours_per_week as f64,
        });
    }
    if w.max_hours_per_day > w.max_hours_per_week {
        issues.push(ConfigIssue::ContradictoryBounds {
            name: "facultyWorkload.maxHoursPerDay",
            min: w.max_hours_per_day as f64,
            max: w.max_hours_per_week as f64,
        });
    }

    let u = &c.classroom_utilization;
    check_range("classroomUtilization.minUtilization", u.min_utilization, 0.0, 100.0, &mut issues);
    check_range("classroomUtilization.maxUtilization", u.max_utilization, 0.0, 100.0, &mut issues);
    if u.min_utilization > u.max_utilization {
        issues.push(ConfigIssue::ContradictoryBounds {
            name: "classroomUtilization",
            min: u.min_utilization,
            max: u.max_utilization,
        });
    }

    for (name, v) in [
        ("weights.workload", c.weights.workload),
        ("weights.utilization", c.weights.utilization),
        ("weights.gaps", c.weights.gaps),
        ("weights.department", c.weights.department),
    ] {
        check_range(name, v, 0.0, f64::MAX, &mut issues);
    }
    let t = &c.thresholds;
    check_range("thresholds.overloadPercent", t.overload_percent, 0.0, f64::MAX, &mut issues);
    check_range("thresholds.utilizationSlack", t.utilization_slack, 0.0, 100.0, &mut issues);
    check_range("infeasiblePenalty.base", c.infeasible_penalty.base, 1.0, f64::MAX, &mut issues);
    check_range(
        "infeasiblePenalty.perViolation",
        c.infeasible_penalty.per_violation,
        0.0,
        f64::MAX,
        &mut issues,
    );
    issues
}

pub fn validate_search(s: &SearchConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    check_range("search.crossoverRate", s.crossover_rate, 0.0, 1.0, &mut issues);
    check_range("search.mutationRate", s.mutation_rate, 0.0, 1.0, &mut issues);
    check_range("search.elitismRate", s.elitism_rate, 0.0, 1.0, &mut issues);
    check_range("search.populationSize", s.population_size as f64, 2.0, f64::MAX, &mut issues);
    check_range("search.tournamentSize", s.tournament_size as f64, 1.0, f64::MAX, &mut issues);
    check_range("search.resultCount", s.result_count as f64, 1.0, f64::MAX, &mut issues);
    if s.population_size >= 2 && elite_count(s) >= s.population_size {
        issues.push(ConfigIssue::OutOfRange {
            name: "search.elitismRate",
            value: s.elitism_rate,
            lo: 0.0,
            hi: (s.population_size - 1) as f64 / s.population_size as f64,
        });
    }
    issues
}

/// Number of candidates carried over unchanged each generation.
pub fn elite_count(s: &SearchConfig) -> usize {
    (s.elitism_rate * s.population_size as f64).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_constraints(&OptimizationConstraints::default()).is_empty());
        assert!(validate_search(&SearchConfig::default()).is_empty());
    }

    #[test]
    fn contradictory_bounds() {
        let mut c = OptimizationConstraints::default();
        c.faculty_workload.min_hours_per_week = 50;
        c.classroom_utilization.min_utilization = 99.0;
        let issues = validate_constraints(&c);
        assert_eq!(
            issues
                .iter()
                .filter(|i| matches!(i, ConfigIssue::ContradictoryBounds { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn penalty_base_must_be_positive() {
        let mut c = OptimizationConstraints::default();
        c.infeasible_penalty.base = 0.5;
        c.infeasible_penalty.per_violation = 0.0;
        let issues = validate_constraints(&c);
        assert!(matches!(
            issues.as_slice(),
            [ConfigIssue::OutOfRange { name: "infeasiblePenalty.base", .. }]
        ));
    }

    #[test]
    fn search_rates() {
        let s = SearchConfig {
            mutation_rate: 1.5,
            population_size: 4,
            elitism_rate: 1.0,
            ..SearchConfig::default()
        };
        let issues = validate_search(&s);
        assert_eq!(issues.len(), 2);
        let msg = ConfigurationError(issues).to_string();
        assert!(msg.contains("search.mutationRate"));
        assert!(msg.contains("; "));
    }
}
