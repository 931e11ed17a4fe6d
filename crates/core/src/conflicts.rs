//! Post-hoc conflict analysis for human review.
//!
//! Derived from the schedule alone: hard violations as reported by the
//! checker, plus soft-constraint breaches above the configured thresholds.

use std::collections::BTreeMap;

use types::{Conflict, EntryId, Schedule, Severity, ViolationKind};

use crate::checker::{CheckError, Checker};
use crate::problem::Placed;

pub fn analyze(checker: &Checker<'_>, schedule: &Schedule) -> Result<Vec<Conflict>, CheckError> {
    let placed = schedule
        .entries
        .iter()
        .map(|e| checker.problem().resolve(e))
        .collect::<Result<Vec<_>, _>>()?;
    let ids: Vec<&EntryId> = schedule.entries.iter().map(|e| &e.id).collect();
    Ok(analyze_resolved(checker, &ids, &placed))
}

pub fn analyze_resolved(
    checker: &Checker<'_>,
    ids: &[&EntryId],
    placed: &[Placed],
) -> Vec<Conflict> {
    let mut out = checker.hard_violations(ids, placed);
    faculty_load(checker, ids, placed, &mut out);
    student_gaps(checker, ids, placed, &mut out);
    utilization(checker, placed, &mut out);
    department_avoided(checker, ids, placed, &mut out);
    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}

fn collect(ids: &[&EntryId], members: &[usize]) -> Vec<EntryId> {
    members.iter().map(|&i| ids[i].clone()).collect()
}

/// `Medium` when `value` exceeds `limit` by more than `percent`, `Low` when
/// it exceeds it by less.
fn overload_severity(value: f64, limit: f64, percent: f64) -> Option<Severity> {
    if value <= limit {
        None
    } else if value > limit * (1.0 + percent / 100.0) {
        Some(Severity::Medium)
    } else {
        Some(Severity::Low)
    }
}

fn faculty_load(
    checker: &Checker<'_>,
    ids: &[&EntryId],
    placed: &[Placed],
    out: &mut Vec<Conflict>,
) {
    let problem = checker.problem();
    let input = problem.input;
    let c = checker.constraints();
    let overload = c.thresholds.overload_percent;

    let mut weekly: BTreeMap<(usize, u32), (i64, Vec<usize>)> = BTreeMap::new();
    let mut daily: BTreeMap<(usize, u32, u8), (i64, Vec<usize>)> = BTreeMap::new();
    for (i, p) in placed.iter().enumerate() {
        let minutes = problem.courses[p.course].minutes as i64;
        let w = weekly.entry((p.faculty, p.week)).or_default();
        w.0 += minutes;
        w.1.push(i);
        let d = daily
            .entry((p.faculty, p.week, problem.slots[p.slot].day))
            .or_default();
        d.0 += minutes;
        d.1.push(i);
    }

    let max_week = c.faculty_workload.max_hours_per_week as f64 * 60.0;
    let min_week = c.faculty_workload.min_hours_per_week as f64 * 60.0;
    let max_day = c.faculty_workload.max_hours_per_day as f64 * 60.0;

    for ((f, week), (minutes, members)) in &weekly {
        let faculty = &input.faculty[*f];
        let hours = *minutes as f64 / 60.0;
        if let Some(severity) = overload_severity(*minutes as f64, max_week, overload) {
            out.push(Conflict {
                r#type: ViolationKind::Faculty,
                severity,
                description: format!(
                    "faculty {} teaches {hours:.1}h in week {week}, above the {}h maximum",
                    faculty.id, c.faculty_workload.max_hours_per_week
                ),
                affected_entries: collect(ids, members),
            });
        } else if (*minutes as f64) < min_week * (1.0 - overload / 100.0) {
            out.push(Conflict {
                r#type: ViolationKind::Faculty,
                severity: Severity::Low,
                description: format!(
                    "faculty {} teaches {hours:.1}h in week {week}, below the {}h minimum",
                    faculty.id, c.faculty_workload.min_hours_per_week
                ),
                affected_entries: collect(ids, members),
            });
        }
        if members.len() as u32 > faculty.max_load_per_week {
            out.push(Conflict {
                r#type: ViolationKind::Faculty,
                severity: Severity::Medium,
                description: format!(
                    "faculty {} has {} sessions in week {week}, ceiling is {}",
                    faculty.id,
                    members.len(),
                    faculty.max_load_per_week
                ),
                affected_entries: collect(ids, members),
            });
        }
    }

    for ((f, week, day), (minutes, members)) in &daily {
        let faculty = &input.faculty[*f];
        if members.len() as u32 > faculty.max_load_per_day {
            out.push(Conflict {
                r#type: ViolationKind::Faculty,
                severity: Severity::Medium,
                description: format!(
                    "faculty {} has {} sessions on day {day} of week {week}, ceiling is {}",
                    faculty.id,
                    members.len(),
                    faculty.max_load_per_day
                ),
                affected_entries: collect(ids, members),
            });
        }
        if let Some(severity) = overload_severity(*minutes as f64, max_day, overload) {
            out.push(Conflict {
                r#type: ViolationKind::Faculty,
                severity,
                description: format!(
                    "faculty {} teaches {:.1}h on day {day} of week {week}, \
                     above the {}h daily maximum",
                    faculty.id,
                    *minutes as f64 / 60.0,
                    c.faculty_workload.max_hours_per_day
                ),
                affected_entries: collect(ids, members),
            });
        }
    }
}

fn student_gaps(
    checker: &Checker<'_>,
    ids: &[&EntryId],
    placed: &[Placed],
    out: &mut Vec<Conflict>,
) {
    let problem = checker.problem();
    let limits = &checker.constraints().student_gaps;
    let excess = checker.constraints().thresholds.gap_excess;

    let mut days: BTreeMap<(usize, u32, u8), (BTreeMap<u32, u32>, Vec<usize>)> = BTreeMap::new();
    for (i, p) in placed.iter().enumerate() {
        let slot = &problem.slots[p.slot];
        let d = days.entry((p.group, p.week, slot.day)).or_default();
        *d.0.entry(slot.period).or_default() += 1;
        d.1.push(i);
    }

    for ((g, week, day), (periods, members)) in &days {
        let gaps = checker.day_gaps(*day, periods);
        if gaps <= limits.max_gaps_per_day as u64 {
            continue;
        }
        let severity = if gaps > (limits.max_gaps_per_day + excess) as u64 {
            Severity::Medium
        } else {
            Severity::Low
        };
        out.push(Conflict {
            r#type: ViolationKind::Student,
            severity,
            description: format!(
                "student group {} has {gaps} idle slots on day {day} of week {week} (limit {})",
                problem.input.groups[*g].id, limits.max_gaps_per_day
            ),
            affected_entries: collect(ids, members),
        });
    }
}

fn utilization(checker: &Checker<'_>, placed: &[Placed], out: &mut Vec<Conflict>) {
    if placed.is_empty() {
        return;
    }
    let band = &checker.constraints().classroom_utilization;
    let slack = checker.constraints().thresholds.utilization_slack;
    let percent = checker
        .score(&checker.state_from(placed))
        .metrics
        .utilization_percent;
    let description = if percent < band.min_utilization - slack {
        format!(
            "classroom utilization {percent:.1}% is below the {:.0}% minimum",
            band.min_utilization
        )
    } else if percent > band.max_utilization + slack {
        format!(
            "classroom utilization {percent:.1}% is above the {:.0}% maximum",
            band.max_utilization
        )
    } else {
        return;
    };
    out.push(Conflict {
        r#type: ViolationKind::Classroom,
        severity: Severity::Low,
        description,
        affected_entries: Vec::new(),
    });
}

fn department_avoided(
    checker: &Checker<'_>,
    ids: &[&EntryId],
    placed: &[Placed],
    out: &mut Vec<Conflict>,
) {
    let input = checker.problem().input;
    for (dept, pref) in &checker.constraints().department_preferences {
        if pref.avoided_slots.is_empty() {
            continue;
        }
        let members: Vec<usize> = placed
            .iter()
            .enumerate()
            .filter(|(_, p)| input.courses[p.course].department == *dept)
            .filter(|(_, p)| {
                let slot = &input.time_slots[p.slot];
                let label = slot.label();
                pref.avoided_slots.iter().any(|x| *x == slot.id.0 || *x == label)
            })
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        out.push(Conflict {
            r#type: ViolationKind::Resource,
            severity: Severity::Low,
            description: format!(
                "{} {dept} sessions fall in slots the department avoids",
                members.len()
            ),
            affected_entries: collect(ids, &members),
        });
    }
}
