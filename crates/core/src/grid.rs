//! Weekly slot grid: days × daily periods.

use crate::validate::ConfigIssue;
use types::{PeriodSpec, Shift, SlotId, TimeSlot};

const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

pub fn day_name(day: u8) -> Option<&'static str> {
    (day as usize)
        .checked_sub(1)
        .and_then(|d| DAY_NAMES.get(d).copied())
}

/// Minutes since midnight for a `HH:MM` string.
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Slot length in minutes, `None` when the times are malformed or reversed.
pub fn slot_minutes(slot: &TimeSlot) -> Option<u32> {
    let start = parse_hhmm(&slot.start_time)?;
    let end = parse_hhmm(&slot.end_time)?;
    end.checked_sub(start).filter(|d| *d > 0)
}

fn shift_of(start: u32) -> Shift {
    match start {
        s if s < 12 * 60 => Shift::Morning,
        s if s < 17 * 60 => Shift::Afternoon,
        _ => Shift::Evening,
    }
}

/// Builds the Cartesian product of `days` and `periods`.
///
/// Ids follow `<day>.<n>` with `n` starting at 1, e.g. `mon.1`. Periods are
/// ordered by start time within each day.
pub fn generate_grid(
    days: &[u8],
    periods: &[PeriodSpec],
) -> Result<Vec<TimeSlot>, Vec<ConfigIssue>> {
    let mut issues = Vec::new();
    if days.is_empty() || periods.is_empty() {
        issues.push(ConfigIssue::EmptyGrid);
    }

    let mut parsed: Vec<(u32, &PeriodSpec)> = Vec::with_capacity(periods.len());
    for p in periods {
        match (parse_hhmm(&p.start_time), parse_hhmm(&p.end_time)) {
            (Some(s), Some(e)) if e > s => parsed.push((s, p)),
            _ => issues.push(ConfigIssue::InvalidTimeRange {
                slot: format!("period {}-{}", p.start_time, p.end_time),
                start: p.start_time.clone(),
                end: p.end_time.clone(),
            }),
        }
    }
    parsed.sort_by_key(|(s, _)| *s);

    let mut sorted_days: Vec<u8> = days.to_vec();
    sorted_days.sort_unstable();
    sorted_days.dedup();

    let mut slots = Vec::with_capacity(sorted_days.len() * parsed.len());
    for &day in &sorted_days {
        let Some(name) = day_name(day) else {
            issues.push(ConfigIssue::InvalidDay {
                slot: format!("day {day}"),
                day,
            });
            continue;
        };
        for (period, (start, spec)) in parsed.iter().enumerate() {
            slots.push(TimeSlot {
                id: SlotId(format!("{}.{}", name, period + 1)),
                day,
                period: period as u32,
                start_time: spec.start_time.clone(),
                end_time: spec.end_time.clone(),
                is_break: spec.is_break,
                shift: Some(shift_of(*start)),
            });
        }
    }

    if issues.is_empty() {
        Ok(slots)
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(start: &str, end: &str, is_break: bool) -> PeriodSpec {
        PeriodSpec {
            start_time: start.into(),
            end_time: end.into(),
            is_break,
        }
    }

    #[test]
    fn grid_is_cartesian_and_ordered() {
        let grid = generate_grid(
            &[2, 1],
            &[
                period("10:00", "11:00", false),
                period("09:00", "10:00", false),
                period("12:00", "13:00", true),
            ],
        )
        .unwrap();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0].id.0, "mon.1");
        assert_eq!(grid[0].start_time, "09:00");
        assert_eq!(grid[1].id.0, "mon.2");
        assert_eq!(grid[3].id.0, "tue.1");
        assert!(grid[2].is_break);
        assert_eq!(grid[5].period, 2);
        assert_eq!(slot_minutes(&grid[0]), Some(60));
    }

    #[test]
    fn rejects_bad_input() {
        let err = generate_grid(&[8], &[period("11:00", "10:00", false)]).unwrap_err();
        assert!(err
            .iter()
            .any(|i| matches!(i, ConfigIssue::InvalidTimeRange { .. })));
        assert!(generate_grid(&[], &[]).is_err());
    }

    #[test]
    fn parses_times() {
        assert_eq!(parse_hhmm("08:30"), Some(510));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("nine"), None);
    }
}
