//! Soft-constraint sub-metrics, each normalized to 0..100.
//!
//! Inputs are integer aggregates maintained by [`crate::checker::ScoreState`];
//! floating point only appears here, so the same aggregates always yield the
//! same score regardless of how they were accumulated.

use types::{ClassroomUtilization, SoftWeights};

/// Upper bound of every sub-metric and of the weighted soft score.
pub const SOFT_MAX: f64 = 100.0;

/// Distance of `value` from the closed band `[min, max]`.
pub fn band_deviation(value: i64, min: i64, max: i64) -> i64 {
    if value < min {
        min - value
    } else if value > max {
        value - max
    } else {
        0
    }
}

/// `100 / (1 + mean(d²) / W²)` with `W = max(max - min, 60)` minutes.
pub fn workload_score(dev_sq_sum: i64, faculty: usize, min_minutes: i64, max_minutes: i64) -> f64 {
    if faculty == 0 {
        return 100.0;
    }
    let width = (max_minutes - min_minutes).max(60) as f64;
    let msd = dev_sq_sum as f64 / faculty as f64;
    100.0 / (1.0 + msd / (width * width))
}

pub fn utilization_percent(used: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    (used as f64 * 100.0 / capacity as f64).min(100.0)
}

/// 100 inside the band, linear fall-off to 0 at 0% and at 100%.
pub fn utilization_score(percent: f64, band: &ClassroomUtilization, capacity: usize) -> f64 {
    if capacity == 0 {
        return 100.0;
    }
    if percent < band.min_utilization {
        100.0 * percent / band.min_utilization
    } else if percent > band.max_utilization {
        if band.max_utilization >= 100.0 {
            100.0
        } else {
            100.0 * (100.0 - percent) / (100.0 - band.max_utilization)
        }
    } else {
        100.0
    }
}

pub fn gap_score(
    total_gaps: u64,
    active_days: u64,
    zero_gap_days: u64,
    prefer_consecutive: bool,
) -> f64 {
    if active_days == 0 {
        return 100.0;
    }
    let avg = total_gaps as f64 / active_days as f64;
    let base = 100.0 / (1.0 + avg);
    if prefer_consecutive {
        0.8 * base + 0.2 * (100.0 * zero_gap_days as f64 / active_days as f64)
    } else {
        base
    }
}

/// Entry counts for one department with configured preferences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeptCounts {
    pub entries: i64,
    pub preferred: i64,
    pub avoided: i64,
}

/// Mean over departments of `50 · (1 + (preferred − avoided) / entries)`.
pub fn department_score(counts: &[DeptCounts]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for c in counts.iter().filter(|c| c.entries > 0) {
        sum += 50.0 * (1.0 + (c.preferred - c.avoided) as f64 / c.entries as f64);
        n += 1;
    }
    if n == 0 {
        100.0
    } else {
        sum / n as f64
    }
}

pub fn weighted(
    workload: f64,
    utilization: f64,
    gaps: f64,
    department: f64,
    w: &SoftWeights,
) -> f64 {
    let total = w.workload + w.utilization + w.gaps + w.department;
    if total <= 0.0 {
        return 100.0;
    }
    (w.workload * workload
        + w.utilization * utilization
        + w.gaps * gaps
        + w.department * department)
        / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band() {
        assert_eq!(band_deviation(5, 10, 20), 5);
        assert_eq!(band_deviation(15, 10, 20), 0);
        assert_eq!(band_deviation(26, 10, 20), 6);
    }

    #[test]
    fn workload_prefers_balanced() {
        let balanced = workload_score(0, 3, 480, 2400);
        let skewed = workload_score(3 * 600 * 600, 3, 480, 2400);
        assert_eq!(balanced, 100.0);
        assert!(skewed < balanced);
        assert!(skewed > 0.0);
    }

    #[test]
    fn utilization_band() {
        let band = ClassroomUtilization {
            min_utilization: 60.0,
            max_utilization: 90.0,
        };
        assert_eq!(utilization_score(75.0, &band, 10), 100.0);
        assert_eq!(utilization_score(30.0, &band, 10), 50.0);
        assert!((utilization_score(95.0, &band, 10) - 50.0).abs() < 1e-9);
        assert_eq!(utilization_percent(3, 4), 75.0);
    }

    #[test]
    fn gaps_and_consecutive_bonus() {
        assert_eq!(gap_score(0, 4, 4, true), 100.0);
        assert_eq!(gap_score(4, 4, 0, false), 50.0);
        assert_eq!(gap_score(4, 4, 0, true), 40.0);
    }

    #[test]
    fn department_mean() {
        let counts = [
            DeptCounts {
                entries: 4,
                preferred: 4,
                avoided: 0,
            },
            DeptCounts {
                entries: 2,
                preferred: 0,
                avoided: 2,
            },
            DeptCounts::default(),
        ];
        assert_eq!(department_score(&counts), 50.0);
        assert_eq!(department_score(&[]), 100.0);
    }
}
