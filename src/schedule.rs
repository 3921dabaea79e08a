//! Due-date computation.
//!
//! Pure functions over a task's schedule, its most recent completion and the
//! current instant. Nothing here touches the store; due-ness is derived on
//! every read so it can never go stale.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Schedule, Task, TaskView};

/// Length of one recurrence. `interval_value` is clamped to at least 1.
pub fn interval(interval_value: i64, unit: crate::model::IntervalUnit) -> Duration {
    Duration::try_seconds(interval_value.max(1).saturating_mul(unit.seconds()))
        .unwrap_or(Duration::MAX)
}

/// When `task` is next due.
///
/// One-off tasks are due at their fixed instant, whatever has been logged
/// against them. Recurring tasks are due one interval after their latest
/// completion, or after creation if they have never been completed.
pub fn compute_due_at(task: &Task, last_done: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match &task.schedule {
        Schedule::OneOff { due_at } => due_at.unwrap_or(task.created_at),
        Schedule::Recurring {
            interval_value,
            unit,
        } => {
            let base = last_done.unwrap_or(task.created_at);
            base.checked_add_signed(interval(*interval_value, *unit))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        }
    }
}

/// Due exactly at the boundary counts as due.
pub fn is_due(due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= due_at
}

pub fn decorate(task: Task, last_done: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TaskView {
    let due_at = compute_due_at(&task, last_done);
    TaskView {
        is_due: is_due(due_at, now),
        due_at,
        last_done,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IntervalUnit;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, 0, 0).unwrap()
    }

    fn recurring(value: i64, unit: IntervalUnit) -> Task {
        Task {
            id: 1,
            title: "water plants".into(),
            notes: None,
            schedule: Schedule::Recurring {
                interval_value: value,
                unit,
            },
            is_active: true,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn one_off(due_at: Option<DateTime<Utc>>) -> Task {
        Task {
            schedule: Schedule::OneOff { due_at },
            ..recurring(1, IntervalUnit::Days)
        }
    }

    #[rstest]
    #[case::hours(IntervalUnit::Hours, 3, Duration::hours(3))]
    #[case::days(IntervalUnit::Days, 2, Duration::days(2))]
    #[case::weeks(IntervalUnit::Weeks, 1, Duration::weeks(1))]
    fn recurring_without_completions_counts_from_creation(
        #[case] unit: IntervalUnit,
        #[case] value: i64,
        #[case] expected: Duration,
    ) {
        let task = recurring(value, unit);
        assert_eq!(compute_due_at(&task, None), at(0) + expected);
    }

    #[test]
    fn recurring_counts_from_latest_completion() {
        let task = recurring(7, IntervalUnit::Days);
        let done = at(5);
        assert_eq!(compute_due_at(&task, Some(done)), done + Duration::days(7));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-4)]
    fn non_positive_interval_is_clamped_to_one(#[case] value: i64) {
        let task = recurring(value, IntervalUnit::Hours);
        assert_eq!(compute_due_at(&task, None), at(1));
    }

    #[test]
    fn one_off_ignores_completions() {
        let due = at(9);
        let task = one_off(Some(due));
        assert_eq!(compute_due_at(&task, None), due);
        assert_eq!(compute_due_at(&task, Some(at(23))), due);
    }

    #[test]
    fn one_off_without_due_at_falls_back_to_creation() {
        let task = one_off(None);
        assert_eq!(compute_due_at(&task, Some(at(4))), at(0));
    }

    #[test]
    fn due_boundary_is_inclusive() {
        assert!(is_due(at(3), at(3)));
        assert!(is_due(at(3), at(4)));
        assert!(!is_due(at(3), at(2)));
    }

    #[test]
    fn huge_interval_saturates() {
        let task = recurring(i64::MAX, IntervalUnit::Weeks);
        assert_eq!(compute_due_at(&task, None), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn decorate_fills_derived_fields() {
        let view = decorate(recurring(1, IntervalUnit::Hours), Some(at(2)), at(3));
        assert_eq!(view.last_done, Some(at(2)));
        assert_eq!(view.due_at, at(3));
        assert!(view.is_due);
    }
}
