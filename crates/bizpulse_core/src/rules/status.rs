//! Objective status classifier.
//!
//! # Responsibility
//! - Turn `(current, target, deadline, now)` into a lifecycle status.
//!
//! # Invariants
//! - Never returns `ObjectiveStatus::Paused`.
//! - No deadline or no positive target means `InProgress`, whatever the value.
//! - Reaching the target wins over lateness: a goal finished after its
//!   deadline is `Completed`.
//! - Expected progress is interpolated from January 1st of `now`'s year, not
//!   from the objective's own `start_date`.

use crate::model::objective::ObjectiveStatus;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

/// Percentage points an objective may trail the time-linear expectation and
/// still be considered on track.
pub const GRACE_BAND_PCT: f64 = 10.0;

/// Classifies an objective at instant `now`.
pub fn classify(
    current_value: f64,
    target_value: Option<f64>,
    end_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> ObjectiveStatus {
    let (Some(target), Some(end_date)) = (positive_target(target_value), end_date) else {
        return ObjectiveStatus::InProgress;
    };

    let progress_pct = current_value / target * 100.0;
    if progress_pct >= 100.0 {
        return ObjectiveStatus::Completed;
    }

    let deadline = start_of_day(end_date);
    if now > deadline {
        return ObjectiveStatus::Overdue;
    }

    // A zero-length window yields NaN here, which fails the comparison below
    // and reports overdue.
    let expected_pct = expected_progress_pct(now, deadline);
    if progress_pct >= expected_pct - GRACE_BAND_PCT {
        ObjectiveStatus::InProgress
    } else {
        ObjectiveStatus::Overdue
    }
}

/// Rounded completion percentage; 0 without a positive target.
pub fn progress_percent(current_value: f64, target_value: Option<f64>) -> i64 {
    match positive_target(target_value) {
        Some(target) => (current_value / target * 100.0).round() as i64,
        None => 0,
    }
}

/// Share of the year-start..deadline window already elapsed at `now`.
pub fn expected_progress_pct(now: DateTime<Utc>, deadline: DateTime<Utc>) -> f64 {
    let year_start = year_start(now);
    let elapsed = (now - year_start).num_milliseconds() as f64;
    let window = (deadline - year_start).num_milliseconds() as f64;
    elapsed / window * 100.0
}

fn positive_target(target_value: Option<f64>) -> Option<f64> {
    target_value.filter(|target| target.is_finite() && *target > 0.0)
}

/// Deadline instant of an end date: 00:00 UTC that day.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn year_start(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), 1, 1)
        .map(start_of_day)
        .unwrap_or(now)
}
