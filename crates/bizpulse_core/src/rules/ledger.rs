//! Progress ledger arithmetic.
//!
//! # Responsibility
//! - Derive an objective's `current_value`/`status` pair from its ledger or
//!   from the auto-metric resolver.
//! - Order entries for presentation and bucket them by month.
//!
//! # Invariants
//! - Entries are ordered newest-first by `logged_at`; equal timestamps keep
//!   insertion order.
//! - For non-auto-linked objectives the derived value is exactly the sum of
//!   the entries passed in.

use crate::model::objective::{Objective, ObjectiveStatus, ProgressEntry};
use crate::rules::auto_metric::CrmSnapshot;
use crate::rules::status::classify;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

/// Current value and status computed together, persisted together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedProgress {
    pub current_value: f64,
    pub status: ObjectiveStatus,
}

impl DerivedProgress {
    pub fn apply_to(self, objective: &mut Objective) {
        objective.current_value = self.current_value;
        objective.status = self.status;
    }
}

/// Sum of entry values.
pub fn ledger_sum(entries: &[ProgressEntry]) -> f64 {
    entries.iter().map(|entry| entry.value).sum()
}

/// Recomputes value and status for `objective` at `now`.
///
/// Auto-linked objectives take their value from `snapshot`; a missing
/// snapshot resolves to zero. Everything else sums `entries`.
pub fn derive_progress(
    objective: &Objective,
    entries: &[ProgressEntry],
    snapshot: Option<&CrmSnapshot>,
    now: DateTime<Utc>,
) -> DerivedProgress {
    let current_value = if objective.is_auto_linked() {
        snapshot
            .map(|snapshot| snapshot.resolve(objective.auto_source, &objective.space_id))
            .unwrap_or(0.0)
    } else {
        ledger_sum(entries)
    };

    DerivedProgress {
        current_value,
        status: classify(
            current_value,
            objective.target_value,
            objective.end_date,
            now,
        ),
    }
}

/// Sorts newest-first by `logged_at`. Stable, so ties keep input order.
pub fn sort_newest_first(entries: &mut [ProgressEntry]) {
    entries.sort_by(|left, right| right.logged_at.cmp(&left.logged_at));
}

/// Timestamp used when an entry is backdated to a month: 12:00 UTC on the 1st.
///
/// `month` is 1-based. Returns `None` for an invalid month.
pub fn month_anchor(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 12, 0, 0).single()
}

/// Entries of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthTotal {
    /// 1-based month.
    pub month: u32,
    pub total: f64,
    pub entry_count: usize,
}

/// Buckets entries of `year` into twelve monthly totals (UTC months).
pub fn monthly_totals(entries: &[ProgressEntry], year: i32) -> [MonthTotal; 12] {
    let mut totals: [MonthTotal; 12] = std::array::from_fn(|index| MonthTotal {
        month: index as u32 + 1,
        total: 0.0,
        entry_count: 0,
    });

    for entry in entries.iter().filter(|entry| entry.logged_at.year() == year) {
        let bucket = &mut totals[entry.logged_at.month0() as usize];
        bucket.total += entry.value;
        bucket.entry_count += 1;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::client::{Client, ClientStatus};
    use crate::model::objective::AutoMetricSource;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn entry(value: f64, logged_at: DateTime<Utc>) -> ProgressEntry {
        ProgressEntry::new(Uuid::new_v4(), value, logged_at)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn derive_sums_ledger_for_manual_objectives() {
        let mut objective = Objective::new("acme", "Calls", now());
        objective.target_value = Some(10.0);
        objective.end_date = NaiveDate::from_ymd_opt(2025, 12, 31);
        let entries = vec![entry(2.0, now()), entry(2.0, now()), entry(2.0, now())];

        let derived = derive_progress(&objective, &entries, None, now());
        assert_eq!(derived.current_value, 6.0);
        assert_eq!(derived.status, ObjectiveStatus::InProgress);
    }

    #[test]
    fn derive_uses_snapshot_for_auto_linked_objectives() {
        let mut objective = Objective::new("acme", "Active clients", now());
        objective.is_commercial = true;
        objective.auto_source = AutoMetricSource::ActiveCount;
        objective.target_value = Some(3.0);
        objective.end_date = NaiveDate::from_ymd_opt(2025, 12, 31);

        let mut inactive = Client::new("acme", "d", now());
        inactive.status = ClientStatus::Inactive;
        let snapshot = CrmSnapshot {
            leads: Vec::new(),
            clients: vec![
                Client::new("acme", "a", now()),
                Client::new("acme", "b", now()),
                Client::new("acme", "c", now()),
                inactive,
            ],
        };
        let ledger = vec![entry(50.0, now())];

        let derived = derive_progress(&objective, &ledger, Some(&snapshot), now());
        assert_eq!(derived.current_value, 3.0);
        assert_eq!(derived.status, ObjectiveStatus::Completed);
    }

    #[test]
    fn sort_is_newest_first_and_stable_on_ties() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let first_tie = entry(1.0, late);
        let second_tie = entry(2.0, late);
        let oldest = entry(3.0, early);
        let mut entries = vec![oldest.clone(), first_tie.clone(), second_tie.clone()];

        sort_newest_first(&mut entries);
        let ids: Vec<_> = entries.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![first_tie.id, second_tie.id, oldest.id]);
    }

    #[test]
    fn monthly_totals_bucket_only_requested_year() {
        let entries = vec![
            entry(2.0, month_anchor(2025, 1).unwrap()),
            entry(3.0, Utc.with_ymd_and_hms(2025, 1, 31, 23, 0, 0).unwrap()),
            entry(5.0, month_anchor(2025, 12).unwrap()),
            entry(7.0, month_anchor(2024, 1).unwrap()),
        ];

        let totals = monthly_totals(&entries, 2025);
        assert_eq!(totals[0].month, 1);
        assert_eq!(totals[0].total, 5.0);
        assert_eq!(totals[0].entry_count, 2);
        assert_eq!(totals[11].total, 5.0);
        assert_eq!(totals[5].entry_count, 0);
    }

    #[test]
    fn month_anchor_rejects_invalid_month() {
        assert!(month_anchor(2025, 13).is_none());
        assert_eq!(
            month_anchor(2025, 2).unwrap().to_rfc3339(),
            "2025-02-01T12:00:00+00:00"
        );
    }
}
