//! Dashboard alerts derived from leads, clients and objectives.
//!
//! # Responsibility
//! - Flag pipeline, retention and objective situations that need attention.
//!
//! # Invariants
//! - One alert per kind, emitted only when at least one record matches.
//! - Alerts come out in a fixed order: leads, then clients, then objectives.
//! - Objectives are expected to be refreshed before they are passed in.

use crate::model::client::{Client, ClientStatus, NpsCategory, NpsRecord};
use crate::model::lead::{Lead, LeadStatus};
use crate::model::objective::{Objective, ObjectiveStatus};
use crate::rules::stats::latest_nps;
use crate::rules::status::start_of_day;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Whole days a negotiation may sit untouched before it is stale.
pub const STALE_NEGOTIATION_DAYS: i64 = 7;
/// Deadlines this many whole days away or closer trigger a warning.
pub const DEADLINE_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    StaleNegotiations,
    NewLeads,
    LowNps,
    ChurnRisk,
    OverdueObjectives,
    DeadlineApproaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Leads,
    Clients,
    Objectives,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaleNegotiations => "stale_negotiations",
            Self::NewLeads => "new_leads",
            Self::LowNps => "low_nps",
            Self::ChurnRisk => "churn_risk",
            Self::OverdueObjectives => "overdue_objectives",
            Self::DeadlineApproaching => "deadline_approaching",
        }
    }

    pub fn severity(self) -> AlertSeverity {
        match self {
            Self::NewLeads | Self::DeadlineApproaching => AlertSeverity::Info,
            Self::StaleNegotiations | Self::ChurnRisk | Self::OverdueObjectives => {
                AlertSeverity::Warning
            }
            Self::LowNps => AlertSeverity::Error,
        }
    }

    pub fn category(self) -> AlertCategory {
        match self {
            Self::StaleNegotiations | Self::NewLeads => AlertCategory::Leads,
            Self::LowNps | Self::ChurnRisk => AlertCategory::Clients,
            Self::OverdueObjectives | Self::DeadlineApproaching => AlertCategory::Objectives,
        }
    }
}

/// One aggregated alert and the records behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub category: AlertCategory,
    pub record_ids: Vec<Uuid>,
}

impl Alert {
    fn new(kind: AlertKind, record_ids: Vec<Uuid>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            category: kind.category(),
            record_ids,
        }
    }

    pub fn count(&self) -> usize {
        self.record_ids.len()
    }

    pub fn message(&self) -> String {
        let count = self.count();
        match self.kind {
            AlertKind::StaleNegotiations => format!(
                "{count} lead(s) in negotiation for more than {STALE_NEGOTIATION_DAYS} days"
            ),
            AlertKind::NewLeads => format!("{count} new lead(s) waiting for action"),
            AlertKind::LowNps => format!(
                "{count} active client(s) with NPS below {}",
                NpsCategory::PASSIVE_MIN
            ),
            AlertKind::ChurnRisk => format!("{count} inactive client(s) at churn risk"),
            AlertKind::OverdueObjectives => format!("{count} objective(s) overdue"),
            AlertKind::DeadlineApproaching => format!(
                "{count} objective(s) below target with a deadline within {DEADLINE_WARNING_DAYS} days"
            ),
        }
    }
}

/// Derives every alert that applies at `now`.
pub fn derive_alerts(
    leads: &[Lead],
    clients: &[Client],
    nps_records: &[NpsRecord],
    objectives: &[Objective],
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let candidates = [
        (
            AlertKind::StaleNegotiations,
            leads
                .iter()
                .filter(|lead| is_stale_negotiation(lead, now))
                .map(|lead| lead.id)
                .collect::<Vec<_>>(),
        ),
        (
            AlertKind::NewLeads,
            leads
                .iter()
                .filter(|lead| lead.status == LeadStatus::New)
                .map(|lead| lead.id)
                .collect(),
        ),
        (
            AlertKind::LowNps,
            clients
                .iter()
                .filter(|client| has_low_latest_nps(client, nps_records))
                .map(|client| client.id)
                .collect(),
        ),
        (
            AlertKind::ChurnRisk,
            clients
                .iter()
                .filter(|client| client.status == ClientStatus::Inactive)
                .map(|client| client.id)
                .collect(),
        ),
        (
            AlertKind::OverdueObjectives,
            objectives
                .iter()
                .filter(|objective| objective.status == ObjectiveStatus::Overdue)
                .map(|objective| objective.id)
                .collect(),
        ),
        (
            AlertKind::DeadlineApproaching,
            objectives
                .iter()
                .filter(|objective| is_deadline_approaching(objective, now))
                .map(|objective| objective.id)
                .collect(),
        ),
    ];

    candidates
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(kind, ids)| Alert::new(kind, ids))
        .collect()
}

fn is_stale_negotiation(lead: &Lead, now: DateTime<Utc>) -> bool {
    lead.status == LeadStatus::Negotiation
        && (now - lead.updated_at).num_days() > STALE_NEGOTIATION_DAYS
}

/// Active client whose most recent answer is a scored detractor.
fn has_low_latest_nps(client: &Client, nps_records: &[NpsRecord]) -> bool {
    if client.status != ClientStatus::Active {
        return false;
    }
    let history = nps_records
        .iter()
        .filter(|record| record.client_id == client.id);
    matches!(
        latest_nps(history).map(NpsCategory::from_score),
        Some(NpsCategory::Detractor)
    )
}

/// Deadline 1..=30 whole days ahead and value still under target.
fn is_deadline_approaching(objective: &Objective, now: DateTime<Utc>) -> bool {
    let Some(end_date) = objective.end_date else {
        return false;
    };
    let days_left = (start_of_day(end_date) - now).num_days();
    days_left > 0
        && days_left <= DEADLINE_WARNING_DAYS
        && objective.current_value < objective.target_value.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn lead(status: LeadStatus, updated_days_ago: i64) -> Lead {
        let mut lead = Lead::new("acme", "Ana", now());
        lead.status = status;
        lead.updated_at = now() - Duration::days(updated_days_ago);
        lead
    }

    fn active_client() -> Client {
        let mut client = Client::new("acme", "Wayne", now());
        client.status = ClientStatus::Active;
        client
    }

    fn nps(client: &Client, score: Option<u8>, days_ago: i64) -> NpsRecord {
        NpsRecord {
            id: Uuid::new_v4(),
            client_id: client.id,
            space_id: client.space_id.clone(),
            score,
            feedback: None,
            recorded_at: now() - Duration::days(days_ago),
            created_by: None,
        }
    }

    fn objective(current: f64, target: Option<f64>, end_date: Option<NaiveDate>) -> Objective {
        let mut objective = Objective::new("acme", "Contracts", now());
        objective.current_value = current;
        objective.target_value = target;
        objective.end_date = end_date;
        objective
    }

    fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
        alerts.iter().map(|alert| alert.kind).collect()
    }

    #[test]
    fn nothing_to_report_yields_no_alerts() {
        assert!(derive_alerts(&[], &[], &[], &[], now()).is_empty());
    }

    #[test]
    fn negotiation_becomes_stale_after_seven_whole_days() {
        let seven = lead(LeadStatus::Negotiation, 7);
        let mut almost_eight = lead(LeadStatus::Negotiation, 7);
        almost_eight.updated_at -= Duration::hours(23);
        let eight = lead(LeadStatus::Negotiation, 8);
        let old_proposal = lead(LeadStatus::Proposal, 30);

        let alerts = derive_alerts(
            &[seven, almost_eight, eight.clone(), old_proposal],
            &[],
            &[],
            &[],
            now(),
        );
        assert_eq!(kinds(&alerts), vec![AlertKind::StaleNegotiations]);
        assert_eq!(alerts[0].record_ids, vec![eight.id]);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn new_leads_are_counted() {
        let alerts = derive_alerts(
            &[lead(LeadStatus::New, 0), lead(LeadStatus::New, 3), lead(LeadStatus::Won, 0)],
            &[],
            &[],
            &[],
            now(),
        );
        assert_eq!(kinds(&alerts), vec![AlertKind::NewLeads]);
        assert_eq!(alerts[0].count(), 2);
        assert_eq!(alerts[0].message(), "2 new lead(s) waiting for action");
    }

    #[test]
    fn low_nps_looks_at_latest_answer_below_seven() {
        let six = active_client();
        let seven = active_client();
        let recovered = active_client();
        let mut inactive = active_client();
        inactive.status = ClientStatus::Inactive;
        let skipped = active_client();

        let records = vec![
            nps(&six, Some(6), 1),
            nps(&seven, Some(7), 1),
            nps(&recovered, Some(2), 40),
            nps(&recovered, Some(9), 2),
            nps(&inactive, Some(1), 1),
            nps(&skipped, Some(3), 40),
            nps(&skipped, None, 1),
        ];
        let clients = vec![six.clone(), seven, recovered, inactive.clone(), skipped];

        let alerts = derive_alerts(&[], &clients, &records, &[], now());
        assert_eq!(kinds(&alerts), vec![AlertKind::LowNps, AlertKind::ChurnRisk]);
        assert_eq!(alerts[0].record_ids, vec![six.id]);
        assert_eq!(alerts[0].severity, AlertSeverity::Error);
        assert_eq!(alerts[1].record_ids, vec![inactive.id]);
    }

    #[test]
    fn overdue_objectives_follow_stored_status() {
        let mut late = objective(1.0, Some(10.0), None);
        late.status = ObjectiveStatus::Overdue;
        let on_track = objective(1.0, Some(10.0), None);

        let alerts = derive_alerts(&[], &[], &[], &[late.clone(), on_track], now());
        assert_eq!(kinds(&alerts), vec![AlertKind::OverdueObjectives]);
        assert_eq!(alerts[0].record_ids, vec![late.id]);
    }

    #[test]
    fn deadline_warning_covers_one_to_thirty_whole_days() {
        // now is 2025-06-01 12:00 UTC; deadlines are 00:00 UTC on the end date.
        let date = |month, day| NaiveDate::from_ymd_opt(2025, month, day);
        let half_day = objective(1.0, Some(10.0), date(6, 2));
        let one_day = objective(1.0, Some(10.0), date(6, 3));
        let twenty_nine_days = objective(1.0, Some(10.0), date(7, 1));
        let thirty_days = objective(1.0, Some(10.0), date(7, 2));
        let thirty_one_days = objective(1.0, Some(10.0), date(7, 3));
        let passed = objective(1.0, Some(10.0), date(6, 1));
        let reached = objective(10.0, Some(10.0), date(6, 10));
        let no_target = objective(0.0, None, date(6, 10));
        let no_deadline = objective(1.0, Some(10.0), None);

        let alerts = derive_alerts(
            &[],
            &[],
            &[],
            &[
                half_day,
                one_day.clone(),
                twenty_nine_days.clone(),
                thirty_days.clone(),
                thirty_one_days,
                passed,
                reached,
                no_target,
                no_deadline,
            ],
            now(),
        );
        assert_eq!(kinds(&alerts), vec![AlertKind::DeadlineApproaching]);
        assert_eq!(
            alerts[0].record_ids,
            vec![one_day.id, twenty_nine_days.id, thirty_days.id]
        );
    }
}
