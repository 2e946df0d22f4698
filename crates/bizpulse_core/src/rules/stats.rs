//! Dashboard aggregates over objectives, leads, clients and NPS records.

use crate::model::client::{Client, ClientStatus, NpsCategory, NpsRecord};
use crate::model::lead::{Lead, LeadStatus};
use crate::model::objective::{Objective, ObjectiveStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectiveStats {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
    pub paused: usize,
}

pub fn objective_stats<'a>(objectives: impl IntoIterator<Item = &'a Objective>) -> ObjectiveStats {
    let mut stats = ObjectiveStats::default();
    for objective in objectives {
        stats.total += 1;
        match objective.status {
            ObjectiveStatus::InProgress => stats.in_progress += 1,
            ObjectiveStatus::Completed => stats.completed += 1,
            ObjectiveStatus::Overdue => stats.overdue += 1,
            ObjectiveStatus::Paused => stats.paused += 1,
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Leads in any non-terminal stage.
    pub open_count: usize,
    pub open_value: f64,
    /// Leads at proposal stage or later, won included.
    pub proposals_sent: usize,
    /// Rounded won/total percentage; 0 when there are no leads.
    pub conversion_rate: i64,
    pub won_count: usize,
    pub won_value: f64,
}

pub fn pipeline_stats(leads: &[Lead]) -> PipelineStats {
    let mut stats = PipelineStats::default();
    for lead in leads {
        let value = lead.value.unwrap_or(0.0);
        if lead.status.is_open() {
            stats.open_count += 1;
            stats.open_value += value;
        }
        if matches!(
            lead.status,
            LeadStatus::Proposal | LeadStatus::Negotiation | LeadStatus::Won
        ) {
            stats.proposals_sent += 1;
        }
        if lead.status == LeadStatus::Won {
            stats.won_count += 1;
            stats.won_value += value;
        }
    }
    if !leads.is_empty() {
        stats.conversion_rate =
            (stats.won_count as f64 / leads.len() as f64 * 100.0).round() as i64;
    }
    stats
}

/// One column of the pipeline board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineColumn {
    pub status: LeadStatus,
    pub leads: Vec<Lead>,
}

/// Groups leads by stage in pipeline order. Empty stages are kept.
pub fn pipeline_board(leads: &[Lead]) -> Vec<PipelineColumn> {
    LeadStatus::PIPELINE
        .into_iter()
        .map(|status| PipelineColumn {
            status,
            leads: leads
                .iter()
                .filter(|lead| lead.status == status)
                .cloned()
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClientStats {
    pub active_count: usize,
    pub inactive_count: usize,
    pub churned_count: usize,
    /// Monthly recurring revenue of active clients.
    pub total_mrr: f64,
    /// Rounded MRR per active client; 0 when none are active.
    pub average_ticket: f64,
    /// Mean of every scored NPS record, one decimal.
    pub average_nps: f64,
}

pub fn client_stats(clients: &[Client], nps_records: &[NpsRecord]) -> ClientStats {
    let mut stats = ClientStats::default();
    for client in clients {
        match client.status {
            ClientStatus::Active => {
                stats.active_count += 1;
                stats.total_mrr += client.monthly_value.unwrap_or(0.0);
            }
            ClientStatus::Inactive => stats.inactive_count += 1,
            ClientStatus::Churned => stats.churned_count += 1,
        }
    }
    if stats.active_count > 0 {
        stats.average_ticket = (stats.total_mrr / stats.active_count as f64).round();
    }
    stats.average_nps = average_nps(nps_records);
    stats
}

/// Mean score of scored records rounded to one decimal; 0 when none.
pub fn average_nps(records: &[NpsRecord]) -> f64 {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|record| record.score)
        .map(f64::from)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Score of the most recently recorded answer, which may itself be unscored.
pub fn latest_nps<'a>(records: impl IntoIterator<Item = &'a NpsRecord>) -> Option<u8> {
    records
        .into_iter()
        .max_by_key(|record| record.recorded_at)
        .and_then(|record| record.score)
}

/// Per-client NPS view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NpsSummary {
    pub average: f64,
    pub latest: Option<u8>,
    pub latest_category: Option<NpsCategory>,
    pub responses: usize,
}

pub fn nps_summary(records: &[NpsRecord]) -> NpsSummary {
    let latest = latest_nps(records);
    NpsSummary {
        average: average_nps(records),
        latest,
        latest_category: latest.map(NpsCategory::from_score),
        responses: records.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn lead(status: LeadStatus, value: f64) -> Lead {
        let mut lead = Lead::new("acme", "lead", Utc::now());
        lead.status = status;
        lead.value = Some(value);
        lead
    }

    fn nps(score: Option<u8>, days_ago: i64) -> NpsRecord {
        NpsRecord {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            space_id: "acme".to_string(),
            score,
            feedback: None,
            recorded_at: Utc::now() - Duration::days(days_ago),
            created_by: None,
        }
    }

    #[test]
    fn pipeline_stats_split_open_and_won() {
        let leads = vec![
            lead(LeadStatus::New, 100.0),
            lead(LeadStatus::Proposal, 200.0),
            lead(LeadStatus::Won, 300.0),
            lead(LeadStatus::Lost, 400.0),
        ];
        let stats = pipeline_stats(&leads);
        assert_eq!(stats.open_count, 2);
        assert_eq!(stats.open_value, 300.0);
        assert_eq!(stats.proposals_sent, 2);
        assert_eq!(stats.won_count, 1);
        assert_eq!(stats.won_value, 300.0);
        assert_eq!(stats.conversion_rate, 25);

        assert_eq!(pipeline_stats(&[]).conversion_rate, 0);
    }

    #[test]
    fn board_keeps_every_stage_in_order() {
        let board = pipeline_board(&[lead(LeadStatus::Won, 1.0), lead(LeadStatus::New, 1.0)]);
        assert_eq!(board.len(), 8);
        assert_eq!(board[0].status, LeadStatus::New);
        assert_eq!(board[0].leads.len(), 1);
        assert_eq!(board[6].status, LeadStatus::Won);
        assert_eq!(board[6].leads.len(), 1);
        assert!(board[7].leads.is_empty());
    }

    #[test]
    fn average_nps_skips_unscored_answers() {
        let records = vec![nps(Some(9), 3), nps(None, 2), nps(Some(6), 1), nps(Some(8), 0)];
        assert_eq!(average_nps(&records), 7.7);
        assert_eq!(average_nps(&[]), 0.0);
    }

    #[test]
    fn latest_nps_uses_most_recent_answer() {
        let records = vec![nps(Some(3), 10), nps(Some(10), 1), nps(Some(7), 5)];
        let summary = nps_summary(&records);
        assert_eq!(summary.latest, Some(10));
        assert_eq!(summary.latest_category, Some(NpsCategory::Promoter));
        assert_eq!(summary.responses, 3);
        assert_eq!(latest_nps(&Vec::<NpsRecord>::new()), None);
    }

    #[test]
    fn client_stats_average_ticket_over_active_only() {
        let mut churned = Client::new("acme", "c", Utc::now());
        churned.status = ClientStatus::Churned;
        churned.monthly_value = Some(9_000.0);
        let mut active_a = Client::new("acme", "a", Utc::now());
        active_a.monthly_value = Some(1_000.0);
        let mut active_b = Client::new("acme", "b", Utc::now());
        active_b.monthly_value = Some(2_001.0);

        let stats = client_stats(&[churned, active_a, active_b], &[]);
        assert_eq!(stats.active_count, 2);
        assert_eq!(stats.churned_count, 1);
        assert_eq!(stats.total_mrr, 3_001.0);
        assert_eq!(stats.average_ticket, 1_501.0);
        assert_eq!(stats.average_nps, 0.0);
    }
}
