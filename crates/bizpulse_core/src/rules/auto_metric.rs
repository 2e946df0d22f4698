//! Auto-metric resolver for commercial objectives.
//!
//! # Invariants
//! - Only records of the requested space contribute, even if the snapshot
//!   holds other spaces.
//! - Missing amounts count as zero.
//! - The result is never cached here; callers pass a fresh snapshot.

use crate::model::client::{Client, ClientStatus};
use crate::model::lead::{Lead, LeadStatus};
use crate::model::objective::AutoMetricSource;

/// Leads and clients of one space, fetched right before resolution.
#[derive(Debug, Clone, Default)]
pub struct CrmSnapshot {
    pub leads: Vec<Lead>,
    pub clients: Vec<Client>,
}

/// Computes the value an auto-linked objective currently has.
pub fn resolve_auto_value(
    source: AutoMetricSource,
    space_id: &str,
    leads: &[Lead],
    clients: &[Client],
) -> f64 {
    let space_leads = || leads.iter().filter(move |lead| lead.space_id == space_id);
    let active_clients = || {
        clients
            .iter()
            .filter(move |client| client.space_id == space_id)
            .filter(|client| client.status == ClientStatus::Active)
    };

    match source {
        AutoMetricSource::None => 0.0,
        AutoMetricSource::PipelineValue => space_leads()
            .filter(|lead| lead.status.is_open())
            .map(|lead| lead.value.unwrap_or(0.0))
            .sum(),
        AutoMetricSource::WonValue => space_leads()
            .filter(|lead| lead.status == LeadStatus::Won)
            .map(|lead| lead.value.unwrap_or(0.0))
            .sum(),
        AutoMetricSource::ActiveRecurringRevenue => active_clients()
            .map(|client| client.monthly_value.unwrap_or(0.0))
            .sum(),
        AutoMetricSource::ActiveCount => active_clients().count() as f64,
    }
}

impl CrmSnapshot {
    pub fn resolve(&self, source: AutoMetricSource, space_id: &str) -> f64 {
        resolve_auto_value(source, space_id, &self.leads, &self.clients)
    }
}
