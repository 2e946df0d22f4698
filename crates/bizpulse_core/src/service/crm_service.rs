//! Lead, client and NPS use-cases.
//!
//! # Responsibility
//! - Space-checked CRUD for leads and clients, stamped by the service clock.
//! - Pipeline board and CRM statistics per space.
//!
//! # Invariants
//! - A record is never moved to another space by an update.
//! - NPS records inherit the client's space.

use crate::clock::{Clock, SystemClock};
use crate::model::client::{Client, ClientId, NpsRecord, NpsRecordId};
use crate::model::lead::{Lead, LeadId, LeadStatus};
use crate::repo::{CrmRepository, SpaceRepository};
use crate::rules::stats::{
    client_stats, nps_summary, pipeline_board, pipeline_stats, ClientStats, NpsSummary,
    PipelineColumn, PipelineStats,
};
use crate::service::{require_space, ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

pub struct CrmService<'a, R: CrmRepository + SpaceRepository + ?Sized> {
    repo: &'a R,
    clock: Box<dyn Clock>,
}

impl<'a, R: CrmRepository + SpaceRepository + ?Sized> CrmService<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self::with_clock(repo, Box::new(SystemClock))
    }

    pub fn with_clock(repo: &'a R, clock: Box<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Persists `lead` in its space with fresh timestamps.
    pub fn create_lead(&self, mut lead: Lead) -> ServiceResult<Lead> {
        require_space(self.repo, &lead.space_id)?;
        let now = self.clock.now();
        lead.created_at = now;
        lead.updated_at = now;
        lead.validate()?;

        let id = self.repo.create_lead(&lead)?;
        info!(
            "event=lead_create module=service status=ok space={} lead={} lead_status={}",
            lead.space_id,
            id,
            lead.status.as_str()
        );
        self.get_lead(id)
    }

    /// Full replacement of a lead's editable fields.
    pub fn update_lead(&self, mut lead: Lead) -> ServiceResult<Lead> {
        lead.updated_at = self.clock.now();
        self.repo.update_lead(&lead)?;
        self.get_lead(lead.id)
    }

    /// Moves a lead to another pipeline column.
    pub fn move_lead(&self, id: LeadId, status: LeadStatus) -> ServiceResult<Lead> {
        let mut lead = self.get_lead(id)?;
        let from = lead.status;
        lead.status = status;
        let lead = self.update_lead(lead)?;
        info!(
            "event=lead_move module=service status=ok lead={} from={} to={}",
            id,
            from.as_str(),
            status.as_str()
        );
        Ok(lead)
    }

    pub fn get_lead(&self, id: LeadId) -> ServiceResult<Lead> {
        self.repo
            .get_lead(id)?
            .ok_or_else(|| ServiceError::not_found("lead", id))
    }

    pub fn list_leads(&self, space_id: &str) -> ServiceResult<Vec<Lead>> {
        require_space(self.repo, space_id)?;
        Ok(self.repo.list_leads(space_id)?)
    }

    pub fn delete_lead(&self, id: LeadId) -> ServiceResult<()> {
        self.repo.delete_lead(id)?;
        info!("event=lead_delete module=service status=ok lead={}", id);
        Ok(())
    }

    /// Leads grouped by status in pipeline order.
    pub fn pipeline_board(&self, space_id: &str) -> ServiceResult<Vec<PipelineColumn>> {
        Ok(pipeline_board(&self.list_leads(space_id)?))
    }

    pub fn pipeline_stats(&self, space_id: &str) -> ServiceResult<PipelineStats> {
        Ok(pipeline_stats(&self.list_leads(space_id)?))
    }

    pub fn create_client(&self, mut client: Client) -> ServiceResult<Client> {
        require_space(self.repo, &client.space_id)?;
        let now = self.clock.now();
        client.created_at = now;
        client.updated_at = now;
        client.validate()?;

        let id = self.repo.create_client(&client)?;
        info!(
            "event=client_create module=service status=ok space={} client={}",
            client.space_id, id
        );
        self.get_client(id)
    }

    pub fn update_client(&self, mut client: Client) -> ServiceResult<Client> {
        client.updated_at = self.clock.now();
        self.repo.update_client(&client)?;
        self.get_client(client.id)
    }

    pub fn get_client(&self, id: ClientId) -> ServiceResult<Client> {
        self.repo
            .get_client(id)?
            .ok_or_else(|| ServiceError::not_found("client", id))
    }

    pub fn list_clients(&self, space_id: &str) -> ServiceResult<Vec<Client>> {
        require_space(self.repo, space_id)?;
        Ok(self.repo.list_clients(space_id)?)
    }

    /// Deletes a client together with its NPS history.
    pub fn delete_client(&self, id: ClientId) -> ServiceResult<()> {
        self.repo.delete_client(id)?;
        info!("event=client_delete module=service status=ok client={}", id);
        Ok(())
    }

    pub fn client_stats(&self, space_id: &str) -> ServiceResult<ClientStats> {
        let clients = self.list_clients(space_id)?;
        let nps_records = self.repo.list_space_nps_records(space_id)?;
        Ok(client_stats(&clients, &nps_records))
    }

    /// Records one NPS answer. `score` is `None` when the client skipped it.
    ///
    /// `recorded_at` backdates the answer, typically to
    /// `rules::ledger::month_anchor` for a monthly survey grid; it defaults to
    /// the service clock.
    pub fn record_nps(
        &self,
        client_id: ClientId,
        score: Option<u8>,
        feedback: Option<String>,
        recorded_at: Option<DateTime<Utc>>,
        created_by: Option<String>,
    ) -> ServiceResult<NpsRecord> {
        let client = self.get_client(client_id)?;
        let record = NpsRecord {
            id: Uuid::new_v4(),
            client_id,
            space_id: client.space_id,
            score,
            feedback,
            recorded_at: recorded_at.unwrap_or_else(|| self.clock.now()),
            created_by,
        };
        record.validate()?;
        self.repo.add_nps_record(&record)?;
        info!(
            "event=nps_record module=service status=ok client={} scored={}",
            client_id,
            score.is_some()
        );

        self.repo
            .list_nps_records(client_id)?
            .into_iter()
            .find(|stored| stored.id == record.id)
            .ok_or(ServiceError::InconsistentState(
                "recorded nps not found in read-back",
            ))
    }

    pub fn list_nps_records(&self, client_id: ClientId) -> ServiceResult<Vec<NpsRecord>> {
        self.get_client(client_id)?;
        Ok(self.repo.list_nps_records(client_id)?)
    }

    pub fn delete_nps_record(
        &self,
        client_id: ClientId,
        record_id: NpsRecordId,
    ) -> ServiceResult<()> {
        self.repo.delete_nps_record(client_id, record_id)?;
        Ok(())
    }

    /// Average, latest score and category for one client.
    pub fn client_nps(&self, client_id: ClientId) -> ServiceResult<NpsSummary> {
        Ok(nps_summary(&self.list_nps_records(client_id)?))
    }
}
