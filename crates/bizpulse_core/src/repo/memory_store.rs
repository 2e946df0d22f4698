//! In-memory store.
//!
//! # Responsibility
//! - Implement every repository contract without a database, for tests and
//!   throwaway sessions.
//!
//! # Invariants
//! - One lock guards all collections, so a ledger write and the objective's
//!   derived state change together.
//! - Collections keep insertion order; list reads match the SQLite ordering.

use crate::model::client::{Client, ClientId, NpsRecord, NpsRecordId};
use crate::model::lead::{Lead, LeadId};
use crate::model::objective::{Objective, ObjectiveId, ProgressEntry, ProgressEntryId};
use crate::model::space::Space;
use crate::repo::events::{ChangeAction, ChangeEvent, ChangeNotifier, EntityKind};
use crate::repo::{
    CrmRepository, ObjectiveRepository, RepoError, RepoResult, SpaceRepository, Store,
};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    spaces: Vec<Space>,
    leads: Vec<Lead>,
    clients: Vec<Client>,
    nps_records: Vec<NpsRecord>,
    objectives: Vec<Objective>,
    progress_entries: Vec<ProgressEntry>,
}

impl MemoryState {
    fn require_space(&self, space_id: &str) -> RepoResult<()> {
        if self.spaces.iter().any(|space| space.id == space_id) {
            Ok(())
        } else {
            Err(RepoError::not_found("space", space_id))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| RepoError::StatePoisoned)
    }

    fn publish(&self, event: ChangeEvent) {
        self.notifier.publish(event);
    }
}

impl Store for MemoryStore {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Stable sort, so equal timestamps keep insertion order like `rowid` does.
fn sorted_by<T>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> i64) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(key);
    items
}

impl SpaceRepository for MemoryStore {
    fn create_space(&self, space: &Space) -> RepoResult<()> {
        space.validate()?;
        {
            let mut state = self.lock()?;
            if state.spaces.iter().any(|existing| existing.id == space.id) {
                return Err(RepoError::conflict("space", &space.id));
            }
            state.spaces.push(space.clone());
        }

        self.publish(ChangeEvent::new(
            space.id.as_str(),
            EntityKind::Space,
            &space.id,
            ChangeAction::Created,
        ));
        Ok(())
    }

    fn get_space(&self, id: &str) -> RepoResult<Option<Space>> {
        let state = self.lock()?;
        Ok(state.spaces.iter().find(|space| space.id == id).cloned())
    }

    fn list_spaces(&self) -> RepoResult<Vec<Space>> {
        let state = self.lock()?;
        Ok(sorted_by(state.spaces.iter().cloned(), |space| {
            space.created_at.timestamp_millis()
        }))
    }

    fn update_space(&self, space: &Space) -> RepoResult<()> {
        space.validate()?;
        {
            let mut state = self.lock()?;
            let existing = state
                .spaces
                .iter_mut()
                .find(|existing| existing.id == space.id)
                .ok_or_else(|| RepoError::not_found("space", &space.id))?;
            existing.label = space.label.clone();
            existing.description = space.description.clone();
            existing.color = space.color.clone();
        }

        self.publish(ChangeEvent::new(
            space.id.as_str(),
            EntityKind::Space,
            &space.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn delete_space(&self, id: &str) -> RepoResult<()> {
        {
            let mut state = self.lock()?;
            let index = state
                .spaces
                .iter()
                .position(|space| space.id == id)
                .ok_or_else(|| RepoError::not_found("space", id))?;
            state.spaces.remove(index);

            let removed_objectives: Vec<ObjectiveId> = state
                .objectives
                .iter()
                .filter(|objective| objective.space_id == id)
                .map(|objective| objective.id)
                .collect();
            state
                .progress_entries
                .retain(|entry| !removed_objectives.contains(&entry.objective_id));
            state.objectives.retain(|objective| objective.space_id != id);
            state.nps_records.retain(|record| record.space_id != id);
            state.clients.retain(|client| client.space_id != id);
            state.leads.retain(|lead| lead.space_id != id);
        }

        self.publish(ChangeEvent::new(
            id,
            EntityKind::Space,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }
}

impl CrmRepository for MemoryStore {
    fn create_lead(&self, lead: &Lead) -> RepoResult<LeadId> {
        lead.validate()?;
        {
            let mut state = self.lock()?;
            state.require_space(&lead.space_id)?;
            if state.leads.iter().any(|existing| existing.id == lead.id) {
                return Err(RepoError::conflict("lead", lead.id));
            }
            let mut stored = lead.clone();
            stored.name = lead.name.trim().to_string();
            state.leads.push(stored);
        }

        self.publish(ChangeEvent::new(
            lead.space_id.as_str(),
            EntityKind::Lead,
            lead.id,
            ChangeAction::Created,
        ));
        Ok(lead.id)
    }

    fn update_lead(&self, lead: &Lead) -> RepoResult<()> {
        lead.validate()?;
        {
            let mut state = self.lock()?;
            let existing = state
                .leads
                .iter_mut()
                .find(|existing| existing.id == lead.id && existing.space_id == lead.space_id)
                .ok_or_else(|| RepoError::not_found("lead", lead.id))?;
            let created_at = existing.created_at;
            let created_by = existing.created_by.take();
            *existing = lead.clone();
            existing.name = lead.name.trim().to_string();
            existing.created_at = created_at;
            existing.created_by = created_by;
        }

        self.publish(ChangeEvent::new(
            lead.space_id.as_str(),
            EntityKind::Lead,
            lead.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn get_lead(&self, id: LeadId) -> RepoResult<Option<Lead>> {
        let state = self.lock()?;
        Ok(state.leads.iter().find(|lead| lead.id == id).cloned())
    }

    fn list_leads(&self, space_id: &str) -> RepoResult<Vec<Lead>> {
        let state = self.lock()?;
        Ok(sorted_by(
            state.leads.iter().filter(|lead| lead.space_id == space_id).cloned(),
            |lead| lead.created_at.timestamp_millis(),
        ))
    }

    fn delete_lead(&self, id: LeadId) -> RepoResult<()> {
        let removed = {
            let mut state = self.lock()?;
            let index = state
                .leads
                .iter()
                .position(|lead| lead.id == id)
                .ok_or_else(|| RepoError::not_found("lead", id))?;
            state.leads.remove(index)
        };

        self.publish(ChangeEvent::new(
            removed.space_id,
            EntityKind::Lead,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }

    fn create_client(&self, client: &Client) -> RepoResult<ClientId> {
        client.validate()?;
        {
            let mut state = self.lock()?;
            state.require_space(&client.space_id)?;
            if state.clients.iter().any(|existing| existing.id == client.id) {
                return Err(RepoError::conflict("client", client.id));
            }
            let mut stored = client.clone();
            stored.name = client.name.trim().to_string();
            state.clients.push(stored);
        }

        self.publish(ChangeEvent::new(
            client.space_id.as_str(),
            EntityKind::Client,
            client.id,
            ChangeAction::Created,
        ));
        Ok(client.id)
    }

    fn update_client(&self, client: &Client) -> RepoResult<()> {
        client.validate()?;
        {
            let mut state = self.lock()?;
            let existing = state
                .clients
                .iter_mut()
                .find(|existing| {
                    existing.id == client.id && existing.space_id == client.space_id
                })
                .ok_or_else(|| RepoError::not_found("client", client.id))?;
            let created_at = existing.created_at;
            let created_by = existing.created_by.take();
            *existing = client.clone();
            existing.name = client.name.trim().to_string();
            existing.created_at = created_at;
            existing.created_by = created_by;
        }

        self.publish(ChangeEvent::new(
            client.space_id.as_str(),
            EntityKind::Client,
            client.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn get_client(&self, id: ClientId) -> RepoResult<Option<Client>> {
        let state = self.lock()?;
        Ok(state.clients.iter().find(|client| client.id == id).cloned())
    }

    fn list_clients(&self, space_id: &str) -> RepoResult<Vec<Client>> {
        let state = self.lock()?;
        Ok(sorted_by(
            state
                .clients
                .iter()
                .filter(|client| client.space_id == space_id)
                .cloned(),
            |client| client.created_at.timestamp_millis(),
        ))
    }

    fn delete_client(&self, id: ClientId) -> RepoResult<()> {
        let removed = {
            let mut state = self.lock()?;
            let index = state
                .clients
                .iter()
                .position(|client| client.id == id)
                .ok_or_else(|| RepoError::not_found("client", id))?;
            state.nps_records.retain(|record| record.client_id != id);
            state.clients.remove(index)
        };

        self.publish(ChangeEvent::new(
            removed.space_id,
            EntityKind::Client,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }

    fn add_nps_record(&self, record: &NpsRecord) -> RepoResult<NpsRecordId> {
        record.validate()?;
        {
            let mut state = self.lock()?;
            if !state
                .clients
                .iter()
                .any(|client| client.id == record.client_id)
            {
                return Err(RepoError::not_found("client", record.client_id));
            }
            if state.nps_records.iter().any(|existing| existing.id == record.id) {
                return Err(RepoError::conflict("nps record", record.id));
            }
            state.nps_records.push(record.clone());
        }

        self.publish(ChangeEvent::new(
            record.space_id.as_str(),
            EntityKind::NpsRecord,
            record.id,
            ChangeAction::Created,
        ));
        Ok(record.id)
    }

    fn list_nps_records(&self, client_id: ClientId) -> RepoResult<Vec<NpsRecord>> {
        let state = self.lock()?;
        Ok(sorted_by(
            state
                .nps_records
                .iter()
                .filter(|record| record.client_id == client_id)
                .cloned(),
            |record| record.recorded_at.timestamp_millis(),
        ))
    }

    fn list_space_nps_records(&self, space_id: &str) -> RepoResult<Vec<NpsRecord>> {
        let state = self.lock()?;
        Ok(sorted_by(
            state
                .nps_records
                .iter()
                .filter(|record| record.space_id == space_id)
                .cloned(),
            |record| record.recorded_at.timestamp_millis(),
        ))
    }

    fn delete_nps_record(&self, client_id: ClientId, record_id: NpsRecordId) -> RepoResult<()> {
        let removed = {
            let mut state = self.lock()?;
            let index = state
                .nps_records
                .iter()
                .position(|record| record.id == record_id && record.client_id == client_id)
                .ok_or_else(|| RepoError::not_found("nps record", record_id))?;
            state.nps_records.remove(index)
        };

        self.publish(ChangeEvent::new(
            removed.space_id,
            EntityKind::NpsRecord,
            record_id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }
}

impl ObjectiveRepository for MemoryStore {
    fn create_objective(&self, objective: &Objective) -> RepoResult<ObjectiveId> {
        objective.validate()?;
        {
            let mut state = self.lock()?;
            state.require_space(&objective.space_id)?;
            if state
                .objectives
                .iter()
                .any(|existing| existing.id == objective.id)
            {
                return Err(RepoError::conflict("objective", objective.id));
            }
            let mut stored = objective.clone();
            stored.title = objective.title.trim().to_string();
            state.objectives.push(stored);
        }

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Created,
        ));
        Ok(objective.id)
    }

    fn update_objective(&self, objective: &Objective) -> RepoResult<()> {
        objective.validate()?;
        {
            let mut state = self.lock()?;
            let existing = state
                .objectives
                .iter_mut()
                .find(|existing| {
                    existing.id == objective.id && existing.space_id == objective.space_id
                })
                .ok_or_else(|| RepoError::not_found("objective", objective.id))?;
            let created_at = existing.created_at;
            let created_by = existing.created_by.take();
            *existing = objective.clone();
            existing.title = objective.title.trim().to_string();
            existing.created_at = created_at;
            existing.created_by = created_by;
        }

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn get_objective(&self, id: ObjectiveId) -> RepoResult<Option<Objective>> {
        let state = self.lock()?;
        Ok(state
            .objectives
            .iter()
            .find(|objective| objective.id == id)
            .cloned())
    }

    fn list_objectives(&self, space_id: &str) -> RepoResult<Vec<Objective>> {
        let state = self.lock()?;
        Ok(sorted_by(
            state
                .objectives
                .iter()
                .filter(|objective| objective.space_id == space_id)
                .cloned(),
            |objective| objective.created_at.timestamp_millis(),
        ))
    }

    fn delete_objective(&self, id: ObjectiveId) -> RepoResult<()> {
        let removed = {
            let mut state = self.lock()?;
            let index = state
                .objectives
                .iter()
                .position(|objective| objective.id == id)
                .ok_or_else(|| RepoError::not_found("objective", id))?;
            state.progress_entries.retain(|entry| entry.objective_id != id);
            state.objectives.remove(index)
        };

        self.publish(ChangeEvent::new(
            removed.space_id,
            EntityKind::Objective,
            id,
            ChangeAction::Deleted,
        ));
        Ok(())
    }

    fn list_progress_entries(&self, objective_id: ObjectiveId) -> RepoResult<Vec<ProgressEntry>> {
        let state = self.lock()?;
        Ok(state
            .progress_entries
            .iter()
            .filter(|entry| entry.objective_id == objective_id)
            .cloned()
            .collect())
    }

    fn insert_progress_entry(
        &self,
        entry: &ProgressEntry,
        objective: &Objective,
    ) -> RepoResult<()> {
        entry.validate()?;
        objective.validate()?;
        if entry.objective_id != objective.id {
            return Err(RepoError::InvalidData(format!(
                "progress entry {} belongs to objective {}, not {}",
                entry.id, entry.objective_id, objective.id
            )));
        }

        {
            let mut state = self.lock()?;
            if state
                .progress_entries
                .iter()
                .any(|existing| existing.id == entry.id)
            {
                return Err(RepoError::conflict("progress entry", entry.id));
            }
            write_derived(&mut state, objective)?;
            state.progress_entries.push(entry.clone());
        }

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::ProgressEntry,
            entry.id,
            ChangeAction::Created,
        ));
        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }

    fn delete_progress_entry(
        &self,
        entry_id: ProgressEntryId,
        objective: &Objective,
    ) -> RepoResult<()> {
        objective.validate()?;

        {
            let mut state = self.lock()?;
            let index = state
                .progress_entries
                .iter()
                .position(|entry| entry.id == entry_id && entry.objective_id == objective.id)
                .ok_or_else(|| RepoError::not_found("progress entry", entry_id))?;
            write_derived(&mut state, objective)?;
            state.progress_entries.remove(index);
        }

        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::ProgressEntry,
            entry_id,
            ChangeAction::Deleted,
        ));
        self.publish(ChangeEvent::new(
            objective.space_id.as_str(),
            EntityKind::Objective,
            objective.id,
            ChangeAction::Updated,
        ));
        Ok(())
    }
}

fn write_derived(state: &mut MemoryState, objective: &Objective) -> RepoResult<()> {
    let stored = state
        .objectives
        .iter_mut()
        .find(|stored| stored.id == objective.id && stored.space_id == objective.space_id)
        .ok_or_else(|| RepoError::not_found("objective", objective.id))?;
    stored.current_value = objective.current_value;
    stored.status = objective.status;
    stored.updated_at = objective.updated_at;
    Ok(())
}
