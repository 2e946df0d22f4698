//! Objective and progress ledger use-cases.
//!
//! # Responsibility
//! - Create, edit, list and delete objectives within a space.
//! - Record and remove progress entries, returning the freshly classified
//!   objective every time.
//! - Refresh auto-linked objectives from live CRM data whenever they are read.
//!
//! # Invariants
//! - Every ledger mutation persists the entry change together with the new
//!   `current_value`/`status`.
//! - The CRM snapshot is fetched per call and never cached.
//! - Reads never change a `paused` status; writes that touch derived state
//!   reclassify it.

use crate::clock::{Clock, SystemClock};
use crate::model::objective::{
    AutoMetricSource, Objective, ObjectiveId, ObjectiveStatus, ObjectiveUnit, ProgressEntry,
    ProgressEntryId,
};
use crate::model::space::SpaceId;
use crate::repo::{CrmRepository, ObjectiveRepository, SpaceRepository};
use crate::rules::auto_metric::CrmSnapshot;
use crate::rules::ledger::{derive_progress, monthly_totals, sort_newest_first, MonthTotal};
use crate::rules::stats::{objective_stats, ObjectiveStats};
use crate::rules::status::{classify, progress_percent};
use crate::service::{require_space, ServiceError, ServiceResult};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

/// Input for a new objective. `current_value` and `status` are derived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewObjective {
    pub space_id: SpaceId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: ObjectiveUnit,
    pub target_value: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_commercial: bool,
    pub auto_source: AutoMetricSource,
    pub created_by: Option<String>,
}

impl NewObjective {
    pub fn new(space_id: impl Into<SpaceId>, title: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial edit. `None` leaves a field untouched; `Some(None)` clears an
/// optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectivePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub unit: Option<ObjectiveUnit>,
    pub target_value: Option<Option<f64>>,
    pub current_value: Option<f64>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    /// Honored only when no value, target or deadline change forces a
    /// reclassification.
    pub status: Option<ObjectiveStatus>,
    pub is_commercial: Option<bool>,
    pub auto_source: Option<AutoMetricSource>,
}

impl ObjectivePatch {
    fn changes_auto_link(&self) -> bool {
        self.is_commercial.is_some() || self.auto_source.is_some()
    }

    fn changes_derived_state(&self) -> bool {
        self.current_value.is_some()
            || self.target_value.is_some()
            || self.end_date.is_some()
            || self.changes_auto_link()
    }

    fn apply_to(self, objective: &mut Objective) {
        if let Some(title) = self.title {
            objective.title = title;
        }
        if let Some(description) = self.description {
            objective.description = description;
        }
        if let Some(category) = self.category {
            objective.category = category;
        }
        if let Some(unit) = self.unit {
            objective.unit = unit;
        }
        if let Some(target_value) = self.target_value {
            objective.target_value = target_value;
        }
        if let Some(current_value) = self.current_value {
            objective.current_value = current_value;
        }
        if let Some(start_date) = self.start_date {
            objective.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            objective.end_date = end_date;
        }
        if let Some(status) = self.status {
            objective.status = status;
        }
        if let Some(is_commercial) = self.is_commercial {
            objective.is_commercial = is_commercial;
        }
        if let Some(auto_source) = self.auto_source {
            objective.auto_source = auto_source;
        }
    }
}

/// Input for one ledger entry. `logged_at` defaults to the service clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProgressEntry {
    pub value: f64,
    pub note: Option<String>,
    pub logged_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl NewProgressEntry {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }
}

/// Objective with its ledger, newest entry first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveDetail {
    pub objective: Objective,
    pub entries: Vec<ProgressEntry>,
    pub progress_percent: i64,
}

/// Result of a successful `add_entry`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerUpdate {
    pub entry: ProgressEntry,
    pub detail: ObjectiveDetail,
}

pub struct ObjectiveService<'a, R>
where
    R: ObjectiveRepository + CrmRepository + SpaceRepository + ?Sized,
{
    repo: &'a R,
    clock: Box<dyn Clock>,
}

impl<'a, R> ObjectiveService<'a, R>
where
    R: ObjectiveRepository + CrmRepository + SpaceRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self::with_clock(repo, Box::new(SystemClock))
    }

    pub fn with_clock(repo: &'a R, clock: Box<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Creates an objective with its initial value and status already
    /// derived. Auto-linked objectives start from the resolver value.
    pub fn create_objective(&self, input: NewObjective) -> ServiceResult<ObjectiveDetail> {
        require_space(self.repo, &input.space_id)?;
        let now = self.clock.now();

        let mut objective = Objective::new(input.space_id, input.title, now);
        objective.description = input.description;
        objective.category = input.category;
        objective.unit = input.unit;
        objective.target_value = input.target_value;
        objective.start_date = input.start_date;
        objective.end_date = input.end_date;
        objective.is_commercial = input.is_commercial;
        objective.auto_source = input.auto_source;
        objective.created_by = input.created_by;

        let snapshot = self.snapshot_for(&objective)?;
        derive_progress(&objective, &[], snapshot.as_ref(), now).apply_to(&mut objective);
        objective.validate()?;

        let id = self.repo.create_objective(&objective)?;
        info!(
            "event=objective_create module=service status=ok space={} objective={} derived_status={} auto_source={}",
            objective.space_id,
            id,
            objective.status.as_str(),
            objective.auto_source.as_str()
        );
        self.get_objective(id)
    }

    /// Loads one objective with its ledger. Auto-linked objectives are
    /// refreshed from the CRM first.
    pub fn get_objective(&self, id: ObjectiveId) -> ServiceResult<ObjectiveDetail> {
        let mut objective = self.load(id)?;
        let entries = self.repo.list_progress_entries(id)?;
        if objective.is_auto_linked() {
            let snapshot = self.snapshot(&objective.space_id)?;
            self.refresh(&mut objective, &entries, &snapshot)?;
        }
        Ok(detail(objective, entries))
    }

    /// Objectives of one space, oldest first, auto-linked ones refreshed.
    pub fn list_objectives(&self, space_id: &str) -> ServiceResult<Vec<Objective>> {
        require_space(self.repo, space_id)?;
        let mut objectives = self.repo.list_objectives(space_id)?;

        if objectives.iter().any(Objective::is_auto_linked) {
            let snapshot = self.snapshot(space_id)?;
            // Auto-linked values come from the snapshot alone; the ledger is
            // not read.
            for objective in objectives.iter_mut().filter(|o| o.is_auto_linked()) {
                self.refresh(objective, &[], &snapshot)?;
            }
        }
        Ok(objectives)
    }

    /// Applies `patch`. Changing the value, target, deadline or auto link
    /// re-derives the status (and the value, for auto-linked objectives).
    pub fn update_objective(
        &self,
        id: ObjectiveId,
        patch: ObjectivePatch,
    ) -> ServiceResult<ObjectiveDetail> {
        let mut objective = self.load(id)?;
        let now = self.clock.now();
        let rederive_value = patch.changes_auto_link();
        let reclassify = patch.changes_derived_state();
        patch.apply_to(&mut objective);

        if reclassify {
            if rederive_value || objective.is_auto_linked() {
                let entries = self.repo.list_progress_entries(id)?;
                let snapshot = self.snapshot_for(&objective)?;
                derive_progress(&objective, &entries, snapshot.as_ref(), now)
                    .apply_to(&mut objective);
            } else {
                objective.status = classify(
                    objective.current_value,
                    objective.target_value,
                    objective.end_date,
                    now,
                );
            }
        }
        objective.updated_at = now;
        objective.validate()?;

        self.repo.update_objective(&objective)?;
        info!(
            "event=objective_update module=service status=ok objective={} reclassified={} derived_status={}",
            id,
            reclassify,
            objective.status.as_str()
        );
        self.get_objective(id)
    }

    /// Deletes an objective and its ledger.
    pub fn delete_objective(&self, id: ObjectiveId) -> ServiceResult<()> {
        self.repo.delete_objective(id)?;
        info!(
            "event=objective_delete module=service status=ok objective={}",
            id
        );
        Ok(())
    }

    /// Appends one entry and stores the recomputed value and status with it.
    ///
    /// For auto-linked objectives the entry is kept as an annotation and the
    /// value still comes from the resolver.
    pub fn add_entry(
        &self,
        objective_id: ObjectiveId,
        input: NewProgressEntry,
    ) -> ServiceResult<LedgerUpdate> {
        let mut objective = self.load(objective_id)?;
        let now = self.clock.now();

        let entry = ProgressEntry {
            id: Uuid::new_v4(),
            objective_id,
            value: input.value,
            note: input.note,
            logged_at: input.logged_at.unwrap_or(now),
            created_by: input.created_by,
        };
        entry.validate()?;

        let mut entries = self.repo.list_progress_entries(objective_id)?;
        entries.push(entry.clone());
        let snapshot = self.snapshot_for(&objective)?;
        derive_progress(&objective, &entries, snapshot.as_ref(), now).apply_to(&mut objective);
        objective.updated_at = now;

        self.repo.insert_progress_entry(&entry, &objective)?;
        info!(
            "event=progress_add module=service status=ok objective={} entry={} derived_status={}",
            objective_id,
            entry.id,
            objective.status.as_str()
        );

        let detail = self.get_objective(objective_id)?;
        let entry = detail
            .entries
            .iter()
            .find(|stored| stored.id == entry.id)
            .cloned()
            .ok_or(ServiceError::InconsistentState(
                "added progress entry not found in read-back",
            ))?;
        Ok(LedgerUpdate { entry, detail })
    }

    /// Removes one entry and stores the recomputed value and status.
    pub fn remove_entry(
        &self,
        objective_id: ObjectiveId,
        entry_id: ProgressEntryId,
    ) -> ServiceResult<ObjectiveDetail> {
        let mut objective = self.load(objective_id)?;
        let now = self.clock.now();

        let mut entries = self.repo.list_progress_entries(objective_id)?;
        let before = entries.len();
        entries.retain(|entry| entry.id != entry_id);
        if entries.len() == before {
            return Err(ServiceError::not_found("progress entry", entry_id));
        }

        let snapshot = self.snapshot_for(&objective)?;
        derive_progress(&objective, &entries, snapshot.as_ref(), now).apply_to(&mut objective);
        objective.updated_at = now;

        self.repo.delete_progress_entry(entry_id, &objective)?;
        info!(
            "event=progress_remove module=service status=ok objective={} entry={} derived_status={}",
            objective_id,
            entry_id,
            objective.status.as_str()
        );
        self.get_objective(objective_id)
    }

    /// Status counts over the space's refreshed objectives.
    pub fn objective_stats(&self, space_id: &str) -> ServiceResult<ObjectiveStats> {
        Ok(objective_stats(&self.list_objectives(space_id)?))
    }

    /// Ledger sums per calendar month of `year`.
    pub fn monthly_progress(
        &self,
        objective_id: ObjectiveId,
        year: i32,
    ) -> ServiceResult<[MonthTotal; 12]> {
        self.load(objective_id)?;
        let entries = self.repo.list_progress_entries(objective_id)?;
        Ok(monthly_totals(&entries, year))
    }

    fn load(&self, id: ObjectiveId) -> ServiceResult<Objective> {
        self.repo
            .get_objective(id)?
            .ok_or_else(|| ServiceError::not_found("objective", id))
    }

    fn snapshot(&self, space_id: &str) -> ServiceResult<CrmSnapshot> {
        Ok(CrmSnapshot {
            leads: self.repo.list_leads(space_id)?,
            clients: self.repo.list_clients(space_id)?,
        })
    }

    fn snapshot_for(&self, objective: &Objective) -> ServiceResult<Option<CrmSnapshot>> {
        if objective.is_auto_linked() {
            self.snapshot(&objective.space_id).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Re-resolves an auto-linked objective and persists the result when it
    /// moved. A paused objective keeps its status.
    fn refresh(
        &self,
        objective: &mut Objective,
        entries: &[ProgressEntry],
        snapshot: &CrmSnapshot,
    ) -> ServiceResult<()> {
        let now = self.clock.now();
        let derived = derive_progress(objective, entries, Some(snapshot), now);
        let status = if objective.status == ObjectiveStatus::Paused {
            ObjectiveStatus::Paused
        } else {
            derived.status
        };
        if derived.current_value == objective.current_value && status == objective.status {
            return Ok(());
        }

        debug!(
            "event=objective_refresh module=service status=ok objective={} from={} to={}",
            objective.id, objective.current_value, derived.current_value
        );
        objective.current_value = derived.current_value;
        objective.status = status;
        objective.updated_at = now;
        self.repo.update_objective(objective)?;
        Ok(())
    }
}

fn detail(objective: Objective, mut entries: Vec<ProgressEntry>) -> ObjectiveDetail {
    sort_newest_first(&mut entries);
    ObjectiveDetail {
        progress_percent: progress_percent(objective.current_value, objective.target_value),
        objective,
        entries,
    }
}
