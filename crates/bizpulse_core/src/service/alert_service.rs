//! Dashboard alert use-case.

use crate::clock::{Clock, FixedClock, SystemClock};
use crate::repo::{CrmRepository, ObjectiveRepository, SpaceRepository};
use crate::rules::alerts::{derive_alerts, Alert};
use crate::service::{require_space, ObjectiveService, ServiceResult};
use log::info;

pub struct AlertService<'a, R>
where
    R: ObjectiveRepository + CrmRepository + SpaceRepository + ?Sized,
{
    repo: &'a R,
    clock: Box<dyn Clock>,
}

impl<'a, R> AlertService<'a, R>
where
    R: ObjectiveRepository + CrmRepository + SpaceRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self::with_clock(repo, Box::new(SystemClock))
    }

    pub fn with_clock(repo: &'a R, clock: Box<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Current alerts of one space. Auto-linked objectives are refreshed
    /// against the same instant the alerts are evaluated at.
    pub fn space_alerts(&self, space_id: &str) -> ServiceResult<Vec<Alert>> {
        require_space(self.repo, space_id)?;
        let now = self.clock.now();

        let objectives = ObjectiveService::with_clock(self.repo, Box::new(FixedClock(now)))
            .list_objectives(space_id)?;
        let leads = self.repo.list_leads(space_id)?;
        let clients = self.repo.list_clients(space_id)?;
        let nps_records = self.repo.list_space_nps_records(space_id)?;

        let alerts = derive_alerts(&leads, &clients, &nps_records, &objectives, now);
        info!(
            "event=alerts_derive module=service status=ok space={} alerts={}",
            space_id,
            alerts.len()
        );
        Ok(alerts)
    }
}
