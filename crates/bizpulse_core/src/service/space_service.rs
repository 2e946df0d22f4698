//! Space (tenant) use-cases.

use crate::clock::{Clock, SystemClock};
use crate::model::space::Space;
use crate::repo::SpaceRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;

/// Partial edit of a space. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct SpacePatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

pub struct SpaceService<'a, R: SpaceRepository + ?Sized> {
    repo: &'a R,
    clock: Box<dyn Clock>,
}

impl<'a, R: SpaceRepository + ?Sized> SpaceService<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self::with_clock(repo, Box::new(SystemClock))
    }

    pub fn with_clock(repo: &'a R, clock: Box<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Creates a space whose id is the slug of `label`.
    ///
    /// Two labels that slug to the same id conflict.
    pub fn create_space(&self, label: &str, description: &str) -> ServiceResult<Space> {
        let space = Space::new(label, description, self.clock.now());
        space.validate()?;
        self.repo.create_space(&space)?;
        info!(
            "event=space_create module=service status=ok space={}",
            space.id
        );

        self.repo
            .get_space(&space.id)?
            .ok_or(ServiceError::InconsistentState(
                "created space not found in read-back",
            ))
    }

    pub fn get_space(&self, id: &str) -> ServiceResult<Space> {
        self.repo
            .get_space(id)?
            .ok_or_else(|| ServiceError::not_found("space", id))
    }

    pub fn list_spaces(&self) -> ServiceResult<Vec<Space>> {
        Ok(self.repo.list_spaces()?)
    }

    /// Applies `patch`; the id stays the slug the space was created with.
    ///
    /// A blank description falls back to `Space <label>`.
    pub fn update_space(&self, id: &str, patch: SpacePatch) -> ServiceResult<Space> {
        let mut space = self.get_space(id)?;
        if let Some(label) = patch.label {
            space.label = label.trim().to_string();
        }
        if let Some(description) = patch.description {
            space.description = description.trim().to_string();
        }
        if space.description.is_empty() {
            space.description = format!("Space {}", space.label);
        }
        if let Some(color) = patch.color {
            space.color = color.trim().to_string();
        }
        space.validate()?;
        self.repo.update_space(&space)?;
        info!(
            "event=space_update module=service status=ok space={}",
            space.id
        );
        self.get_space(id)
    }

    /// Deletes a space and everything scoped to it. The last space is kept.
    pub fn delete_space(&self, id: &str) -> ServiceResult<()> {
        self.get_space(id)?;
        if self.repo.list_spaces()?.len() <= 1 {
            return Err(ServiceError::LastSpace(id.to_string()));
        }
        self.repo.delete_space(id)?;
        info!("event=space_delete module=service status=ok space={id}");
        Ok(())
    }
}
