//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Stamp timestamps from an injected `Clock`.
//! - Run the status classifier and auto-metric resolver on every path that
//!   changes or displays an objective's derived state.

use crate::model::validation::ValidationError;
use crate::repo::{RepoError, SpaceRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod alert_service;
pub mod crm_service;
pub mod objective_service;
pub mod space_service;

pub use alert_service::AlertService;
pub use crm_service::CrmService;
pub use objective_service::{
    LedgerUpdate, NewObjective, NewProgressEntry, ObjectiveDetail, ObjectivePatch,
    ObjectiveService,
};
pub use space_service::{SpacePatch, SpaceService};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error shared by all use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before touching storage.
    Validation(ValidationError),
    /// Referenced record does not exist (or lives in another space).
    NotFound { entity: &'static str, id: String },
    /// Record with the same identity already exists.
    Conflict { entity: &'static str, id: String },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Refused: a workspace always keeps at least one space.
    LastSpace(String),
    /// Write succeeded but read-back disagrees.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict { entity, id } => write!(f, "{entity} already exists: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::LastSpace(id) => write!(f, "cannot delete the last space: {id}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict { entity, id } => Self::Conflict { entity, id },
            other => Self::Repo(other),
        }
    }
}

/// Fails with `NotFound` unless `space_id` exists.
pub(crate) fn require_space<R: SpaceRepository + ?Sized>(
    repo: &R,
    space_id: &str,
) -> ServiceResult<()> {
    match repo.get_space(space_id)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::not_found("space", space_id)),
    }
}
