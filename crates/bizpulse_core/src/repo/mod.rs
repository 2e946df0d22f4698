//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contracts used by services (`SpaceRepository`,
//!   `CrmRepository`, `ObjectiveRepository`).
//! - Provide two interchangeable backends: `SqliteStore` and `MemoryStore`.
//! - Publish a `ChangeEvent` for every successful write.
//!
//! # Invariants
//! - Write paths validate records before mutating storage.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Progress entry writes persist the derived objective value and status in
//!   the same atomic step as the entry itself.

use crate::config::{StorageBackend, StorageConfig};
use crate::db::DbError;
use crate::model::validation::ValidationError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod crm_repo;
pub mod events;
pub mod memory_store;
pub mod objective_repo;
pub mod space_repo;
pub mod sqlite_store;

pub use crm_repo::CrmRepository;
pub use events::{ChangeAction, ChangeEvent, ChangeNotifier, EntityKind};
pub use memory_store::MemoryStore;
pub use objective_repo::ObjectiveRepository;
pub use space_repo::SpaceRepository;
pub use sqlite_store::SqliteStore;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by both backends.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    Conflict { entity: &'static str, id: String },
    InvalidData(String),
    MissingRequiredTable(&'static str),
    /// A writer panicked while holding the in-memory state lock.
    StatePoisoned,
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict { entity, id } => write!(f, "{entity} already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::StatePoisoned => write!(f, "in-memory store state is poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Full persistence surface consumed by the services.
pub trait Store: SpaceRepository + CrmRepository + ObjectiveRepository {
    /// Channel that receives one event per successful write.
    fn notifier(&self) -> &ChangeNotifier;

    /// Short backend name for diagnostics.
    fn backend_name(&self) -> &'static str;
}

/// Opens the backend selected by `config`.
pub fn open_store(config: &StorageConfig) -> RepoResult<Box<dyn Store>> {
    let store: Box<dyn Store> = match config.backend {
        StorageBackend::Memory => Box::new(MemoryStore::new()),
        StorageBackend::Sqlite => match config.sqlite_path.as_ref() {
            Some(path) => Box::new(SqliteStore::open(path)?),
            None => Box::new(SqliteStore::open_in_memory()?),
        },
    };
    info!(
        "event=store_open module=repo status=ok backend={}",
        store.backend_name()
    );
    Ok(store)
}
