//! Core domain logic for BizPulse.
//! This crate is the single source of truth for objective, pipeline and
//! client invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rules;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError, LoggingConfig, StorageBackend, StorageConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::client::{Client, ClientId, ClientStatus, NpsCategory, NpsRecord};
pub use model::lead::{Lead, LeadId, LeadStatus, LeadTemperature};
pub use model::objective::{
    AutoMetricSource, Objective, ObjectiveId, ObjectiveStatus, ObjectiveUnit, ProgressEntry,
    ProgressEntryId,
};
pub use model::space::{Space, SpaceId};
pub use model::validation::ValidationError;
pub use repo::{
    open_store, ChangeAction, ChangeEvent, ChangeNotifier, CrmRepository, EntityKind,
    MemoryStore, ObjectiveRepository, RepoError, RepoResult, SpaceRepository, SqliteStore,
    Store,
};
pub use rules::alerts::{derive_alerts, Alert, AlertCategory, AlertKind, AlertSeverity};
pub use rules::auto_metric::resolve_auto_value;
pub use rules::status::classify;
pub use service::{
    AlertService, CrmService, LedgerUpdate, NewObjective, NewProgressEntry, ObjectiveDetail,
    ObjectivePatch, ObjectiveService, ServiceError, ServiceResult, SpacePatch, SpaceService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
