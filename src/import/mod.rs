pub(crate) mod checkpoint_repository;
pub(crate) mod import_errors;
pub(crate) mod import_model;
pub(crate) mod import_service;
pub(crate) mod import_traits;
pub(crate) mod sync_state_repository;


pub use checkpoint_repository::CheckpointRepository;
pub use import_errors::ImportError;
pub use import_model::{
    compute_progress, Checkpoint, ImportPhase, ImportSummary, RunOutcome, SyncConfig, SyncLog,
    SyncLogStatus, SyncStatus, SyncType,
};
pub use import_service::{ImportControl, ImportService};
pub use import_traits::{
    CheckpointStore, EntitySource, EntityStore, ImportServiceTrait, SyncStateStore,
};
pub use sync_state_repository::SyncStateRepository;
