use async_trait::async_trait;

use super::import_model::{
    Checkpoint, ImportPhase, ImportSummary, SyncLog, SyncLogStatus, SyncStatus, SyncType,
};
use crate::entities::RawEntity;
use crate::errors::Result;

/// Upstream entity feed, one page at a time. Concrete fetch/parse logic
/// lives behind this seam (HTTP provider in production, fakes in tests).
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Returns the next batch of entities for `phase`, ordered by id,
    /// starting strictly after `after_id`. An empty (or short) batch means
    /// the phase's stream is exhausted.
    async fn fetch_batch(
        &self,
        phase: ImportPhase,
        after_id: Option<&str>,
        batch_size: usize,
    ) -> Result<Vec<RawEntity>>;

    /// Best-effort total count for `phase`, used only for progress
    /// estimation. Sources that cannot answer return `None`.
    async fn estimated_total(&self, phase: ImportPhase) -> Result<Option<u64>> {
        let _ = phase;
        Ok(None)
    }
}

/// Local persistence for imported entities, plus the read side used by the
/// verification sampler.
pub trait EntityStore: Send + Sync {
    fn persist(&self, entity: &RawEntity) -> Result<()>;
    fn count(&self, entity_type: ImportPhase) -> Result<i64>;
    fn list_ids(&self, entity_type: ImportPhase) -> Result<Vec<String>>;
    fn get(&self, entity_type: ImportPhase, id: &str) -> Result<Option<RawEntity>>;
}

/// Durable single-checkpoint store. `save` must land the checkpoint and the
/// sync-status progress update together or not at all.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<Option<Checkpoint>>;
    fn save(&self, checkpoint: &Checkpoint, current_operation: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Sync status singleton and append-only run log.
pub trait SyncStateStore: Send + Sync {
    /// Atomically checks that no import is running, flips `is_running` and
    /// opens a new run log. Fails with `ImportError::AlreadyRunning` when
    /// the gate is already held.
    fn try_begin_run(&self, sync_type: SyncType) -> Result<SyncLog>;

    fn get_status(&self) -> Result<SyncStatus>;

    /// Flips the status to not-running with a "paused" operation string,
    /// leaving the checkpoint untouched.
    fn mark_paused(&self) -> Result<()>;

    /// Closes the run log and clears `is_running`. On success paths the
    /// last-sync timestamp is refreshed; on failure paths `last_error` is
    /// recorded instead.
    fn finish_run(
        &self,
        log_id: &str,
        status: SyncLogStatus,
        records_processed: i32,
        errors: &[String],
        last_error: Option<&str>,
    ) -> Result<()>;

    /// Most recent run logs, newest first.
    fn get_recent_logs(&self, limit: i64) -> Result<Vec<SyncLog>>;
}

/// Lifecycle surface exposed to the HTTP layer.
#[async_trait]
pub trait ImportServiceTrait: Send + Sync {
    /// Runs the import to completion (or pause/stop), resuming from a
    /// checkpoint when one exists.
    async fn start(&self, sync_type: SyncType) -> Result<ImportSummary>;

    /// Requests a cooperative pause; takes effect between batches. Pausing
    /// an idle orchestrator is a no-op.
    fn pause(&self);

    /// Re-enters the checkpoint-aware start path.
    async fn resume(&self) -> Result<ImportSummary>;

    /// Requests a cooperative stop; the checkpoint is preserved.
    fn stop(&self);

    fn get_status(&self) -> Result<SyncStatus>;

    fn load_checkpoint(&self) -> Result<Option<Checkpoint>>;
}
