//! Import orchestrator: drives the phase state machine, owns the run
//! lifecycle and decides when to checkpoint.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::entities::RawEntity;
use crate::errors::Result;
use crate::notifications::{AdminAlert, NotificationServiceTrait, NotificationType};

use super::import_errors::ImportError;
use super::import_model::{
    compute_progress, Checkpoint, ImportPhase, ImportSummary, RunOutcome, SyncConfig, SyncLogStatus,
    SyncStatus, SyncType,
};
use super::import_traits::{
    CheckpointStore, EntitySource, EntityStore, ImportServiceTrait, SyncStateStore,
};

// Errors recorded per run are capped; past this point they repeat anyway.
const MAX_RUN_ERRORS: usize = 100;

/// Cooperative cancellation flags, checked between batches.
#[derive(Debug, Default)]
pub struct ImportControl {
    pause_requested: AtomicBool,
    stop_requested: AtomicBool,
}

impl ImportControl {
    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
        self.stop_requested.store(false, Ordering::SeqCst);
    }
}

/// In-memory run state, mirrored to the checkpoint store after every batch.
struct RunState {
    phase: ImportPhase,
    current_batch: i32,
    last_processed_id: Option<String>,
    processed_ids: HashSet<String>,
    progress: i32,
    records_processed: i32,
    consecutive_failures: u32,
    errors: Vec<String>,
}

impl RunState {
    fn fresh() -> Self {
        RunState {
            phase: ImportPhase::Clubs,
            current_batch: 0,
            last_processed_id: None,
            processed_ids: HashSet::new(),
            progress: 0,
            records_processed: 0,
            consecutive_failures: 0,
            errors: Vec::new(),
        }
    }

    fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        RunState {
            phase: checkpoint.current_phase,
            current_batch: checkpoint.current_batch,
            last_processed_id: checkpoint.last_processed_id,
            processed_ids: checkpoint.processed_ids,
            progress: checkpoint.progress,
            records_processed: 0,
            consecutive_failures: 0,
            errors: Vec::new(),
        }
    }

    fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current_phase: self.phase,
            current_batch: self.current_batch,
            last_processed_id: self.last_processed_id.clone(),
            processed_ids: self.processed_ids.clone(),
            progress: self.progress,
            last_updated: chrono::Utc::now(),
        }
    }

    /// Per-phase bookkeeping is reset when the phase advances; the dedup
    /// set only covers the current phase.
    fn advance_phase(&mut self, next: ImportPhase) {
        self.phase = next;
        self.current_batch = 0;
        self.last_processed_id = None;
        self.processed_ids.clear();
    }

    fn record_error(&mut self, message: String) {
        if self.errors.len() < MAX_RUN_ERRORS {
            self.errors.push(message);
        }
    }
}

pub struct ImportService {
    checkpoint_store: Arc<dyn CheckpointStore>,
    sync_state: Arc<dyn SyncStateStore>,
    source: Arc<dyn EntitySource>,
    store: Arc<dyn EntityStore>,
    alerts: Arc<dyn NotificationServiceTrait>,
    config: SyncConfig,
    control: Arc<ImportControl>,
}

impl ImportService {
    pub fn new(
        checkpoint_store: Arc<dyn CheckpointStore>,
        sync_state: Arc<dyn SyncStateStore>,
        source: Arc<dyn EntitySource>,
        store: Arc<dyn EntityStore>,
        alerts: Arc<dyn NotificationServiceTrait>,
        config: SyncConfig,
    ) -> Self {
        ImportService {
            checkpoint_store,
            sync_state,
            source,
            store,
            alerts,
            config,
            control: Arc::new(ImportControl::default()),
        }
    }

    pub fn control(&self) -> Arc<ImportControl> {
        Arc::clone(&self.control)
    }

    /// Deletes the checkpoint and closes the run log on success; preserves
    /// the checkpoint on failure so the next `start()` resumes from it.
    fn complete(
        &self,
        log_id: &str,
        success: bool,
        state: &RunState,
        last_error: Option<&str>,
    ) -> Result<()> {
        if success {
            self.checkpoint_store.clear()?;
            self.sync_state.finish_run(
                log_id,
                SyncLogStatus::Completed,
                state.records_processed,
                &state.errors,
                None,
            )
        } else {
            self.sync_state.finish_run(
                log_id,
                SyncLogStatus::Failed,
                state.records_processed,
                &state.errors,
                last_error,
            )
        }
    }

    async fn run_phases(&self, state: &mut RunState) -> Result<RunOutcome> {
        loop {
            info!("Importing phase {}", state.phase);
            let total_hint = self
                .source
                .estimated_total(state.phase)
                .await
                .unwrap_or(None);

            loop {
                if self.control.stop_requested() {
                    info!("Stop requested, leaving checkpoint in place");
                    return Ok(RunOutcome::Stopped);
                }
                if self.control.pause_requested() {
                    info!("Pause requested, leaving checkpoint in place");
                    return Ok(RunOutcome::Paused);
                }

                let batch = self.fetch_with_retry(state).await?;
                if batch.is_empty() {
                    break;
                }
                let exhausted = batch.len() < self.config.batch_size;

                self.apply_batch(state, batch)?;
                state.current_batch += 1;
                state.progress =
                    compute_progress(state.phase, state.processed_ids.len() as u64, total_hint);

                let operation =
                    format!("Importing {} (batch {})", state.phase, state.current_batch);
                // A checkpoint write failure is fatal for this batch:
                // continuing would desynchronize in-memory progress from
                // durable state.
                self.checkpoint_store
                    .save(&state.to_checkpoint(), &operation)?;

                if exhausted {
                    break;
                }
            }

            match state.phase.next() {
                Some(next) => {
                    debug!("Phase {} exhausted, advancing to {}", state.phase, next);
                    state.advance_phase(next);
                    let operation = format!("Importing {}", state.phase);
                    self.checkpoint_store
                        .save(&state.to_checkpoint(), &operation)?;
                }
                None => return Ok(RunOutcome::Completed),
            }
        }
    }

    async fn fetch_with_retry(&self, state: &mut RunState) -> Result<Vec<RawEntity>> {
        let mut attempt: u32 = 0;
        loop {
            match self
                .source
                .fetch_batch(
                    state.phase,
                    state.last_processed_id.as_deref(),
                    self.config.batch_size,
                )
                .await
            {
                Ok(batch) => return Ok(batch),
                Err(e) => {
                    attempt += 1;
                    warn!(
                        "Fetch failed for {} (attempt {}/{}): {}",
                        state.phase, attempt, self.config.max_consecutive_failures, e
                    );
                    state.record_error(format!("fetch {}: {}", state.phase, e));
                    if attempt >= self.config.max_consecutive_failures {
                        return Err(ImportError::TooManyFailures {
                            failures: attempt,
                            last_error: e.to_string(),
                        }
                        .into());
                    }
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
            }
        }
    }

    fn apply_batch(&self, state: &mut RunState, batch: Vec<RawEntity>) -> Result<()> {
        for entity in batch {
            if state.processed_ids.contains(&entity.id) {
                debug!("Skipping already-processed {} {}", entity.entity_type, entity.id);
                state.last_processed_id = Some(entity.id);
                continue;
            }

            match self.store.persist(&entity) {
                Ok(()) => {
                    state.consecutive_failures = 0;
                    state.records_processed += 1;
                    state.processed_ids.insert(entity.id.clone());
                    state.last_processed_id = Some(entity.id);
                }
                Err(e) => {
                    warn!("Failed to persist {} {}: {}", entity.entity_type, entity.id, e);
                    state.record_error(format!("persist {} {}: {}", entity.entity_type, entity.id, e));
                    state.consecutive_failures += 1;
                    if state.consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(ImportError::TooManyFailures {
                            failures: state.consecutive_failures,
                            last_error: e.to_string(),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch_failure_alert(&self, log_id: &str, message: &str) {
        let alert = AdminAlert {
            notification_type: NotificationType::SyncFailure,
            title: "Federation import failed".to_string(),
            message: message.to_string(),
            details: Some(serde_json::json!({ "syncLogId": log_id })),
        };
        // Alert delivery is best-effort; a failed dispatch never masks the
        // import failure itself.
        if let Err(e) = self.alerts.send_admin_alerts(alert, Some(log_id)).await {
            error!("Failed to dispatch sync failure alert: {}", e);
        }
    }
}

#[async_trait]
impl ImportServiceTrait for ImportService {
    async fn start(&self, sync_type: SyncType) -> Result<ImportSummary> {
        let log = self.sync_state.try_begin_run(sync_type)?;
        self.control.reset();

        let mut state = match self.checkpoint_store.load()? {
            Some(checkpoint) => {
                info!(
                    "Resuming import at {} batch {} ({} ids already processed)",
                    checkpoint.current_phase,
                    checkpoint.current_batch,
                    checkpoint.processed_ids.len()
                );
                RunState::from_checkpoint(checkpoint)
            }
            None => {
                info!("Starting fresh import ({})", sync_type.as_str());
                RunState::fresh()
            }
        };

        match self.run_phases(&mut state).await {
            Ok(RunOutcome::Completed) => {
                self.complete(&log.id, true, &state, None)?;
                info!(
                    "Import completed, {} records processed",
                    state.records_processed
                );
                Ok(ImportSummary {
                    log_id: log.id,
                    outcome: RunOutcome::Completed,
                    records_processed: state.records_processed,
                    errors: state.errors,
                })
            }
            Ok(RunOutcome::Paused) => {
                self.sync_state.finish_run(
                    &log.id,
                    SyncLogStatus::Stopped,
                    state.records_processed,
                    &state.errors,
                    None,
                )?;
                self.sync_state.mark_paused()?;
                Ok(ImportSummary {
                    log_id: log.id,
                    outcome: RunOutcome::Paused,
                    records_processed: state.records_processed,
                    errors: state.errors,
                })
            }
            Ok(RunOutcome::Stopped) => {
                self.sync_state.finish_run(
                    &log.id,
                    SyncLogStatus::Stopped,
                    state.records_processed,
                    &state.errors,
                    None,
                )?;
                Ok(ImportSummary {
                    log_id: log.id,
                    outcome: RunOutcome::Stopped,
                    records_processed: state.records_processed,
                    errors: state.errors,
                })
            }
            Err(e) => {
                let message = e.to_string();
                error!("Import failed: {}", message);
                if let Err(close_err) = self.complete(&log.id, false, &state, Some(&message)) {
                    error!("Failed to record import failure: {}", close_err);
                }
                self.dispatch_failure_alert(&log.id, &message).await;
                Err(e)
            }
        }
    }

    fn pause(&self) {
        self.control.request_pause();
    }

    async fn resume(&self) -> Result<ImportSummary> {
        let sync_type = self
            .sync_state
            .get_status()?
            .last_sync_type
            .unwrap_or(SyncType::Full);
        self.start(sync_type).await
    }

    fn stop(&self) {
        self.control.request_stop();
    }

    fn get_status(&self) -> Result<SyncStatus> {
        self.sync_state.get_status()
    }

    fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        self.checkpoint_store.load()
    }
}
