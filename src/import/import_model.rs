//! Import pipeline domain models: phases, checkpoint, status and run log.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_RETRY_BACKOFF_MS,
};
use crate::errors::{Error, Result, ValidationError};

/// One ordered stage of the import pipeline. Phases are strictly sequential
/// by data dependency (games reference players and tournaments that must
/// already exist), so there is no branching and no backward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Clubs,
    Players,
    PlayerYearStats,
    Tournaments,
    PlayerTournamentHistory,
    Games,
    Statistics,
}

impl ImportPhase {
    /// All phases in execution order.
    pub const ALL: [ImportPhase; 7] = [
        ImportPhase::Clubs,
        ImportPhase::Players,
        ImportPhase::PlayerYearStats,
        ImportPhase::Tournaments,
        ImportPhase::PlayerTournamentHistory,
        ImportPhase::Games,
        ImportPhase::Statistics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImportPhase::Clubs => "CLUBS",
            ImportPhase::Players => "PLAYERS",
            ImportPhase::PlayerYearStats => "PLAYER_YEAR_STATS",
            ImportPhase::Tournaments => "TOURNAMENTS",
            ImportPhase::PlayerTournamentHistory => "PLAYER_TOURNAMENT_HISTORY",
            ImportPhase::Games => "GAMES",
            ImportPhase::Statistics => "STATISTICS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    /// Zero-based position in the execution order.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    /// The phase after this one, or `None` when this is the last phase.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncType {
    Full,
    Incremental,
}

impl SyncType {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncType::Full => "FULL",
            SyncType::Incremental => "INCREMENTAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FULL" => Some(SyncType::Full),
            "INCREMENTAL" => Some(SyncType::Incremental),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncLogStatus {
    /// In progress
    #[default]
    Running,
    /// Finished all phases
    Completed,
    /// Aborted by an error
    Failed,
    /// Stopped or paused by the operator
    Stopped,
}

impl SyncLogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncLogStatus::Running => "RUNNING",
            SyncLogStatus::Completed => "COMPLETED",
            SyncLogStatus::Failed => "FAILED",
            SyncLogStatus::Stopped => "STOPPED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(SyncLogStatus::Running),
            "COMPLETED" => Some(SyncLogStatus::Completed),
            "FAILED" => Some(SyncLogStatus::Failed),
            "STOPPED" => Some(SyncLogStatus::Stopped),
            _ => None,
        }
    }
}

/// Durable record of where an import currently is. At most one checkpoint
/// exists at a time; its presence signals an interrupted or in-progress
/// import. Owned exclusively by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub current_phase: ImportPhase,
    pub current_batch: i32,
    pub last_processed_id: Option<String>,
    /// Identifiers already persisted in the current phase, consulted on
    /// resume so re-requested batches are applied idempotently.
    pub processed_ids: HashSet<String>,
    pub progress: i32,
    pub last_updated: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(phase: ImportPhase) -> Self {
        Checkpoint {
            current_phase: phase,
            current_batch: 0,
            last_processed_id: None,
            processed_ids: HashSet::new(),
            progress: 0,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_checkpoint)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CheckpointDB {
    pub id: String,
    pub current_phase: String,
    pub current_batch: i32,
    pub last_processed_id: Option<String>,
    pub processed_ids: String,
    pub progress: i32,
    pub last_updated: String,
}

impl Checkpoint {
    pub(crate) fn to_row(&self, row_id: &str) -> Result<CheckpointDB> {
        let ids: Vec<&String> = self.processed_ids.iter().collect();
        Ok(CheckpointDB {
            id: row_id.to_string(),
            current_phase: self.current_phase.as_str().to_string(),
            current_batch: self.current_batch,
            last_processed_id: self.last_processed_id.clone(),
            processed_ids: serde_json::to_string(&ids)?,
            progress: self.progress,
            last_updated: self.last_updated.to_rfc3339(),
        })
    }

    pub(crate) fn from_row(row: CheckpointDB) -> Result<Checkpoint> {
        let phase = ImportPhase::from_str(&row.current_phase).ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "unknown import phase '{}'",
                row.current_phase
            )))
        })?;
        let processed_ids: HashSet<String> = serde_json::from_str(&row.processed_ids)?;
        let last_updated = DateTime::parse_from_rfc3339(&row.last_updated)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Checkpoint {
            current_phase: phase,
            current_batch: row.current_batch,
            last_processed_id: row.last_processed_id,
            processed_ids,
            progress: row.progress,
            last_updated,
        })
    }
}

/// Singleton "is an import running right now" record. Acts as the
/// system-wide mutual-exclusion gate for `start()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_running: bool,
    pub progress: i32,
    pub current_operation: Option<String>,
    pub last_error: Option<String>,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_sync_type: Option<SyncType>,
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_status)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncStatusDB {
    pub id: String,
    pub is_running: bool,
    pub progress: i32,
    pub current_operation: Option<String>,
    pub last_error: Option<String>,
    pub last_sync_time: Option<String>,
    pub last_sync_type: Option<String>,
    pub updated_at: String,
}

impl SyncStatus {
    pub(crate) fn to_row(&self, row_id: &str) -> SyncStatusDB {
        SyncStatusDB {
            id: row_id.to_string(),
            is_running: self.is_running,
            progress: self.progress,
            current_operation: self.current_operation.clone(),
            last_error: self.last_error.clone(),
            last_sync_time: self.last_sync_time.map(|t| t.to_rfc3339()),
            last_sync_type: self.last_sync_type.map(|t| t.as_str().to_string()),
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

impl From<SyncStatusDB> for SyncStatus {
    fn from(row: SyncStatusDB) -> Self {
        SyncStatus {
            is_running: row.is_running,
            progress: row.progress,
            current_operation: row.current_operation,
            last_error: row.last_error,
            last_sync_time: row.last_sync_time.and_then(|t| {
                DateTime::parse_from_rfc3339(&t)
                    .map(|t| t.with_timezone(&Utc))
                    .ok()
            }),
            last_sync_type: row.last_sync_type.as_deref().and_then(SyncType::from_str),
        }
    }
}

/// Append-only audit record for one run. Created at start, closed once at
/// completion; never read back by the orchestration logic itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub id: String,
    pub sync_type: SyncType,
    pub status: SyncLogStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub errors: Vec<String>,
}

impl SyncLog {
    pub fn new(sync_type: SyncType) -> Self {
        SyncLog {
            id: uuid::Uuid::new_v4().to_string(),
            sync_type,
            status: SyncLogStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            records_processed: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncLogDB {
    pub id: String,
    pub sync_type: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub records_processed: i32,
    pub errors: Option<String>,
}

impl SyncLog {
    pub(crate) fn to_row(&self) -> SyncLogDB {
        SyncLogDB {
            id: self.id.clone(),
            sync_type: self.sync_type.as_str().to_string(),
            status: self.status.as_str().to_string(),
            started_at: self.started_at.to_rfc3339(),
            finished_at: self.finished_at.map(|t| t.to_rfc3339()),
            records_processed: self.records_processed,
            errors: serde_json::to_string(&self.errors).ok(),
        }
    }
}

impl From<SyncLogDB> for SyncLog {
    fn from(row: SyncLogDB) -> Self {
        SyncLog {
            id: row.id,
            sync_type: SyncType::from_str(&row.sync_type).unwrap_or(SyncType::Full),
            status: SyncLogStatus::from_str(&row.status).unwrap_or_default(),
            started_at: DateTime::parse_from_rfc3339(&row.started_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            finished_at: row.finished_at.and_then(|t| {
                DateTime::parse_from_rfc3339(&t)
                    .map(|t| t.with_timezone(&Utc))
                    .ok()
            }),
            records_processed: row.records_processed,
            errors: row
                .errors
                .as_deref()
                .and_then(|e| serde_json::from_str(e).ok())
                .unwrap_or_default(),
        }
    }
}

/// How a finished (non-error) run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Paused,
    Stopped,
}

/// Summary returned by a finished `start()` call.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub log_id: String,
    pub outcome: RunOutcome,
    pub records_processed: i32,
    pub errors: Vec<String>,
}

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub max_consecutive_failures: u32,
    pub retry_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Overall completion estimate: phases completed plus fractional progress
/// within the current phase, scaled to 0-100. With no total hint the
/// in-phase fraction is unknown and counts as zero.
pub fn compute_progress(phase: ImportPhase, processed_in_phase: u64, total_hint: Option<u64>) -> i32 {
    let total_phases = ImportPhase::ALL.len() as f64;
    let fraction = match total_hint {
        Some(total) if total > 0 => (processed_in_phase as f64 / total as f64).min(1.0),
        _ => 0.0,
    };
    let progress = ((phase.index() as f64 + fraction) / total_phases) * 100.0;
    (progress.floor() as i32).clamp(0, 100)
}
