use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::{sync_logs, sync_status};

use super::checkpoint_repository::SYNC_STATUS_ROW_ID;
use super::import_errors::ImportError;
use super::import_model::{SyncLog, SyncLogDB, SyncLogStatus, SyncStatus, SyncStatusDB, SyncType};
use super::import_traits::SyncStateStore;

/// Diesel-backed store for the sync-status singleton and the append-only
/// run log.
pub struct SyncStateRepository {
    pool: Arc<DbPool>,
}

impl SyncStateRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        SyncStateRepository { pool }
    }

    fn load_status(conn: &mut crate::db::DbConnection) -> Result<SyncStatus> {
        let row = sync_status::table
            .find(SYNC_STATUS_ROW_ID)
            .select(SyncStatusDB::as_select())
            .first::<SyncStatusDB>(conn)
            .optional()?;
        Ok(row.map(SyncStatus::from).unwrap_or_default())
    }
}

impl SyncStateStore for SyncStateRepository {
    /// Check-and-set of the `is_running` gate. The read and the write run
    /// inside one exclusive transaction so two concurrent `start()` calls
    /// cannot both pass the check.
    fn try_begin_run(&self, sync_type: SyncType) -> Result<SyncLog> {
        let mut conn = get_connection(&self.pool)?;

        conn.exclusive_transaction::<_, Error, _>(|conn| {
            let row = sync_status::table
                .find(SYNC_STATUS_ROW_ID)
                .select(SyncStatusDB::as_select())
                .first::<SyncStatusDB>(conn)
                .optional()?;
            let mut status = row.map(SyncStatus::from).unwrap_or_default();

            if status.is_running {
                return Err(Error::Import(ImportError::AlreadyRunning));
            }

            status.is_running = true;
            status.progress = 0;
            status.current_operation = Some("Starting import".to_string());
            status.last_error = None;
            status.last_sync_type = Some(sync_type);

            diesel::replace_into(sync_status::table)
                .values(status.to_row(SYNC_STATUS_ROW_ID))
                .execute(conn)?;

            let log = SyncLog::new(sync_type);
            diesel::insert_into(sync_logs::table)
                .values(log.to_row())
                .execute(conn)?;

            Ok(log)
        })
    }

    fn get_status(&self) -> Result<SyncStatus> {
        let mut conn = get_connection(&self.pool)?;
        Self::load_status(&mut conn)
    }

    fn mark_paused(&self) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;

        conn.transaction::<_, Error, _>(|conn| {
            let mut status = Self::load_status(conn)?;
            status.is_running = false;
            status.current_operation = Some("Import paused".to_string());

            diesel::replace_into(sync_status::table)
                .values(status.to_row(SYNC_STATUS_ROW_ID))
                .execute(conn)?;
            Ok(())
        })
    }

    fn finish_run(
        &self,
        log_id: &str,
        log_status: SyncLogStatus,
        records_processed: i32,
        errors: &[String],
        last_error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        let errors_json = serde_json::to_string(errors)?;
        let mut conn = get_connection(&self.pool)?;

        conn.transaction::<_, Error, _>(|conn| {
            diesel::update(sync_logs::table.find(log_id))
                .set((
                    sync_logs::status.eq(log_status.as_str()),
                    sync_logs::finished_at.eq(now.to_rfc3339()),
                    sync_logs::records_processed.eq(records_processed),
                    sync_logs::errors.eq(&errors_json),
                ))
                .execute(conn)?;

            let mut status = Self::load_status(conn)?;
            status.is_running = false;
            status.last_error = last_error.map(String::from);
            match log_status {
                SyncLogStatus::Completed => {
                    status.progress = 100;
                    status.current_operation = Some("Import completed".to_string());
                    status.last_sync_time = Some(now);
                }
                SyncLogStatus::Stopped => {
                    status.current_operation = Some("Import stopped".to_string());
                }
                _ => {
                    status.current_operation = Some("Import failed".to_string());
                }
            }

            diesel::replace_into(sync_status::table)
                .values(status.to_row(SYNC_STATUS_ROW_ID))
                .execute(conn)?;
            Ok(())
        })
    }

    fn get_recent_logs(&self, limit: i64) -> Result<Vec<SyncLog>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_logs::table
            .order(sync_logs::started_at.desc())
            .limit(limit)
            .select(SyncLogDB::as_select())
            .load::<SyncLogDB>(&mut conn)?;
        Ok(rows.into_iter().map(SyncLog::from).collect())
    }
}
