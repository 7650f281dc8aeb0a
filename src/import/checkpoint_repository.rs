use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::{Error, Result};
use crate::schema::{sync_checkpoint, sync_status};

use super::import_model::{Checkpoint, CheckpointDB};
use super::import_traits::CheckpointStore;

// Fixed primary keys for the singleton rows.
pub(crate) const CHECKPOINT_ROW_ID: &str = "import";
pub(crate) const SYNC_STATUS_ROW_ID: &str = "import";

/// Diesel-backed store for the singleton import checkpoint.
pub struct CheckpointRepository {
    pool: Arc<DbPool>,
}

impl CheckpointRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        CheckpointRepository { pool }
    }
}

impl CheckpointStore for CheckpointRepository {
    fn load(&self) -> Result<Option<Checkpoint>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_checkpoint::table
            .find(CHECKPOINT_ROW_ID)
            .select(CheckpointDB::as_select())
            .first::<CheckpointDB>(&mut conn)
            .optional()?;

        row.map(Checkpoint::from_row).transpose()
    }

    /// Upserts the checkpoint row and the sync-status progress in one
    /// transaction. A write failure here is fatal for the batch in
    /// progress; the caller must not continue without a durable checkpoint.
    fn save(&self, checkpoint: &Checkpoint, current_operation: &str) -> Result<()> {
        let row = checkpoint.to_row(CHECKPOINT_ROW_ID)?;
        let mut conn = get_connection(&self.pool)?;

        conn.transaction::<_, Error, _>(|conn| {
            diesel::replace_into(sync_checkpoint::table)
                .values(&row)
                .execute(conn)?;

            diesel::update(sync_status::table.find(SYNC_STATUS_ROW_ID))
                .set((
                    sync_status::progress.eq(checkpoint.progress),
                    sync_status::current_operation.eq(current_operation),
                    sync_status::updated_at.eq(Utc::now().to_rfc3339()),
                ))
                .execute(conn)?;

            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        diesel::delete(sync_checkpoint::table.find(CHECKPOINT_ROW_ID)).execute(&mut conn)?;
        Ok(())
    }
}
