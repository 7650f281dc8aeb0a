use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::verification_reports;

use super::verification_model::{VerificationReport, VerificationReportDB};

/// Append-only store for verification reports.
pub struct VerificationRepository {
    pool: Arc<DbPool>,
}

impl VerificationRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        VerificationRepository { pool }
    }

    pub fn insert(&self, report: &VerificationReport) -> Result<()> {
        let row = report.to_row()?;
        let mut conn = get_connection(&self.pool)?;
        diesel::insert_into(verification_reports::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Paginated history, newest first. `page` is zero-based.
    pub fn history(&self, page: i64, limit: i64) -> Result<(Vec<VerificationReport>, i64)> {
        let page = page.max(0);
        let limit = limit.max(0);
        let mut conn = get_connection(&self.pool)?;

        let total = verification_reports::table
            .count()
            .get_result::<i64>(&mut conn)?;

        let rows = verification_reports::table
            .order(verification_reports::created_at.desc())
            .limit(limit)
            .offset(page * limit)
            .select(VerificationReportDB::as_select())
            .load::<VerificationReportDB>(&mut conn)?;

        Ok((rows.into_iter().map(VerificationReport::from).collect(), total))
    }
}
