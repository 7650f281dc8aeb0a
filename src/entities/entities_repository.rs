use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::import::{EntityStore, ImportPhase};
use crate::schema::imported_entities;

use super::entities_model::{ImportedEntityDB, RawEntity};

/// Repository for imported source records.
pub struct EntityRepository {
    pool: Arc<DbPool>,
}

impl EntityRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        EntityRepository { pool }
    }
}

impl EntityStore for EntityRepository {
    fn persist(&self, entity: &RawEntity) -> Result<()> {
        let row = entity.to_row()?;
        let mut conn = get_connection(&self.pool)?;
        // replace_into keeps re-application of a batch idempotent.
        diesel::replace_into(imported_entities::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn count(&self, entity_type: ImportPhase) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = imported_entities::table
            .filter(imported_entities::entity_type.eq(entity_type.as_str()))
            .count()
            .get_result::<i64>(&mut conn)?;
        Ok(count)
    }

    fn list_ids(&self, entity_type: ImportPhase) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        let ids = imported_entities::table
            .filter(imported_entities::entity_type.eq(entity_type.as_str()))
            .select(imported_entities::id)
            .order(imported_entities::id.asc())
            .load::<String>(&mut conn)?;
        Ok(ids)
    }

    fn get(&self, entity_type: ImportPhase, id: &str) -> Result<Option<RawEntity>> {
        let mut conn = get_connection(&self.pool)?;
        let row = imported_entities::table
            .find((entity_type.as_str(), id))
            .select(ImportedEntityDB::as_select())
            .first::<ImportedEntityDB>(&mut conn)
            .optional()?;
        Ok(row.map(|r| RawEntity::from_row(entity_type, r)))
    }
}
