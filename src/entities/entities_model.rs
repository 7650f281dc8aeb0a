use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::import::ImportPhase;

/// A source record as imported, keyed by entity type and source identifier.
/// Entity schemas are owned by downstream consumers; the import pipeline
/// only tracks identity and carries the payload through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    pub entity_type: ImportPhase,
    pub id: String,
    pub payload: Value,
}

impl RawEntity {
    pub fn new(entity_type: ImportPhase, id: impl Into<String>, payload: Value) -> Self {
        RawEntity {
            entity_type,
            id: id.into(),
            payload,
        }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::imported_entities)]
#[diesel(primary_key(entity_type, id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ImportedEntityDB {
    pub entity_type: String,
    pub id: String,
    pub payload: String,
    pub imported_at: String,
}

impl RawEntity {
    pub(crate) fn to_row(&self) -> Result<ImportedEntityDB> {
        Ok(ImportedEntityDB {
            entity_type: self.entity_type.as_str().to_string(),
            id: self.id.clone(),
            payload: serde_json::to_string(&self.payload)?,
            imported_at: Utc::now().to_rfc3339(),
        })
    }

    pub(crate) fn from_row(entity_type: ImportPhase, row: ImportedEntityDB) -> Self {
        RawEntity {
            entity_type,
            id: row.id,
            payload: serde_json::from_str(&row.payload).unwrap_or(Value::Null),
        }
    }
}
