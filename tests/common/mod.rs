use std::sync::Arc;
use tempfile::TempDir;

use chessfed_core::db::{self, DbPool};

/// A migrated sqlite database in a temp directory, dropped with the test.
pub struct TestDb {
    pub pool: Arc<DbPool>,
    _dir: TempDir,
}

pub fn setup_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("chessfed_test.db");
    let pool = db::create_pool(db_path.to_str().unwrap()).unwrap();
    db::run_migrations(&pool).unwrap();
    TestDb { pool, _dir: dir }
}
