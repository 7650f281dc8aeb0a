use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::db;
use crate::entities::RawEntity;
use crate::errors::{Error, Result};
use crate::import::{EntityStore, ImportPhase};
use crate::notifications::{AdminAlert, Notification, NotificationServiceTrait};
use crate::providers::ProviderError;

use super::verification_model::{
    sample_size, Severity, VerificationConfig, VerificationReport, VerificationStatus,
    VerificationTrigger,
};
use super::verification_repository::VerificationRepository;
use super::verification_service::{compare_fields, VerificationService};
use super::verification_traits::{SourceDetailLookup, VerificationServiceTrait};

// --- Fixtures ---

struct TestDb {
    _dir: TempDir,
    repository: Arc<VerificationRepository>,
}

fn test_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("verification_test.db");
    let pool = db::create_pool(db_path.to_str().unwrap()).unwrap();
    db::run_migrations(&pool).unwrap();
    TestDb {
        _dir: dir,
        repository: Arc::new(VerificationRepository::new(pool)),
    }
}

/// Entity store backed by a map, mirroring what the importer would have
/// written. Some ids can hold payloads that disagree with the source.
#[derive(Default)]
struct MapEntityStore {
    entities: BTreeMap<(ImportPhase, String), Value>,
}

impl MapEntityStore {
    fn insert(&mut self, entity_type: ImportPhase, id: &str, payload: Value) {
        self.entities.insert((entity_type, id.to_string()), payload);
    }
}

impl EntityStore for MapEntityStore {
    fn persist(&self, _entity: &RawEntity) -> Result<()> {
        unimplemented!("verification never writes entities")
    }

    fn count(&self, entity_type: ImportPhase) -> Result<i64> {
        Ok(self
            .entities
            .keys()
            .filter(|(t, _)| *t == entity_type)
            .count() as i64)
    }

    fn list_ids(&self, entity_type: ImportPhase) -> Result<Vec<String>> {
        Ok(self
            .entities
            .keys()
            .filter(|(t, _)| *t == entity_type)
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn get(&self, entity_type: ImportPhase, id: &str) -> Result<Option<RawEntity>> {
        Ok(self
            .entities
            .get(&(entity_type, id.to_string()))
            .map(|payload| RawEntity::new(entity_type, id, payload.clone())))
    }
}

/// Source-of-truth lookup with a fixed answer per id and an optional set of
/// ids that fail with a network-style error.
#[derive(Default)]
struct ScriptedLookup {
    details: BTreeMap<(ImportPhase, String), Value>,
    unreachable: HashSet<String>,
}

impl ScriptedLookup {
    fn insert(&mut self, entity_type: ImportPhase, id: &str, payload: Value) {
        self.details.insert((entity_type, id.to_string()), payload);
    }
}

#[async_trait]
impl SourceDetailLookup for ScriptedLookup {
    async fn fetch_details(&self, entity_type: ImportPhase, id: &str) -> Result<Value> {
        if self.unreachable.contains(id) {
            return Err(Error::Provider(ProviderError::NotFound(id.to_string())));
        }
        self.details
            .get(&(entity_type, id.to_string()))
            .cloned()
            .ok_or_else(|| Error::Provider(ProviderError::NotFound(id.to_string())))
    }
}

#[derive(Default)]
struct RecordingAlerts {
    alerts: Mutex<Vec<AdminAlert>>,
}

#[async_trait]
impl NotificationServiceTrait for RecordingAlerts {
    async fn send_admin_alerts(
        &self,
        alert: AdminAlert,
        _sync_log_id: Option<&str>,
    ) -> Result<Vec<Notification>> {
        self.alerts.lock().unwrap().push(alert);
        Ok(Vec::new())
    }

    fn mark_notification_as_read(&self, _notification_id: &str, _user_id: &str) -> Result<()> {
        Ok(())
    }

    fn get_unread_notifications(&self, _user_id: &str) -> Result<Vec<Notification>> {
        Ok(Vec::new())
    }
}

fn player_config() -> VerificationConfig {
    VerificationConfig {
        sample_fraction: 1.0,
        entity_types: vec![ImportPhase::Players],
        ..VerificationConfig::default()
    }
}

fn service(
    store: MapEntityStore,
    lookup: ScriptedLookup,
    repository: Arc<VerificationRepository>,
    config: VerificationConfig,
) -> (VerificationService, Arc<RecordingAlerts>) {
    let alerts = Arc::new(RecordingAlerts::default());
    let service = VerificationService::new(
        Arc::new(store),
        Arc::new(lookup),
        repository,
        alerts.clone(),
        config,
    );
    (service, alerts)
}

// --- Sampling and severity unit tests ---

#[test]
fn test_sample_size_bounds() {
    assert_eq!(sample_size(0, 0.01), 0);
    // Small datasets still get at least one record audited.
    assert_eq!(sample_size(1, 0.01), 1);
    assert_eq!(sample_size(50, 0.01), 1);
    // Ceiling, not floor.
    assert_eq!(sample_size(101, 0.01), 2);
    assert_eq!(sample_size(10_000, 0.01), 100);
    // Never more than the population.
    assert_eq!(sample_size(3, 1.0), 3);
    assert_eq!(sample_size(3, 2.0), 3);
}

#[test]
fn test_severity_classification() {
    let config = VerificationConfig::default();
    assert_eq!(config.classify("name"), Severity::High);
    assert_eq!(config.classify("title"), Severity::High);
    assert_eq!(config.classify("rating"), Severity::Medium);
    assert_eq!(config.classify("gamesPlayed"), Severity::Medium);
    assert_eq!(config.classify("city"), Severity::Low);
}

#[test]
fn test_sample_strategy_label() {
    let config = VerificationConfig::default();
    assert_eq!(config.sample_strategy(), "1_percent");
}

#[test]
fn test_compare_fields_flags_mismatches() {
    let config = VerificationConfig::default();
    let stored = json!({ "id": "p1", "name": "Magnus", "rating": 2830, "club": "Oslo" });
    let expected = json!({ "id": "p1", "name": "Magnus C.", "rating": 2839 });

    let found = compare_fields("p1", ImportPhase::Players, &stored, &expected, &config);
    assert_eq!(found.len(), 2);

    let name = found.iter().find(|d| d.field == "name").unwrap();
    assert_eq!(name.severity, Severity::High);
    assert_eq!(name.expected, json!("Magnus C."));
    assert_eq!(name.actual, json!("Magnus"));

    let rating = found.iter().find(|d| d.field == "rating").unwrap();
    assert_eq!(rating.severity, Severity::Medium);
}

#[test]
fn test_compare_fields_missing_field_reported_as_null() {
    let config = VerificationConfig::default();
    let stored = json!({ "id": "p1" });
    let expected = json!({ "id": "p1", "rating": 2500 });

    let found = compare_fields("p1", ImportPhase::Players, &stored, &expected, &config);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field, "rating");
    assert_eq!(found[0].actual, Value::Null);
}

#[test]
fn test_compare_fields_extra_stored_fields_are_ignored() {
    let config = VerificationConfig::default();
    let stored = json!({ "id": "p1", "name": "Judit", "importedAt": "2026-01-01" });
    let expected = json!({ "id": "p1", "name": "Judit" });

    let found = compare_fields("p1", ImportPhase::Players, &stored, &expected, &config);
    assert!(found.is_empty());
}

// --- Full verification pass tests ---

#[tokio::test]
async fn test_verification_pass_with_no_mismatches() {
    let db = test_db();
    let mut store = MapEntityStore::default();
    let mut lookup = ScriptedLookup::default();
    for i in 0..10 {
        let id = format!("p{}", i);
        let payload = json!({ "id": id, "name": format!("Player {}", i), "rating": 2000 + i });
        store.insert(ImportPhase::Players, &id, payload.clone());
        lookup.insert(ImportPhase::Players, &id, payload);
    }

    let (service, alerts) = service(store, lookup, db.repository.clone(), player_config());
    let report = service
        .run_data_verification(VerificationTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(report.status, VerificationStatus::Completed);
    assert_eq!(report.overall_accuracy, 100.0);
    assert!(report.discrepancies.is_empty());

    let players = &report.results["PLAYERS"];
    assert_eq!(players.total, 10);
    assert_eq!(players.sampled, 10);
    assert_eq!(players.matched, 10);

    // The report landed in the database.
    let (history, total) = service.get_verification_history(0, 10).unwrap();
    assert_eq!(total, 1);
    assert_eq!(history[0].id, report.id);
    assert!(alerts.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_verification_scores_mismatches_above_threshold() {
    let db = test_db();
    let mut store = MapEntityStore::default();
    let mut lookup = ScriptedLookup::default();
    for i in 0..100 {
        let id = format!("p{:03}", i);
        let truth = json!({ "id": id, "name": format!("Player {}", i) });
        // Three records drifted from the source after import.
        let stored = if i < 3 {
            json!({ "id": id, "name": format!("Stale {}", i) })
        } else {
            truth.clone()
        };
        store.insert(ImportPhase::Players, &id, stored);
        lookup.insert(ImportPhase::Players, &id, truth);
    }

    let (service, alerts) = service(store, lookup, db.repository.clone(), player_config());
    let report = service
        .run_data_verification(VerificationTrigger::Scheduled)
        .await
        .unwrap();

    let players = &report.results["PLAYERS"];
    assert_eq!(players.sampled, 100);
    assert_eq!(players.matched, 97);
    assert_eq!(report.overall_accuracy, 97.0);
    // 97% clears the default 95% threshold.
    assert_eq!(report.status, VerificationStatus::Completed);
    assert_eq!(report.discrepancies.len(), 3);
    assert!(report.discrepancies.iter().all(|d| d.field == "name"));
    assert!(report
        .discrepancies
        .iter()
        .all(|d| d.severity == Severity::High));
    assert!(alerts.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_verification_below_threshold_fails_and_alerts() {
    let db = test_db();
    let mut store = MapEntityStore::default();
    let mut lookup = ScriptedLookup::default();
    for i in 0..20 {
        let id = format!("p{:02}", i);
        let truth = json!({ "id": id, "rating": 2200 });
        let stored = if i < 4 {
            json!({ "id": id, "rating": 0 })
        } else {
            truth.clone()
        };
        store.insert(ImportPhase::Players, &id, stored);
        lookup.insert(ImportPhase::Players, &id, truth);
    }

    let (service, alerts) = service(store, lookup, db.repository.clone(), player_config());
    let report = service
        .run_data_verification(VerificationTrigger::Manual)
        .await
        .unwrap();

    // 16/20 = 80%, below the 95% threshold: the report is still persisted
    // and administrators are alerted.
    assert_eq!(report.overall_accuracy, 80.0);
    assert_eq!(report.status, VerificationStatus::Failed);
    let (_, total) = service.get_verification_history(0, 10).unwrap();
    assert_eq!(total, 1);

    let alerts = alerts.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.contains("below the configured threshold"));
}

#[tokio::test]
async fn test_unreachable_source_counts_as_discrepancy() {
    let db = test_db();
    let mut store = MapEntityStore::default();
    let mut lookup = ScriptedLookup::default();
    for i in 0..4 {
        let id = format!("p{}", i);
        let payload = json!({ "id": id, "name": format!("Player {}", i) });
        store.insert(ImportPhase::Players, &id, payload.clone());
        lookup.insert(ImportPhase::Players, &id, payload);
    }
    lookup.unreachable.insert("p2".to_string());

    let (service, _) = service(store, lookup, db.repository.clone(), player_config());
    let report = service
        .run_data_verification(VerificationTrigger::Manual)
        .await
        .unwrap();

    // The pass does not abort; the unreachable record scores against it.
    assert_eq!(report.results["PLAYERS"].matched, 3);
    assert_eq!(report.discrepancies.len(), 1);
    assert_eq!(report.discrepancies[0].field, "_source");
    assert_eq!(report.discrepancies[0].severity, Severity::High);
}

#[tokio::test]
async fn test_empty_entity_type_scores_full_accuracy() {
    let db = test_db();
    let config = VerificationConfig {
        sample_fraction: 1.0,
        entity_types: vec![ImportPhase::Players, ImportPhase::Clubs],
        ..VerificationConfig::default()
    };

    let mut store = MapEntityStore::default();
    let mut lookup = ScriptedLookup::default();
    let payload = json!({ "id": "c1", "name": "Oslo Chess Club" });
    store.insert(ImportPhase::Clubs, "c1", payload.clone());
    lookup.insert(ImportPhase::Clubs, "c1", payload);

    let (service, _) = service(store, lookup, db.repository.clone(), config);
    let report = service
        .run_data_verification(VerificationTrigger::Scheduled)
        .await
        .unwrap();

    // No stored players: nothing to audit, nothing to penalize.
    let players = &report.results["PLAYERS"];
    assert_eq!(players.total, 0);
    assert_eq!(players.sampled, 0);
    assert_eq!(players.accuracy, 100.0);
    assert_eq!(report.overall_accuracy, 100.0);
    assert_eq!(report.status, VerificationStatus::Completed);
}

#[tokio::test]
async fn test_history_pagination_newest_first() {
    let db = test_db();

    let (empty, total) = db.repository.history(0, 10).unwrap();
    assert!(empty.is_empty());
    assert_eq!(total, 0);

    for i in 0..3 {
        let report = VerificationReport {
            id: format!("report-{}", i),
            trigger_type: VerificationTrigger::Scheduled,
            sample_strategy: "1_percent".to_string(),
            results: BTreeMap::new(),
            discrepancies: Vec::new(),
            overall_accuracy: 100.0,
            status: VerificationStatus::Completed,
            created_at: chrono::Utc::now() + chrono::Duration::seconds(i),
            completed_at: None,
        };
        db.repository.insert(&report).unwrap();
    }

    let (page0, total) = db.repository.history(0, 2).unwrap();
    assert_eq!(total, 3);
    assert_eq!(page0.len(), 2);
    assert_eq!(page0[0].id, "report-2");
    assert_eq!(page0[1].id, "report-1");

    let (page1, _) = db.repository.history(1, 2).unwrap();
    assert_eq!(page1.len(), 1);
    assert_eq!(page1[0].id, "report-0");

    let (beyond, _) = db.repository.history(5, 2).unwrap();
    assert!(beyond.is_empty());
}
