//! Verification sampler: draws a statistically sized sample of stored
//! entities per type, re-fetches their source-of-truth values and scores
//! accuracy.

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::Result;
use crate::import::{EntityStore, ImportPhase};
use crate::notifications::{AdminAlert, NotificationServiceTrait, NotificationType};

use super::verification_model::{
    sample_size, Discrepancy, EntityTypeResult, Severity, VerificationConfig, VerificationReport,
    VerificationStatus, VerificationTrigger,
};
use super::verification_repository::VerificationRepository;
use super::verification_traits::{SourceDetailLookup, VerificationServiceTrait};

pub struct VerificationService {
    store: Arc<dyn EntityStore>,
    source: Arc<dyn SourceDetailLookup>,
    verification_repository: Arc<VerificationRepository>,
    alerts: Arc<dyn NotificationServiceTrait>,
    config: VerificationConfig,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        source: Arc<dyn SourceDetailLookup>,
        verification_repository: Arc<VerificationRepository>,
        alerts: Arc<dyn NotificationServiceTrait>,
        config: VerificationConfig,
    ) -> Self {
        VerificationService {
            store,
            source,
            verification_repository,
            alerts,
            config,
        }
    }

    async fn verify_entity_type(
        &self,
        entity_type: ImportPhase,
        discrepancies: &mut Vec<Discrepancy>,
    ) -> Result<EntityTypeResult> {
        let ids = self.store.list_ids(entity_type)?;
        let total = ids.len() as u64;
        if total == 0 {
            // Nothing stored means nothing to audit; an empty type does not
            // drag the overall score down.
            return Ok(EntityTypeResult {
                total: 0,
                sampled: 0,
                matched: 0,
                accuracy: 100.0,
            });
        }

        let sampled = sample_size(total, self.config.sample_fraction);
        // Seeded by the (total, sampled) pair so the same input state
        // reproduces the same sample.
        let mut rng = StdRng::seed_from_u64((total << 16) ^ sampled);
        let indexes = rand::seq::index::sample(&mut rng, ids.len(), sampled as usize);

        let mut matched = 0u64;
        for index in indexes.iter() {
            let id = &ids[index];
            let before = discrepancies.len();
            self.verify_entity(entity_type, id, discrepancies).await?;
            if discrepancies.len() == before {
                matched += 1;
            }
        }

        let accuracy = matched as f64 / sampled as f64 * 100.0;
        info!(
            "Verified {}: {}/{} sampled records matched ({:.1}%)",
            entity_type, matched, sampled, accuracy
        );
        Ok(EntityTypeResult {
            total,
            sampled,
            matched,
            accuracy,
        })
    }

    async fn verify_entity(
        &self,
        entity_type: ImportPhase,
        id: &str,
        discrepancies: &mut Vec<Discrepancy>,
    ) -> Result<()> {
        let stored = match self.store.get(entity_type, id)? {
            Some(entity) => entity.payload,
            None => Value::Null,
        };

        match self.source.fetch_details(entity_type, id).await {
            Ok(expected) => {
                discrepancies.extend(compare_fields(
                    id,
                    entity_type,
                    &stored,
                    &expected,
                    &self.config,
                ));
            }
            Err(e) => {
                // One unreachable record degrades accuracy, it does not
                // abort the pass.
                warn!("Source unreachable for {} {}: {}", entity_type, id, e);
                discrepancies.push(Discrepancy {
                    id: id.to_string(),
                    entity_type,
                    field: "_source".to_string(),
                    expected: Value::String("reachable".to_string()),
                    actual: Value::String(e.to_string()),
                    severity: Severity::High,
                });
            }
        }
        Ok(())
    }

    async fn dispatch_accuracy_alert(&self, report: &VerificationReport) {
        let alert = AdminAlert {
            notification_type: NotificationType::SystemAlert,
            title: "Data verification below threshold".to_string(),
            message: format!(
                "Overall accuracy {:.2}% is below the configured threshold of {:.2}%",
                report.overall_accuracy, self.config.pass_threshold
            ),
            details: Some(serde_json::json!({
                "reportId": report.id,
                "overallAccuracy": report.overall_accuracy,
            })),
        };
        if let Err(e) = self.alerts.send_admin_alerts(alert, None).await {
            warn!("Failed to dispatch verification alert: {}", e);
        }
    }
}

#[async_trait]
impl VerificationServiceTrait for VerificationService {
    async fn run_data_verification(
        &self,
        trigger_type: VerificationTrigger,
    ) -> Result<VerificationReport> {
        info!("Starting data verification ({})", trigger_type.as_str());
        let created_at = Utc::now();

        let mut results: BTreeMap<String, EntityTypeResult> = BTreeMap::new();
        let mut discrepancies: Vec<Discrepancy> = Vec::new();

        for entity_type in &self.config.entity_types {
            let result = self
                .verify_entity_type(*entity_type, &mut discrepancies)
                .await?;
            results.insert(entity_type.as_str().to_string(), result);
        }

        // Each entity type contributes equally, independent of row counts.
        let overall_accuracy = if results.is_empty() {
            100.0
        } else {
            results.values().map(|r| r.accuracy).sum::<f64>() / results.len() as f64
        };

        let status = if overall_accuracy >= self.config.pass_threshold {
            VerificationStatus::Completed
        } else {
            VerificationStatus::Failed
        };

        let report = VerificationReport {
            id: Uuid::new_v4().to_string(),
            trigger_type,
            sample_strategy: self.config.sample_strategy(),
            results,
            discrepancies,
            overall_accuracy,
            status,
            created_at,
            completed_at: Some(Utc::now()),
        };

        self.verification_repository.insert(&report)?;

        if report.status == VerificationStatus::Failed {
            warn!(
                "Verification finished below threshold: {:.2}% < {:.2}%",
                overall_accuracy, self.config.pass_threshold
            );
            self.dispatch_accuracy_alert(&report).await;
        } else {
            info!("Verification completed at {:.2}% accuracy", overall_accuracy);
        }

        Ok(report)
    }

    fn get_verification_history(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<VerificationReport>, i64)> {
        self.verification_repository.history(page, limit)
    }
}

/// Field-by-field comparison against the source-of-truth record. Every
/// field the source carries must be present and equal in the stored
/// payload; extra stored fields are not counted against accuracy.
pub(crate) fn compare_fields(
    id: &str,
    entity_type: ImportPhase,
    stored: &Value,
    expected: &Value,
    config: &VerificationConfig,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    let Some(expected_fields) = expected.as_object() else {
        return out;
    };

    for (field, expected_value) in expected_fields {
        let actual_value = stored.get(field).cloned().unwrap_or(Value::Null);
        if &actual_value != expected_value {
            out.push(Discrepancy {
                id: id.to_string(),
                entity_type,
                field: field.clone(),
                expected: expected_value.clone(),
                actual: actual_value,
                severity: config.classify(field),
            });
        }
    }
    out
}
