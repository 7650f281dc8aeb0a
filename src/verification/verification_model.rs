use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::constants::{DEFAULT_ACCURACY_PASS_THRESHOLD, DEFAULT_SAMPLE_FRACTION};
use crate::import::ImportPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationTrigger {
    Manual,
    Scheduled,
}

impl VerificationTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationTrigger::Manual => "MANUAL",
            VerificationTrigger::Scheduled => "SCHEDULED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MANUAL" => Some(VerificationTrigger::Manual),
            "SCHEDULED" => Some(VerificationTrigger::Scheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Completed,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Completed => "COMPLETED",
            VerificationStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(VerificationStatus::Completed),
            "FAILED" => Some(VerificationStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One detected field-level mismatch between a stored record and its
/// source-of-truth counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub id: String,
    pub entity_type: ImportPhase,
    pub field: String,
    pub expected: Value,
    pub actual: Value,
    pub severity: Severity,
}

/// Audit outcome for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeResult {
    pub total: u64,
    pub sampled: u64,
    pub matched: u64,
    pub accuracy: f64,
}

/// Result of one verification pass, immutable once finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub id: String,
    pub trigger_type: VerificationTrigger,
    pub sample_strategy: String,
    pub results: BTreeMap<String, EntityTypeResult>,
    pub discrepancies: Vec<Discrepancy>,
    pub overall_accuracy: f64,
    pub status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::verification_reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VerificationReportDB {
    pub id: String,
    pub trigger_type: String,
    pub sample_strategy: String,
    pub results: String,
    pub discrepancies: String,
    pub overall_accuracy: f64,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl VerificationReport {
    pub(crate) fn to_row(&self) -> crate::errors::Result<VerificationReportDB> {
        Ok(VerificationReportDB {
            id: self.id.clone(),
            trigger_type: self.trigger_type.as_str().to_string(),
            sample_strategy: self.sample_strategy.clone(),
            results: serde_json::to_string(&self.results)?,
            discrepancies: serde_json::to_string(&self.discrepancies)?,
            overall_accuracy: self.overall_accuracy,
            status: self.status.as_str().to_string(),
            created_at: self.created_at.to_rfc3339(),
            completed_at: self.completed_at.map(|t| t.to_rfc3339()),
        })
    }
}

impl From<VerificationReportDB> for VerificationReport {
    fn from(row: VerificationReportDB) -> Self {
        VerificationReport {
            id: row.id,
            trigger_type: VerificationTrigger::from_str(&row.trigger_type)
                .unwrap_or(VerificationTrigger::Manual),
            sample_strategy: row.sample_strategy,
            results: serde_json::from_str(&row.results).unwrap_or_default(),
            discrepancies: serde_json::from_str(&row.discrepancies).unwrap_or_default(),
            overall_accuracy: row.overall_accuracy,
            status: VerificationStatus::from_str(&row.status).unwrap_or(VerificationStatus::Failed),
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            completed_at: row.completed_at.and_then(|t| {
                DateTime::parse_from_rfc3339(&t)
                    .map(|t| t.with_timezone(&Utc))
                    .ok()
            }),
        }
    }
}

/// Verification tunables, including the severity policy. Exact thresholds
/// are configuration, not part of the algorithm's contract.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Fraction of stored entities sampled per type, never below one item.
    pub sample_fraction: f64,
    /// Overall accuracy (percent) required for COMPLETED status.
    pub pass_threshold: f64,
    /// Entity types audited per pass.
    pub entity_types: Vec<ImportPhase>,
    /// Fields whose mismatch is classified HIGH (identity fields).
    pub high_severity_fields: Vec<String>,
    /// Fields whose mismatch is classified MEDIUM (statistical fields).
    pub medium_severity_fields: Vec<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        VerificationConfig {
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            pass_threshold: DEFAULT_ACCURACY_PASS_THRESHOLD,
            entity_types: vec![
                ImportPhase::Clubs,
                ImportPhase::Players,
                ImportPhase::Tournaments,
            ],
            high_severity_fields: vec!["name".to_string(), "title".to_string()],
            medium_severity_fields: vec![
                "rating".to_string(),
                "score".to_string(),
                "points".to_string(),
                "gamesPlayed".to_string(),
            ],
        }
    }
}

impl VerificationConfig {
    pub fn classify(&self, field: &str) -> Severity {
        if self.high_severity_fields.iter().any(|f| f == field) {
            Severity::High
        } else if self.medium_severity_fields.iter().any(|f| f == field) {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn sample_strategy(&self) -> String {
        format!("{}_percent", (self.sample_fraction * 100.0).round() as u32)
    }
}

/// `max(1, ceil(total * fraction))`, capped at `total`. Small datasets still
/// get audited.
pub fn sample_size(total: u64, fraction: f64) -> u64 {
    if total == 0 {
        return 0;
    }
    let sampled = (total as f64 * fraction).ceil() as u64;
    sampled.max(1).min(total)
}
