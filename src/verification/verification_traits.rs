use async_trait::async_trait;
use serde_json::Value;

use super::verification_model::{VerificationReport, VerificationTrigger};
use crate::errors::Result;
use crate::import::ImportPhase;

/// Source-of-truth detail lookup for one stored entity, used by the
/// verification sampler for field-by-field comparison.
#[async_trait]
pub trait SourceDetailLookup: Send + Sync {
    async fn fetch_details(&self, entity_type: ImportPhase, id: &str) -> Result<Value>;
}

#[async_trait]
pub trait VerificationServiceTrait: Send + Sync {
    /// Runs one verification pass and persists the finalized report. A pass
    /// below the accuracy threshold still yields a (FAILED) report.
    async fn run_data_verification(
        &self,
        trigger_type: VerificationTrigger,
    ) -> Result<VerificationReport>;

    /// Reports ordered by timestamp descending; zero reports yields an
    /// empty page with total 0, never an error.
    fn get_verification_history(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<VerificationReport>, i64)>;
}
