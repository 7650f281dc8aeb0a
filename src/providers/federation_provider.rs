//! HTTP client for the federation data API, implementing both the batch
//! feed consumed by the orchestrator and the detail lookups consumed by
//! the verification sampler.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::entities::RawEntity;
use crate::errors::Result;
use crate::import::{EntitySource, ImportPhase};
use crate::verification::SourceDetailLookup;

use super::provider_errors::ProviderError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct FederationApiProvider {
    client: Client,
    base_url: String,
}

/// Listing/detail path for each phase on the federation API.
fn phase_path(phase: ImportPhase) -> &'static str {
    match phase {
        ImportPhase::Clubs => "clubs",
        ImportPhase::Players => "players",
        ImportPhase::PlayerYearStats => "player-year-stats",
        ImportPhase::Tournaments => "tournaments",
        ImportPhase::PlayerTournamentHistory => "player-tournament-history",
        ImportPhase::Games => "games",
        ImportPhase::Statistics => "statistics",
    }
}

impl FederationApiProvider {
    pub fn new(base_url: impl Into<String>) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(FederationApiProvider {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn list_url(&self, phase: ImportPhase) -> String {
        format!("{}/{}", self.base_url, phase_path(phase))
    }

    fn detail_url(&self, phase: ImportPhase, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, phase_path(phase), id)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> std::result::Result<Value, ProviderError> {
        let response = self.client.get(url).query(query).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(url.to_string())),
            status if !status.is_success() => {
                Err(ProviderError::UnexpectedStatus(status.as_u16(), url.to_string()))
            }
            _ => Ok(response.json::<Value>().await?),
        }
    }

    pub async fn fetch_player_details(&self, id: &str) -> Result<Value> {
        self.fetch_details(ImportPhase::Players, id).await
    }

    pub async fn fetch_club_details(&self, id: &str) -> Result<Value> {
        self.fetch_details(ImportPhase::Clubs, id).await
    }

    pub async fn fetch_tournament_details(&self, id: &str) -> Result<Value> {
        self.fetch_details(ImportPhase::Tournaments, id).await
    }
}

#[async_trait]
impl EntitySource for FederationApiProvider {
    async fn fetch_batch(
        &self,
        phase: ImportPhase,
        after_id: Option<&str>,
        batch_size: usize,
    ) -> Result<Vec<RawEntity>> {
        let url = self.list_url(phase);
        let mut query = vec![("limit", batch_size.to_string())];
        if let Some(after) = after_id {
            query.push(("after", after.to_string()));
        }

        let body = self.get_json(&url, &query).await?;
        let items = body
            .as_array()
            .ok_or_else(|| ProviderError::InvalidPayload(format!("expected array from {}", url)))?;

        let mut batch = Vec::with_capacity(items.len());
        for item in items {
            let id = item
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    ProviderError::InvalidPayload(format!("record without id from {}", url))
                })?
                .to_string();
            batch.push(RawEntity::new(phase, id, item.clone()));
        }
        debug!("Fetched {} {} records from source", batch.len(), phase);
        Ok(batch)
    }

    async fn estimated_total(&self, phase: ImportPhase) -> Result<Option<u64>> {
        let url = format!("{}/count", self.list_url(phase));
        // Progress estimation only; a source without a count endpoint is
        // not an error.
        match self.get_json(&url, &[]).await {
            Ok(body) => Ok(body.get("count").and_then(|v| v.as_u64())),
            Err(e) => {
                debug!("No total available for {}: {}", phase, e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SourceDetailLookup for FederationApiProvider {
    async fn fetch_details(&self, entity_type: ImportPhase, id: &str) -> Result<Value> {
        let url = self.detail_url(entity_type, id);
        Ok(self.get_json(&url, &[]).await?)
    }
}
