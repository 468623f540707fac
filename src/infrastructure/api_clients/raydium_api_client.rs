use reqwest::Client;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::shared::errors::ServiceError;

pub const DEFAULT_RAYDIUM_API: &str = "https://api-v3.raydium.io";

/// Raydium public API client
#[derive(Clone)]
pub struct RaydiumApiClient {
    http_client: Client,
    base_url: String,
}

impl RaydiumApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public pool record, passed through untouched as `poolInfo`
    pub async fn pool_info(&self, pool_id: &Pubkey) -> Result<Value, ServiceError> {
        let url = format!("{}/pools/info/ids?ids={}", self.base_url, pool_id);
        info!("🔍 fetching Raydium pool info from: {}", url);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "Raydium API request failed with status: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        first_pool(body, pool_id)
    }
}

// The API answers with `{ success, data: [pool | null, ...] }`
fn first_pool(mut body: Value, pool_id: &Pubkey) -> Result<Value, ServiceError> {
    match body.get_mut("data").and_then(Value::as_array_mut) {
        Some(pools) if pools.first().is_some_and(|pool| !pool.is_null()) => Ok(pools.swap_remove(0)),
        _ => Err(ServiceError::NotFound(format!("pool {} in Raydium API", pool_id))),
    }
}
