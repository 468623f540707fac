//! Jito tip floor and block-engine JSON-RPC

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::debug;

use crate::domain::fee::{TipPercentile, TipSource};
use crate::shared::errors::ServiceError;
use crate::shared::utils::sol_to_lamports;

pub const DEFAULT_TIP_FLOOR_URL: &str = "https://bundles.jito.wtf/api/v1/bundles/tip_floor";
pub const DEFAULT_BLOCK_ENGINE_URL: &str = "https://mainnet.block-engine.jito.wtf/api/v1";

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<Value>,
}

pub struct JitoClient {
    http_client: Client,
    tip_floor_url: String,
    block_engine_url: String,
    uuid: Option<String>,
}

impl JitoClient {
    pub fn new(tip_floor_url: impl Into<String>, block_engine_url: impl Into<String>, uuid: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            tip_floor_url: tip_floor_url.into(),
            block_engine_url: block_engine_url.into().trim_end_matches('/').to_string(),
            uuid: uuid.filter(|uuid| !uuid.is_empty()),
        }
    }

    fn bundles_endpoint(&self) -> String {
        match &self.uuid {
            Some(uuid) => format!("{}/bundles?uuid={}", self.block_engine_url, uuid),
            None => format!("{}/bundles", self.block_engine_url),
        }
    }

    async fn send_request<T: for<'de> Deserialize<'de>>(&self, method: &str) -> Result<T, ServiceError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": [],
        });

        let response = self
            .http_client
            .post(self.bundles_endpoint())
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "{} failed with status: {}",
                method,
                response.status()
            )));
        }

        let body: JsonRpcResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            return Err(ServiceError::Upstream(format!("{} error: {}", method, error)));
        }
        body.result
            .ok_or_else(|| ServiceError::Upstream(format!("{} returned no result", method)))
    }

    pub async fn tip_accounts(&self) -> Result<Vec<Pubkey>, ServiceError> {
        let accounts: Vec<String> = self.send_request("getTipAccounts").await?;
        accounts
            .iter()
            .map(|account| {
                Pubkey::from_str(account)
                    .map_err(|e| ServiceError::Upstream(format!("bad tip account {}: {}", account, e)))
            })
            .collect()
    }
}

#[async_trait]
impl TipSource for JitoClient {
    async fn tip_lamports(&self, tick: TipPercentile) -> Result<u64, ServiceError> {
        let response = self.http_client.get(&self.tip_floor_url).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "tip floor request failed with status: {}",
                response.status()
            )));
        }
        let body: Value = response.json().await?;
        tip_from_floor(&body, tick)
    }

    async fn random_tip_account(&self) -> Result<Pubkey, ServiceError> {
        let accounts = self.tip_accounts().await?;
        let account = pick_tip_account(&accounts, &mut rand::thread_rng())?;
        debug!("picked tip account {} of {}", account, accounts.len());
        Ok(account)
    }
}

/// Reads `tick` (in SOL) from the first tip-floor entry and converts to lamports
fn tip_from_floor(body: &Value, tick: TipPercentile) -> Result<u64, ServiceError> {
    let sol = body
        .get(0)
        .and_then(|entry| entry.get(tick.as_str()))
        .and_then(Value::as_f64)
        .ok_or_else(|| ServiceError::Upstream(format!("tip floor has no {}", tick)))?;
    Ok(sol_to_lamports(sol))
}

fn pick_tip_account<R: rand::Rng + ?Sized>(accounts: &[Pubkey], rng: &mut R) -> Result<Pubkey, ServiceError> {
    accounts
        .choose(rng)
        .copied()
        .ok_or_else(|| ServiceError::Upstream("no tip accounts available".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn floor() -> Value {
        json!([{
            "time": "2024-09-01T12:58:00Z",
            "landed_tips_25th_percentile": 2.5e-9,
            "landed_tips_50th_percentile": 1e-5,
            "landed_tips_75th_percentile": 3.6196500000000005e-5,
            "landed_tips_95th_percentile": 0.0014479055000000002,
            "landed_tips_99th_percentile": 0.0625,
            "ema_landed_tips_50th_percentile": 0.25
        }])
    }

    #[test]
    fn test_tip_from_floor_rounds_up() {
        assert_eq!(tip_from_floor(&floor(), TipPercentile::Ema50th).unwrap(), 250_000_000);
        assert_eq!(tip_from_floor(&floor(), TipPercentile::Landed25th).unwrap(), 3);
        assert_eq!(tip_from_floor(&floor(), TipPercentile::Landed99th).unwrap(), 62_500_000);
    }

    #[test]
    fn test_tip_from_floor_missing_field() {
        assert!(tip_from_floor(&json!([]), TipPercentile::Ema50th).is_err());
        assert!(tip_from_floor(&json!([{ "time": "x" }]), TipPercentile::Landed50th).is_err());
    }

    #[test]
    fn test_pick_tip_account() {
        let accounts: Vec<Pubkey> = (0..8).map(|_| Pubkey::new_unique()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let picked = pick_tip_account(&accounts, &mut rng).unwrap();
            assert!(accounts.contains(&picked));
        }
        assert!(pick_tip_account(&[], &mut rng).is_err());
    }

    #[test]
    fn test_bundles_endpoint() {
        let client = JitoClient::new(DEFAULT_TIP_FLOOR_URL, "https://block/api/v1/", None);
        assert_eq!(client.bundles_endpoint(), "https://block/api/v1/bundles");
        let client = JitoClient::new(DEFAULT_TIP_FLOOR_URL, "https://block/api/v1", Some("abc".to_string()));
        assert_eq!(client.bundles_endpoint(), "https://block/api/v1/bundles?uuid=abc");
        let client = JitoClient::new(DEFAULT_TIP_FLOOR_URL, "https://block/api/v1", Some(String::new()));
        assert_eq!(client.bundles_endpoint(), "https://block/api/v1/bundles");
    }
}
