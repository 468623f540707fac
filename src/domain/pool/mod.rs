//! Pool domain - live reserve tracking for a single AMM pool

pub mod keys;
pub mod layout;
mod tracker;

pub use keys::PoolKeys;
pub use layout::{PoolDescriptor, VaultAccount};
pub use tracker::{available_reserve, TrackerHandle};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::mpsc;
use crate::shared::errors::ServiceError;
use crate::shared::types::{AccountEvent, SubscriptionId};

/// Pool state fetched in one shot during `init`
#[derive(Debug, Clone)]
pub struct FetchedPool {
    pub pool_id: Pubkey,
    pub program_id: Pubkey,
    pub descriptor: PoolDescriptor,
    pub base_vault_amount: u64,
    pub quote_vault_amount: u64,
    pub pool_info: serde_json::Value,
}

/// One-shot pool query against the chain
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pool(&self, pool_id: &Pubkey) -> Result<FetchedPool, ServiceError>;
}

/// Push-based account change feed
///
/// Every event produced by a subscription is tagged with the id returned
/// from `subscribe`. A subscription whose stream ends sends one final
/// `AccountEvent::Closed` and is gone; `unsubscribe` on it may then fail.
#[async_trait]
pub trait AccountNotifier: Send + Sync {
    async fn subscribe(
        &self,
        account: Pubkey,
        sink: mpsc::UnboundedSender<AccountEvent>,
    ) -> Result<SubscriptionId, ServiceError>;

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), ServiceError>;
}

/// Immutable view of the tracked pool handed to readers
#[derive(Debug, Clone)]
pub struct ReserveSnapshot {
    pub pool_id: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub status: u64,
    pub descriptor: PoolDescriptor,
    pub pool_keys: PoolKeys,
    pub pool_info: Arc<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}
