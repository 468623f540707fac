//! Wallet domain - per-user read-through cache over the wallet store

mod cache;

pub use cache::WalletCache;

use async_trait::async_trait;
use serde::Serialize;
use crate::shared::errors::ServiceError;

/// One derived signer owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wallet {
    pub id: i64,
    pub address: String,
    pub mnemonic: String,
    pub created_at: String,
}

/// Persistent source of truth for wallet records
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Non-closed wallets of `user`, newest first
    async fn list_open(&self, user: &str) -> Result<Vec<Wallet>, ServiceError>;

    async fn insert(&self, user: &str, address: &str, mnemonic: &str) -> Result<i64, ServiceError>;
}
