//! Solana RPC reads backing the reserve tracker's `init`

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::pool::{FetchedPool, PoolDescriptor, PoolSource, VaultAccount};
use crate::infrastructure::api_clients::RaydiumApiClient;
use crate::shared::errors::ServiceError;

/// One-shot pool fetch: descriptor, both vault balances and the public pool record
pub struct RpcPoolSource {
    rpc_client: Arc<RpcClient>,
    raydium: RaydiumApiClient,
}

impl RpcPoolSource {
    pub fn new(rpc_url: String, commitment: CommitmentConfig, raydium: RaydiumApiClient) -> Self {
        Self {
            rpc_client: Arc::new(RpcClient::new_with_commitment(rpc_url, commitment)),
            raydium,
        }
    }

    async fn account_data(&self, accounts: &[Pubkey]) -> Result<Vec<Vec<u8>>, ServiceError> {
        let fetched = self.rpc_client.get_multiple_accounts(accounts).await?;
        accounts
            .iter()
            .zip(fetched)
            .map(|(address, account)| {
                account
                    .map(|account| account.data)
                    .ok_or_else(|| ServiceError::NotFound(format!("account {}", address)))
            })
            .collect()
    }
}

#[async_trait]
impl PoolSource for RpcPoolSource {
    async fn fetch_pool(&self, pool_id: &Pubkey) -> Result<FetchedPool, ServiceError> {
        let pool_account = self
            .rpc_client
            .get_multiple_accounts(&[*pool_id])
            .await?
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| ServiceError::NotFound(format!("pool {}", pool_id)))?;

        let descriptor = PoolDescriptor::decode(&pool_account.data)?;
        debug!(
            "pool {} owned by {}, vaults {} / {}",
            pool_id, pool_account.owner, descriptor.base_vault, descriptor.quote_vault
        );

        let vaults = self
            .account_data(&[descriptor.base_vault, descriptor.quote_vault])
            .await?;
        let base_vault = VaultAccount::decode(&vaults[0])?;
        let quote_vault = VaultAccount::decode(&vaults[1])?;

        let pool_info = self.raydium.pool_info(pool_id).await?;

        info!(
            "📊 fetched pool {}: base vault {} quote vault {}",
            pool_id, base_vault.amount, quote_vault.amount
        );

        Ok(FetchedPool {
            pool_id: *pool_id,
            program_id: pool_account.owner,
            descriptor,
            base_vault_amount: base_vault.amount,
            quote_vault_amount: quote_vault.amount,
            pool_info,
        })
    }
}
