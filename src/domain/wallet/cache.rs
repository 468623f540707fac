use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::shared::errors::ServiceError;
use super::{Wallet, WalletStore};

/// Lazily populated, never expiring; entries go away only through `invalidate`
pub struct WalletCache {
    store: Arc<dyn WalletStore>,
    entries: RwLock<HashMap<String, Arc<Vec<Wallet>>>>,
}

impl WalletCache {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached wallets for `user`, querying the store on a miss
    pub async fn get(&self, user: &str) -> Result<Arc<Vec<Wallet>>, ServiceError> {
        if let Some(wallets) = self.entries.read().await.get(user) {
            debug!("wallet cache hit for {}", user);
            return Ok(wallets.clone());
        }
        self.refresh(user).await
    }

    /// Queries the store and overwrites the cached entry
    pub async fn refresh(&self, user: &str) -> Result<Arc<Vec<Wallet>>, ServiceError> {
        let wallets = Arc::new(self.store.list_open(user).await?);
        self.entries
            .write()
            .await
            .insert(user.to_string(), wallets.clone());
        debug!("cached {} wallets for {}", wallets.len(), user);
        Ok(wallets)
    }

    /// Returns whether an entry was present
    pub async fn invalidate(&self, user: &str) -> bool {
        self.entries.write().await.remove(user).is_some()
    }

    /// Inserts through the store, then drops the user's stale entry
    pub async fn add_wallet(&self, user: &str, address: &str, mnemonic: &str) -> Result<i64, ServiceError> {
        let id = self.store.insert(user, address, mnemonic).await?;
        self.invalidate(user).await;
        info!("wallet {} added for {}", address, user);
        Ok(id)
    }
}
