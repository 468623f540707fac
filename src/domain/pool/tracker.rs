//! Live reserve tracker
//!
//! A single actor task owns the tracked pool. `init`, account notifications
//! and shutdown all arrive as messages, so writes never interleave. Readers
//! get the latest `ReserveSnapshot` from a watch channel without touching
//! the actor.

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::shared::errors::ServiceError;
use crate::shared::types::{AccountEvent, AccountNotification, SubscriptionId, WatchedAccount};
use super::{AccountNotifier, FetchedPool, PoolDescriptor, PoolKeys, PoolSource, ReserveSnapshot, VaultAccount};

const COMMAND_BUFFER: usize = 32;

type SnapshotCell = Option<Arc<ReserveSnapshot>>;

/// Usable reserve: vault balance minus the amount earmarked for withdrawal
pub fn available_reserve(vault_amount: u64, need_take_pnl: u64) -> u64 {
    if need_take_pnl > vault_amount {
        warn!(
            "pending take {} exceeds vault balance {}, clamping reserve to 0",
            need_take_pnl, vault_amount
        );
    }
    vault_amount.saturating_sub(need_take_pnl)
}

enum TrackerCommand {
    Init {
        pool_id: Pubkey,
        reply: oneshot::Sender<Result<(), ServiceError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to the tracker actor
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    snapshots: watch::Receiver<SnapshotCell>,
}

impl TrackerHandle {
    /// Spawns the actor on the current runtime
    pub fn spawn(source: Arc<dyn PoolSource>, notifier: Arc<dyn AccountNotifier>) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(None);

        let actor = TrackerActor {
            source,
            notifier,
            commands: commands_rx,
            events_tx,
            events_rx,
            snapshots: snapshots_tx,
            pool: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
        }
    }

    /// (Re)subscribes to `pool_id`, replacing whatever was tracked before
    pub async fn init(&self, pool_id: Pubkey) -> Result<(), ServiceError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(TrackerCommand::Init { pool_id, reply })
            .await
            .map_err(|_| ServiceError::ShutDown("reserve tracker"))?;
        response
            .await
            .map_err(|_| ServiceError::ShutDown("reserve tracker"))?
    }

    /// Latest snapshot; fails until an `init` has succeeded
    pub fn current_value(&self) -> Result<Arc<ReserveSnapshot>, ServiceError> {
        self.snapshots
            .borrow()
            .clone()
            .ok_or(ServiceError::Uninitialized)
    }

    pub fn watch(&self) -> watch::Receiver<SnapshotCell> {
        self.snapshots.clone()
    }

    /// Releases all subscriptions and stops the actor
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(TrackerCommand::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    id: SubscriptionId,
    account: Pubkey,
}

struct TrackedPool {
    pool_id: Pubkey,
    program_id: Pubkey,
    descriptor: PoolDescriptor,
    pool_keys: PoolKeys,
    pool_info: Arc<serde_json::Value>,
    base_reserve: u64,
    quote_reserve: u64,
    base_vault: Subscription,
    quote_vault: Subscription,
    pool: Subscription,
}

impl TrackedPool {
    fn watched(&self, id: SubscriptionId) -> Option<WatchedAccount> {
        if id == self.base_vault.id {
            Some(WatchedAccount::BaseVault)
        } else if id == self.quote_vault.id {
            Some(WatchedAccount::QuoteVault)
        } else if id == self.pool.id {
            Some(WatchedAccount::Pool)
        } else {
            None
        }
    }

    fn subscription(&self, kind: WatchedAccount) -> Subscription {
        match kind {
            WatchedAccount::BaseVault => self.base_vault,
            WatchedAccount::QuoteVault => self.quote_vault,
            WatchedAccount::Pool => self.pool,
        }
    }

    fn subscription_mut(&mut self, kind: WatchedAccount) -> &mut Subscription {
        match kind {
            WatchedAccount::BaseVault => &mut self.base_vault,
            WatchedAccount::QuoteVault => &mut self.quote_vault,
            WatchedAccount::Pool => &mut self.pool,
        }
    }

    fn snapshot(&self) -> ReserveSnapshot {
        ReserveSnapshot {
            pool_id: self.pool_id,
            base_reserve: self.base_reserve,
            quote_reserve: self.quote_reserve,
            status: self.descriptor.status,
            descriptor: self.descriptor.clone(),
            pool_keys: self.pool_keys.clone(),
            pool_info: self.pool_info.clone(),
            updated_at: Utc::now(),
        }
    }

    fn apply_vault_update(&mut self, side: WatchedAccount, notification: &AccountNotification) -> Result<(), ServiceError> {
        let vault = VaultAccount::decode(&notification.data)?;
        // The pending take is whatever descriptor we hold now, even if a newer
        // descriptor notification is still in flight.
        let reserve = match side {
            WatchedAccount::BaseVault => {
                self.base_reserve = available_reserve(vault.amount, self.descriptor.base_need_take_pnl);
                self.base_reserve
            }
            WatchedAccount::QuoteVault => {
                self.quote_reserve = available_reserve(vault.amount, self.descriptor.quote_need_take_pnl);
                self.quote_reserve
            }
            WatchedAccount::Pool => return Ok(()),
        };
        info!(
            "{} reserve: {} (slot {}, time {})",
            side.as_str(),
            reserve,
            notification.slot,
            Utc::now().timestamp_millis() as f64 / 1000.0
        );
        Ok(())
    }
}

struct TrackerActor {
    source: Arc<dyn PoolSource>,
    notifier: Arc<dyn AccountNotifier>,
    commands: mpsc::Receiver<TrackerCommand>,
    events_tx: mpsc::UnboundedSender<AccountEvent>,
    events_rx: mpsc::UnboundedReceiver<AccountEvent>,
    snapshots: watch::Sender<SnapshotCell>,
    pool: Option<TrackedPool>,
}

impl TrackerActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(TrackerCommand::Init { pool_id, reply }) => {
                        let result = self.init(pool_id).await;
                        if let Err(e) = &result {
                            error!("pool init for {} failed: {}", pool_id, e);
                        }
                        let _ = reply.send(result);
                    }
                    Some(TrackerCommand::Shutdown { reply }) => {
                        self.teardown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => match event {
                    AccountEvent::Changed(notification) => self.handle_notification(notification).await,
                    AccountEvent::Closed { subscription, account } => {
                        self.handle_closed(subscription, account).await
                    }
                },
            }
        }
        info!("reserve tracker stopped");
    }

    async fn init(&mut self, pool_id: Pubkey) -> Result<(), ServiceError> {
        info!("initing pool {}...", pool_id);

        // Fetch before tearing down so a failed fetch leaves everything as it was
        let fetched = self.source.fetch_pool(&pool_id).await?;

        // Readers keep the previous snapshot until the new pool is live
        self.release_pool().await;

        let FetchedPool {
            pool_id,
            program_id,
            descriptor,
            base_vault_amount,
            quote_vault_amount,
            pool_info,
        } = fetched;

        let watched = [
            (WatchedAccount::BaseVault, descriptor.base_vault),
            (WatchedAccount::QuoteVault, descriptor.quote_vault),
            (WatchedAccount::Pool, pool_id),
        ];
        let mut opened = Vec::with_capacity(watched.len());
        for (kind, account) in watched {
            match self.notifier.subscribe(account, self.events_tx.clone()).await {
                Ok(id) => {
                    debug!("subscribed to {} {} as {}", kind.as_str(), account, id);
                    opened.push(Subscription { id, account });
                }
                Err(e) => {
                    for subscription in opened {
                        release(self.notifier.as_ref(), subscription).await;
                    }
                    self.snapshots.send_replace(None);
                    return Err(e);
                }
            }
        }

        let pool = TrackedPool {
            pool_id,
            program_id,
            pool_keys: PoolKeys::new(pool_id, program_id, &descriptor),
            base_reserve: available_reserve(base_vault_amount, descriptor.base_need_take_pnl),
            quote_reserve: available_reserve(quote_vault_amount, descriptor.quote_need_take_pnl),
            descriptor,
            pool_info: Arc::new(pool_info),
            base_vault: opened[0],
            quote_vault: opened[1],
            pool: opened[2],
        };
        info!(
            "✅ tracking pool {}: base reserve {}, quote reserve {}, status {}",
            pool.pool_id, pool.base_reserve, pool.quote_reserve, pool.descriptor.status
        );
        self.snapshots.send_replace(Some(Arc::new(pool.snapshot())));
        self.pool = Some(pool);
        Ok(())
    }

    /// Drops the tracked pool and clears the published snapshot
    async fn teardown(&mut self) {
        if self.release_pool().await {
            self.snapshots.send_replace(None);
        }
    }

    /// Best-effort release of every live subscription; the snapshot is left as is
    async fn release_pool(&mut self) -> bool {
        let Some(pool) = self.pool.take() else {
            return false;
        };
        for subscription in [pool.base_vault, pool.quote_vault, pool.pool] {
            release(self.notifier.as_ref(), subscription).await;
        }
        true
    }

    async fn handle_notification(&mut self, notification: AccountNotification) {
        let Some(pool) = self.pool.as_mut() else {
            debug!("dropping notification from {}: no pool tracked", notification.subscription);
            return;
        };
        let Some(watched) = pool.watched(notification.subscription) else {
            debug!(
                "dropping notification for {} from retired {}",
                notification.account, notification.subscription
            );
            return;
        };

        let result = match watched {
            WatchedAccount::BaseVault | WatchedAccount::QuoteVault => {
                pool.apply_vault_update(watched, &notification)
            }
            WatchedAccount::Pool => {
                apply_descriptor_update(self.notifier.as_ref(), &self.events_tx, pool, &notification).await
            }
        };

        match result {
            Ok(()) => {
                self.snapshots.send_replace(Some(Arc::new(pool.snapshot())));
            }
            Err(e) => error!(
                "failed to apply {} update from {}: {}",
                watched.as_str(),
                notification.account,
                e
            ),
        }
    }

    /// Reopens a stream the server ended. If that fails the pool is dropped,
    /// so readers get `Uninitialized` instead of reserves nobody updates.
    async fn handle_closed(&mut self, id: SubscriptionId, account: Pubkey) {
        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        let Some(watched) = pool.watched(id) else {
            debug!("ignoring close of retired {} for {}", id, account);
            return;
        };

        warn!("{} stream {} for {} ended, resubscribing", watched.as_str(), id, account);
        let resubscribed = self.notifier.subscribe(account, self.events_tx.clone()).await;
        match resubscribed {
            Ok(new_id) => {
                *pool.subscription_mut(watched) = Subscription { id: new_id, account };
                info!("{} {} resubscribed as {}", watched.as_str(), account, new_id);
            }
            Err(e) => {
                error!(
                    "resubscribe to {} {} failed, dropping pool {}: {}",
                    watched.as_str(),
                    account,
                    pool.pool_id,
                    e
                );
                self.teardown().await;
            }
        }
    }
}

/// Accepts a new descriptor, moving vault listeners first if the vaults changed
///
/// Either every moved vault is resubscribed and the descriptor is committed,
/// or nothing changes. Reserves are not recomputed here; they catch up on the
/// next vault event.
async fn apply_descriptor_update(
    notifier: &dyn AccountNotifier,
    events_tx: &mpsc::UnboundedSender<AccountEvent>,
    pool: &mut TrackedPool,
    notification: &AccountNotification,
) -> Result<(), ServiceError> {
    let descriptor = PoolDescriptor::decode(&notification.data)?;

    let moved: Vec<(WatchedAccount, Pubkey)> = [
        (WatchedAccount::BaseVault, descriptor.base_vault),
        (WatchedAccount::QuoteVault, descriptor.quote_vault),
    ]
    .into_iter()
    .filter(|(kind, account)| pool.subscription(*kind).account != *account)
    .collect();

    let mut opened = Vec::with_capacity(moved.len());
    for (kind, account) in moved {
        info!(
            "{} moved from {} to {}, resubscribing",
            kind.as_str(),
            pool.subscription(kind).account,
            account
        );
        match notifier.subscribe(account, events_tx.clone()).await {
            Ok(id) => opened.push((kind, Subscription { id, account })),
            Err(e) => {
                for (_, subscription) in opened {
                    release(notifier, subscription).await;
                }
                return Err(e);
            }
        }
    }

    for (kind, subscription) in opened {
        let old = std::mem::replace(pool.subscription_mut(kind), subscription);
        release(notifier, old).await;
    }
    pool.pool_keys = PoolKeys::new(pool.pool_id, pool.program_id, &descriptor);
    pool.descriptor = descriptor;
    debug!("pool descriptor updated at slot {}", notification.slot);
    Ok(())
}

async fn release(notifier: &dyn AccountNotifier, subscription: Subscription) {
    if let Err(e) = notifier.unsubscribe(subscription.id).await {
        warn!(
            "failed to release {} for {}: {}",
            subscription.id, subscription.account, e
        );
    }
}
