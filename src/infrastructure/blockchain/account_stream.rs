//! Websocket account subscriptions
//!
//! Each subscription runs in its own task that forwards decoded account
//! data into the tracker's queue until it is cancelled. A stream the server
//! ends is reported to the sink as `AccountEvent::Closed`.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::RpcAccountInfoConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::pool::AccountNotifier;
use crate::shared::errors::ServiceError;
use crate::shared::types::{AccountEvent, AccountNotification, SubscriptionId};

struct ActiveSubscription {
    account: Pubkey,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

type ActiveMap = Arc<Mutex<HashMap<SubscriptionId, ActiveSubscription>>>;

/// `AccountNotifier` over a single shared pubsub connection
pub struct PubsubNotifier {
    client: Arc<PubsubClient>,
    commitment: CommitmentConfig,
    next_id: AtomicU64,
    active: ActiveMap,
}

impl PubsubNotifier {
    pub async fn connect(ws_url: &str, commitment: CommitmentConfig) -> Result<Self, ServiceError> {
        let client = PubsubClient::new(ws_url)
            .await
            .map_err(|e| ServiceError::Upstream(format!("pubsub connect to {}: {}", ws_url, e)))?;
        info!("🔌 connected to pubsub endpoint {}", ws_url);

        Ok(Self {
            client: Arc::new(client),
            commitment,
            next_id: AtomicU64::new(1),
            active: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}

#[async_trait]
impl AccountNotifier for PubsubNotifier {
    async fn subscribe(
        &self,
        account: Pubkey,
        sink: mpsc::UnboundedSender<AccountEvent>,
    ) -> Result<SubscriptionId, ServiceError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (ready_tx, ready_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        // Registered before the task can observe a closed stream and deregister itself
        let mut active = self.active.lock().await;
        let task = tokio::spawn(forward_account(
            self.client.clone(),
            self.commitment,
            self.active.clone(),
            id,
            account,
            sink,
            ready_tx,
            cancel_rx,
        ));
        active.insert(
            id,
            ActiveSubscription {
                account,
                cancel: cancel_tx,
                task,
            },
        );
        drop(active);

        let failure = match ready_rx.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(ServiceError::Upstream(format!(
                "subscription task for {} exited before subscribing",
                account
            ))),
        };
        if let Some(e) = failure {
            self.active.lock().await.remove(&id);
            return Err(e);
        }

        debug!("{} opened for {}", id, account);
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), ServiceError> {
        let subscription = self
            .active
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| ServiceError::SubscriptionTeardown(format!("{} is not active", id)))?;

        let _ = subscription.cancel.send(());
        subscription.task.await.map_err(|e| {
            ServiceError::SubscriptionTeardown(format!("{} for {}: {}", id, subscription.account, e))
        })?;
        debug!("{} closed for {}", id, subscription.account);
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StreamEnd {
    Cancelled,
    ServerClosed,
    ReceiverGone,
}

#[allow(clippy::too_many_arguments)]
async fn forward_account(
    client: Arc<PubsubClient>,
    commitment: CommitmentConfig,
    active: ActiveMap,
    id: SubscriptionId,
    account: Pubkey,
    sink: mpsc::UnboundedSender<AccountEvent>,
    ready: oneshot::Sender<Result<(), ServiceError>>,
    mut cancel: oneshot::Receiver<()>,
) {
    let config = RpcAccountInfoConfig {
        encoding: Some(UiAccountEncoding::Base64),
        commitment: Some(commitment),
        ..RpcAccountInfoConfig::default()
    };

    let (mut stream, unsubscribe) = match client.account_subscribe(&account, Some(config)).await {
        Ok(subscription) => {
            let _ = ready.send(Ok(()));
            subscription
        }
        Err(e) => {
            let _ = ready.send(Err(ServiceError::Upstream(format!(
                "account subscribe {}: {}",
                account, e
            ))));
            return;
        }
    };

    let updates = (&mut stream).map(|response| (response.context.slot, response.value.data.decode()));
    let end = pump(updates, &mut cancel, &sink, id, account).await;

    drop(stream);
    unsubscribe().await;

    if end == StreamEnd::ServerClosed {
        warn!("{} stream for {} closed by the server", id, account);
        // Only report the close if nobody released the subscription meanwhile
        if active.lock().await.remove(&id).is_some() {
            let _ = sink.send(AccountEvent::Closed { subscription: id, account });
        }
    }
}

/// Forwards `(slot, data)` updates into `sink` until cancelled or the stream ends
async fn pump<S>(
    mut updates: S,
    cancel: &mut oneshot::Receiver<()>,
    sink: &mpsc::UnboundedSender<AccountEvent>,
    id: SubscriptionId,
    account: Pubkey,
) -> StreamEnd
where
    S: Stream<Item = (u64, Option<Vec<u8>>)> + Unpin,
{
    loop {
        tokio::select! {
            _ = &mut *cancel => return StreamEnd::Cancelled,
            update = updates.next() => {
                let Some((slot, data)) = update else {
                    return StreamEnd::ServerClosed;
                };
                let Some(data) = data else {
                    warn!("{} for {}: undecodable account payload at slot {}", id, account, slot);
                    continue;
                };
                let notification = AccountNotification {
                    subscription: id,
                    account,
                    slot,
                    data,
                };
                if sink.send(AccountEvent::Changed(notification)).is_err() {
                    debug!("{} receiver dropped, stopping", id);
                    return StreamEnd::ReceiverGone;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn test_pump_forwards_updates_until_server_close() {
        let (sink, mut events) = mpsc::unbounded_channel();
        let (_cancel_tx, mut cancel) = oneshot::channel();
        let account = Pubkey::new_unique();
        let updates = stream::iter(vec![(5, Some(vec![1, 2])), (6, None), (7, Some(vec![3]))]);

        let end = pump(updates, &mut cancel, &sink, SubscriptionId(4), account).await;
        assert_eq!(end, StreamEnd::ServerClosed);

        let mut slots = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                AccountEvent::Changed(n) => {
                    assert_eq!(n.subscription, SubscriptionId(4));
                    assert_eq!(n.account, account);
                    slots.push(n.slot);
                }
                AccountEvent::Closed { .. } => panic!("pump does not report closes itself"),
            }
        }
        assert_eq!(slots, vec![5, 7]);
    }

    #[tokio::test]
    async fn test_pump_stops_on_cancel() {
        let (sink, _events) = mpsc::unbounded_channel();
        let (cancel_tx, mut cancel) = oneshot::channel();
        cancel_tx.send(()).unwrap();

        let updates = stream::pending::<(u64, Option<Vec<u8>>)>();
        let end = pump(updates, &mut cancel, &sink, SubscriptionId(1), Pubkey::new_unique()).await;
        assert_eq!(end, StreamEnd::Cancelled);
    }

    #[tokio::test]
    async fn test_pump_stops_when_receiver_is_gone() {
        let (sink, events) = mpsc::unbounded_channel();
        drop(events);
        let (_cancel_tx, mut cancel) = oneshot::channel();

        let updates = stream::iter(vec![(1, Some(vec![0])), (2, Some(vec![0]))]);
        let end = pump(updates, &mut cancel, &sink, SubscriptionId(2), Pubkey::new_unique()).await;
        assert_eq!(end, StreamEnd::ReceiverGone);
    }
}
