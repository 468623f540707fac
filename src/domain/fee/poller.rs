//! Periodic refresh of the tip statistic and tip account

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::shared::errors::ServiceError;
use super::{FeeStatistic, TipPercentile, TipSource};

/// Refresh periods for the two cached values
#[derive(Debug, Clone, Copy)]
pub struct PollerIntervals {
    pub tip: Duration,
    pub account: Duration,
}

impl Default for PollerIntervals {
    fn default() -> Self {
        Self {
            tip: Duration::from_secs(600),
            account: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default)]
struct FeeState {
    // Bumped on every successful init; timer tasks from older inits stop writing.
    generation: u64,
    tick: TipPercentile,
    tip_lamports: Option<u64>,
    tip_account: Option<Pubkey>,
}

struct Schedule {
    tip_task: JoinHandle<()>,
    account_task: JoinHandle<()>,
}

impl Drop for Schedule {
    fn drop(&mut self) {
        self.tip_task.abort();
        self.account_task.abort();
    }
}

/// Owner of the cached fee statistic
pub struct FeePoller {
    source: Arc<dyn TipSource>,
    intervals: PollerIntervals,
    state: Arc<RwLock<FeeState>>,
    schedule: Mutex<Option<Schedule>>,
}

impl FeePoller {
    pub fn new(source: Arc<dyn TipSource>, intervals: PollerIntervals) -> Self {
        Self {
            source,
            intervals,
            state: Arc::new(RwLock::new(FeeState::default())),
            schedule: Mutex::new(None),
        }
    }

    /// Fetches both values now and (re)starts the refresh timers for `tick`
    ///
    /// On failure the previous values and timers stay in place.
    pub async fn init(&self, tick: TipPercentile) -> Result<(), ServiceError> {
        let mut schedule = self.schedule.lock().await;
        info!("initing jito tip with {}...", tick);

        let tip_lamports = self.source.tip_lamports(tick).await?;
        let tip_account = self.source.random_tip_account().await?;

        // Dropping the old schedule aborts its timers
        schedule.take();

        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.tick = tick;
            state.tip_lamports = Some(tip_lamports);
            state.tip_account = Some(tip_account);
            state.generation
        };

        *schedule = Some(Schedule {
            tip_task: tokio::spawn(refresh_tip(
                self.source.clone(),
                self.state.clone(),
                generation,
                tick,
                self.intervals.tip,
            )),
            account_task: tokio::spawn(refresh_tip_account(
                self.source.clone(),
                self.state.clone(),
                generation,
                self.intervals.account,
            )),
        });

        info!("✅ jito tip {} lamports, tip account {}", tip_lamports, tip_account);
        Ok(())
    }

    pub async fn current_value(&self) -> Result<FeeStatistic, ServiceError> {
        let state = self.state.read().await;
        match (state.tip_lamports, state.tip_account) {
            (Some(tip_lamports), Some(tip_account)) => Ok(FeeStatistic {
                tip_lamports,
                tip_account,
            }),
            _ => Err(ServiceError::Uninitialized),
        }
    }

    /// Percentile captured by the last successful init
    pub async fn tick(&self) -> Option<TipPercentile> {
        let state = self.state.read().await;
        state.tip_lamports.map(|_| state.tick)
    }

    /// Stops both refresh timers; cached values stay readable
    pub async fn shutdown(&self) {
        if self.schedule.lock().await.take().is_some() {
            info!("jito tip refresh stopped");
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn refresh_tip(
    source: Arc<dyn TipSource>,
    state: Arc<RwLock<FeeState>>,
    generation: u64,
    tick: TipPercentile,
    period: Duration,
) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match source.tip_lamports(tick).await {
            Ok(tip) => {
                let mut state = state.write().await;
                if state.generation != generation {
                    break;
                }
                state.tip_lamports = Some(tip);
                debug!("jito tip refreshed: {} lamports", tip);
            }
            Err(e) => warn!("jito tip refresh failed, keeping cached value: {}", e),
        }
    }
}

async fn refresh_tip_account(
    source: Arc<dyn TipSource>,
    state: Arc<RwLock<FeeState>>,
    generation: u64,
    period: Duration,
) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match source.random_tip_account().await {
            Ok(account) => {
                let mut state = state.write().await;
                if state.generation != generation {
                    break;
                }
                state.tip_account = Some(account);
                debug!("jito tip account refreshed: {}", account);
            }
            Err(e) => warn!("jito tip account refresh failed, keeping cached value: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    struct FakeTips {
        tip: AtomicU64,
        fail: AtomicBool,
        ticks: std::sync::Mutex<Vec<TipPercentile>>,
        accounts: Vec<Pubkey>,
        account_calls: AtomicUsize,
    }

    impl FakeTips {
        fn new(tip: u64) -> Arc<Self> {
            Arc::new(Self {
                tip: AtomicU64::new(tip),
                fail: AtomicBool::new(false),
                ticks: std::sync::Mutex::new(Vec::new()),
                accounts: (0..3).map(|_| Pubkey::new_unique()).collect(),
                account_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TipSource for FakeTips {
        async fn tip_lamports(&self, tick: TipPercentile) -> Result<u64, ServiceError> {
            self.ticks.lock().unwrap().push(tick);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ServiceError::Upstream("tip floor unavailable".to_string()));
            }
            Ok(self.tip.load(Ordering::SeqCst))
        }

        async fn random_tip_account(&self) -> Result<Pubkey, ServiceError> {
            let call = self.account_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.accounts[call % self.accounts.len()])
        }
    }

    fn poller(source: Arc<FakeTips>) -> FeePoller {
        FeePoller::new(source, PollerIntervals::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_uninitialized_before_init() {
        let poller = poller(FakeTips::new(100));
        assert!(matches!(poller.current_value().await, Err(ServiceError::Uninitialized)));
        assert_eq!(poller.tick().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tip_refreshes_after_interval() {
        let source = FakeTips::new(100);
        let poller = poller(source.clone());
        poller.init(TipPercentile::Ema50th).await.unwrap();
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 100);

        source.tip.store(200, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(599)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 100);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_value() {
        let source = FakeTips::new(100);
        let poller = poller(source.clone());
        poller.init(TipPercentile::Landed75th).await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(601)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 100);

        source.fail.store(false, Ordering::SeqCst);
        source.tip.store(300, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tip_account_rotates_every_minute() {
        let source = FakeTips::new(100);
        let poller = poller(source.clone());
        poller.init(TipPercentile::Ema50th).await.unwrap();
        assert_eq!(poller.current_value().await.unwrap().tip_account, source.accounts[0]);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_account, source.accounts[1]);
        assert_eq!(source.account_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinit_replaces_schedule() {
        let source = FakeTips::new(100);
        let poller = poller(source.clone());
        poller.init(TipPercentile::Ema50th).await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        poller.init(TipPercentile::Landed99th).await.unwrap();
        assert_eq!(poller.tick().await, Some(TipPercentile::Landed99th));

        // The first schedule would have fired at 600s; only the new one (at 900s) may
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(source.ticks.lock().unwrap().len(), 2);

        tokio::time::sleep(Duration::from_secs(300)).await;
        let ticks = source.ticks.lock().unwrap().clone();
        assert_eq!(
            ticks,
            vec![TipPercentile::Ema50th, TipPercentile::Landed99th, TipPercentile::Landed99th]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_init_keeps_previous_state() {
        let source = FakeTips::new(100);
        let poller = poller(source.clone());
        poller.init(TipPercentile::Ema50th).await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        assert!(poller.init(TipPercentile::Landed25th).await.is_err());
        assert_eq!(poller.tick().await, Some(TipPercentile::Ema50th));
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 100);

        // The first schedule keeps running with its own tick
        source.fail.store(false, Ordering::SeqCst);
        source.tip.store(150, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(601)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 150);
        assert_eq!(source.ticks.lock().unwrap().last(), Some(&TipPercentile::Ema50th));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_refresh() {
        let source = FakeTips::new(100);
        let poller = poller(source.clone());
        poller.init(TipPercentile::Ema50th).await.unwrap();
        poller.shutdown().await;

        source.tip.store(500, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1_200)).await;
        assert_eq!(poller.current_value().await.unwrap().tip_lamports, 100);
        assert_eq!(source.account_calls.load(Ordering::SeqCst), 1);
    }
}
