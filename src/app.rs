// src/app.rs
use anyhow::{anyhow, Context, Result};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::application::{self, create_app, ApiState};
use crate::config::Config;
use crate::domain::fee::{FeePoller, PollerIntervals, TipPercentile};
use crate::domain::pool::TrackerHandle;
use crate::domain::wallet::WalletCache;
use crate::infrastructure::api_clients::jito_client::{DEFAULT_BLOCK_ENGINE_URL, DEFAULT_TIP_FLOOR_URL};
use crate::infrastructure::api_clients::raydium_api_client::DEFAULT_RAYDIUM_API;
use crate::infrastructure::api_clients::{JitoClient, RaydiumApiClient};
use crate::infrastructure::blockchain::{PubsubNotifier, RpcPoolSource};
use crate::infrastructure::storage::SqliteWalletStore;
use crate::shared::utils::websocket_url;

pub const DEFAULT_BIND: &str = "0.0.0.0:8333";
pub const DEFAULT_DATABASE: &str = "database.db";

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub rpc_url: String,
    pub ws_url: String,
    pub commitment: CommitmentConfig,
    pub bind: String,
    pub auth_secret: String,
    pub tip_floor_url: String,
    pub block_engine_url: String,
    pub jito_uuid: Option<String>,
    pub default_tick: TipPercentile,
    pub intervals: PollerIntervals,
    pub raydium_api_url: String,
    pub database_path: String,
    pub pool_id: Option<Pubkey>,
}

impl AppCfg {
    /// Fills every unset value with its default
    pub fn from_config(cfg: Config) -> Result<Self> {
        let rpc_url = cfg
            .rpc
            .url
            .ok_or_else(|| anyhow!("--rpc-url is required when [rpc].url is not configured"))?;

        let commitment = match cfg.rpc.commitment.as_deref() {
            Some(level) => CommitmentConfig::from_str(level)
                .map_err(|e| anyhow!("invalid commitment {}: {}", level, e))?,
            None => CommitmentConfig::confirmed(),
        };

        let pool_id = cfg
            .pool
            .pool_id
            .as_deref()
            .map(|id| Pubkey::from_str(id.trim()).with_context(|| format!("invalid pool id {}", id)))
            .transpose()?;

        let defaults = PollerIntervals::default();
        let intervals = PollerIntervals {
            tip: cfg.jito.tip_refresh_secs.map(Duration::from_secs).unwrap_or(defaults.tip),
            account: cfg
                .jito
                .account_refresh_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.account),
        };
        if intervals.tip.is_zero() || intervals.account.is_zero() {
            return Err(anyhow!("jito refresh intervals must be positive"));
        }

        Ok(Self {
            ws_url: cfg.rpc.ws_url.unwrap_or_else(|| websocket_url(&rpc_url)),
            auth_secret: cfg.server.auth_secret.unwrap_or_else(|| rpc_url.clone()),
            rpc_url,
            commitment,
            bind: cfg.server.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            tip_floor_url: cfg.jito.tip_floor_url.unwrap_or_else(|| DEFAULT_TIP_FLOOR_URL.to_string()),
            block_engine_url: cfg
                .jito
                .block_engine_url
                .unwrap_or_else(|| DEFAULT_BLOCK_ENGINE_URL.to_string()),
            jito_uuid: cfg.jito.uuid,
            default_tick: cfg.jito.default_tick.unwrap_or_default(),
            intervals,
            raydium_api_url: cfg.raydium.api_url.unwrap_or_else(|| DEFAULT_RAYDIUM_API.to_string()),
            database_path: cfg.database.path.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            pool_id,
        })
    }
}

pub async fn run(app_cfg: AppCfg) -> Result<()> {
    info!("Starting dataserver");
    info!(
        "RPC {} (ws {}), commitment {:?}, database {}",
        app_cfg.rpc_url, app_cfg.ws_url, app_cfg.commitment.commitment, app_cfg.database_path
    );

    let raydium = RaydiumApiClient::new(app_cfg.raydium_api_url.clone());
    let source = Arc::new(RpcPoolSource::new(app_cfg.rpc_url.clone(), app_cfg.commitment, raydium));
    let notifier = Arc::new(PubsubNotifier::connect(&app_cfg.ws_url, app_cfg.commitment).await?);
    let tracker = TrackerHandle::spawn(source, notifier);

    let jito = Arc::new(JitoClient::new(
        app_cfg.tip_floor_url.clone(),
        app_cfg.block_engine_url.clone(),
        app_cfg.jito_uuid.clone(),
    ));
    let fees = Arc::new(FeePoller::new(jito, app_cfg.intervals));

    let store = SqliteWalletStore::open(&app_cfg.database_path)?;
    let wallets = Arc::new(WalletCache::new(Arc::new(store)));

    if let Err(e) = fees.init(app_cfg.default_tick).await {
        warn!("⚠️ initial jito tip fetch failed, retry with POST /jito/init: {}", e);
    }

    if let Some(pool_id) = app_cfg.pool_id {
        match tracker.init(pool_id).await {
            Ok(()) => info!("✅ tracking pool {}", pool_id),
            Err(e) => warn!("⚠️ startup init of pool {} failed: {}", pool_id, e),
        }
    }

    let state = ApiState::new(tracker.clone(), fees.clone(), wallets, &app_cfg.auth_secret);
    let listener = TcpListener::bind(&app_cfg.bind)
        .await
        .with_context(|| format!("bind {}", app_cfg.bind))?;
    application::serve(listener, create_app(state), shutdown_signal()).await?;

    info!("Shutting down...");
    tracker.shutdown().await;
    fees.shutdown().await;
    info!("✅ dataserver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received");
}
